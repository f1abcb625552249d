//! Ownership-gated stores for posts and events.
//!
//! Creation re-reads the inserted row so callers always get server-computed
//! fields. Deletion fuses the ownership check into the `DELETE` itself; a
//! caller who does not own the row sees the same `NotFound` as for a missing
//! row.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use village_db::models::{NewEventRow, NewPostRow};
use village_db::time::format_timestamp;
use village_db::{Database, DbError};
use village_types::models::{
    Category, Event, EventId, EventKind, Post, PostId, PostKind, UserId,
};

use crate::error::{Error, Result};

/// Validated post fields.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub kind: PostKind,
    pub title: String,
    pub body: String,
    pub category: Category,
    pub event_id: Option<EventId>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PostFilter {
    pub kind: Option<PostKind>,
    pub category: Option<Category>,
}

/// Validated event fields; `end_time`, when present, is after `start_time`.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub kind: EventKind,
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct PostStore {
    db: Arc<Database>,
}

impl PostStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn create(&self, owner: UserId, post: &NewPost) -> Result<Post> {
        let created_at = format_timestamp(Utc::now());
        let id = self
            .db
            .insert_post(&NewPostRow {
                user_id: owner,
                kind: post.kind,
                title: &post.title,
                body: &post.body,
                category: post.category,
                event_id: post.event_id,
                created_at: &created_at,
            })
            .map_err(|e| match e {
                DbError::ForeignKeyViolation => Error::InvalidInput("event not found".into()),
                other => other.into(),
            })?;

        info!("User {} created post {}", owner, id);
        self.get(id)
    }

    pub fn get(&self, id: PostId) -> Result<Post> {
        let row = self.db.get_post(id)?.ok_or(Error::NotFound("post"))?;
        Ok(row.into_post()?)
    }

    /// Newest first.
    pub fn list(&self, filter: PostFilter) -> Result<Vec<Post>> {
        let rows = self.db.list_posts(
            filter.kind.map(PostKind::as_str),
            filter.category.map(Category::as_str),
        )?;
        Ok(rows
            .into_iter()
            .map(|row| row.into_post())
            .collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub fn delete(&self, id: PostId, owner: UserId) -> Result<()> {
        match self.db.delete_post(id, owner)? {
            0 => Err(Error::NotFound("post")),
            _ => {
                info!("User {} deleted post {}", owner, id);
                Ok(())
            }
        }
    }
}

#[derive(Clone)]
pub struct EventStore {
    db: Arc<Database>,
}

impl EventStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn create(&self, owner: UserId, event: &NewEvent) -> Result<Event> {
        let created_at = format_timestamp(Utc::now());
        let start_time = format_timestamp(event.start_time);
        let end_time = event.end_time.map(format_timestamp);

        let id = self.db.insert_event(&NewEventRow {
            user_id: owner,
            title: &event.title,
            description: &event.description,
            kind: event.kind,
            location: &event.location,
            start_time: &start_time,
            end_time: end_time.as_deref(),
            created_at: &created_at,
        })?;

        info!("User {} created event {}", owner, id);
        self.get(id)
    }

    pub fn get(&self, id: EventId) -> Result<Event> {
        let row = self.db.get_event(id)?.ok_or(Error::NotFound("event"))?;
        Ok(row.into_event()?)
    }

    /// Soonest first.
    pub fn list(&self, kind: Option<EventKind>) -> Result<Vec<Event>> {
        let rows = self.db.list_events(kind.map(EventKind::as_str))?;
        Ok(rows
            .into_iter()
            .map(|row| row.into_event())
            .collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub fn delete(&self, id: EventId, owner: UserId) -> Result<()> {
        match self.db.delete_event(id, owner)? {
            0 => Err(Error::NotFound("event")),
            _ => {
                info!("User {} deleted event {}", owner, id);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, offer};
    use chrono::TimeZone;

    fn event(title: &str, hour: u32) -> NewEvent {
        NewEvent {
            title: title.to_string(),
            description: String::new(),
            kind: EventKind::Sport,
            location: "Village green".into(),
            start_time: Utc.with_ymd_and_hms(2026, 6, 15, hour, 0, 0).unwrap(),
            end_time: Some(Utc.with_ymd_and_hms(2026, 6, 15, hour + 1, 0, 0).unwrap()),
        }
    }

    #[test]
    fn create_returns_server_fields() {
        let (_dir, state) = testing::state();
        let alice = testing::user(&state, "alice@x.test");

        let post = state.posts.create(alice, &offer("bread")).unwrap();
        assert!(post.id > 0);
        assert_eq!(post.user_id, alice);
        assert_eq!(post.author, "alice@x.test");
        assert_eq!(post.title, "bread");
        assert_eq!(state.posts.get(post.id).unwrap(), post);
    }

    #[test]
    fn delete_is_owner_only_and_hides_existence() {
        let (_dir, state) = testing::state();
        let alice = testing::user(&state, "alice@x.test");
        let bob = testing::user(&state, "bob@x.test");
        let post = state.posts.create(alice, &offer("bread")).unwrap();

        let err = state.posts.delete(post.id, bob).unwrap_err();
        assert!(matches!(err, Error::NotFound("post")));
        assert!(state.posts.get(post.id).is_ok());

        // Same outcome as a post that never existed
        let missing = state.posts.delete(9999, bob).unwrap_err();
        assert_eq!(err.to_string(), missing.to_string());

        state.posts.delete(post.id, alice).unwrap();
        assert!(matches!(state.posts.get(post.id), Err(Error::NotFound("post"))));
        assert!(matches!(state.posts.delete(post.id, alice), Err(Error::NotFound(_))));
    }

    #[test]
    fn post_linked_to_missing_event_is_invalid_input() {
        let (_dir, state) = testing::state();
        let alice = testing::user(&state, "alice@x.test");

        let mut linked = offer("rods");
        linked.event_id = Some(404);
        let err = state.posts.create(alice, &linked).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn list_posts_filters_and_orders_newest_first() {
        let (_dir, state) = testing::state();
        let alice = testing::user(&state, "alice@x.test");
        let a = state.posts.create(alice, &offer("a")).unwrap();
        let mut req = offer("b");
        req.kind = PostKind::Request;
        req.category = Category::Services;
        let b = state.posts.create(alice, &req).unwrap();

        let all: Vec<_> = state
            .posts
            .list(PostFilter::default())
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(all, vec![b.id, a.id]);

        let services = state
            .posts
            .list(PostFilter {
                kind: Some(PostKind::Request),
                category: Some(Category::Services),
            })
            .unwrap();
        assert_eq!(services, vec![b]);
    }

    #[test]
    fn events_round_trip_and_order_by_start() {
        let (_dir, state) = testing::state();
        let kees = testing::user(&state, "kees@x.test");
        let late = state.events.create(kees, &event("football", 14)).unwrap();
        let early = state.events.create(kees, &event("sack race", 9)).unwrap();

        assert_eq!(early.start_time, Utc.with_ymd_and_hms(2026, 6, 15, 9, 0, 0).unwrap());
        assert_eq!(early.author, "kees@x.test");

        let order: Vec<_> = state.events.list(None).unwrap().into_iter().map(|e| e.id).collect();
        assert_eq!(order, vec![early.id, late.id]);
        assert!(state.events.list(Some(EventKind::Gathering)).unwrap().is_empty());
    }

    #[test]
    fn event_delete_is_owner_only() {
        let (_dir, state) = testing::state();
        let kees = testing::user(&state, "kees@x.test");
        let anna = testing::user(&state, "anna@x.test");
        let ev = state.events.create(kees, &event("football", 14)).unwrap();

        assert!(matches!(state.events.delete(ev.id, anna), Err(Error::NotFound("event"))));
        state.events.delete(ev.id, kees).unwrap();
        assert!(matches!(state.events.get(ev.id), Err(Error::NotFound("event"))));
    }
}
