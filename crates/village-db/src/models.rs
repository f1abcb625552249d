//! Database row types; these map directly to SQLite rows.
//! Distinct from village-types models so the password column never leaves
//! this crate by accident.

use village_types::models::{
    Category, Event, EventId, EventKind, Post, PostId, PostKind, User, UserId,
};

use crate::time::parse_timestamp;
use crate::{DbError, DbResult};

pub struct UserRow {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub created_at: String,
}

impl UserRow {
    /// Drops the password hash.
    pub fn into_user(self) -> DbResult<User> {
        Ok(User {
            created_at: timestamp(&self.created_at, "user", self.id)?,
            id: self.id,
            name: self.name,
            email: self.email,
            role: self.role,
        })
    }
}

pub struct PostRow {
    pub id: PostId,
    pub user_id: UserId,
    pub author: String,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub category: String,
    pub event_id: Option<EventId>,
    pub event_title: Option<String>,
    pub created_at: String,
}

impl PostRow {
    pub fn into_post(self) -> DbResult<Post> {
        let kind: PostKind = self
            .kind
            .parse()
            .map_err(|e| DbError::Corrupt(format!("post {}: {}", self.id, e)))?;
        let category: Category = self
            .category
            .parse()
            .map_err(|e| DbError::Corrupt(format!("post {}: {}", self.id, e)))?;

        Ok(Post {
            created_at: timestamp(&self.created_at, "post", self.id)?,
            id: self.id,
            user_id: self.user_id,
            author: self.author,
            kind,
            title: self.title,
            body: self.body,
            category,
            event_id: self.event_id,
            event_title: self.event_title,
        })
    }
}

pub struct EventRow {
    pub id: EventId,
    pub user_id: UserId,
    pub author: String,
    pub title: String,
    pub description: String,
    pub kind: String,
    pub location: String,
    pub start_time: String,
    pub end_time: Option<String>,
    pub created_at: String,
}

impl EventRow {
    pub fn into_event(self) -> DbResult<Event> {
        let kind: EventKind = self
            .kind
            .parse()
            .map_err(|e| DbError::Corrupt(format!("event {}: {}", self.id, e)))?;
        let end_time = match self.end_time.as_deref() {
            Some(raw) => Some(timestamp(raw, "event", self.id)?),
            None => None,
        };

        Ok(Event {
            start_time: timestamp(&self.start_time, "event", self.id)?,
            created_at: timestamp(&self.created_at, "event", self.id)?,
            end_time,
            id: self.id,
            user_id: self.user_id,
            author: self.author,
            title: self.title,
            description: self.description,
            kind,
            location: self.location,
        })
    }
}

/// Insert parameters for a post. Enum fields are already validated.
pub struct NewPostRow<'a> {
    pub user_id: UserId,
    pub kind: PostKind,
    pub title: &'a str,
    pub body: &'a str,
    pub category: Category,
    pub event_id: Option<EventId>,
    pub created_at: &'a str,
}

pub struct NewEventRow<'a> {
    pub user_id: UserId,
    pub title: &'a str,
    pub description: &'a str,
    pub kind: EventKind,
    pub location: &'a str,
    pub start_time: &'a str,
    pub end_time: Option<&'a str>,
    pub created_at: &'a str,
}

fn timestamp(raw: &str, table: &str, id: i64) -> DbResult<chrono::DateTime<chrono::Utc>> {
    parse_timestamp(raw)
        .map_err(|e| DbError::Corrupt(format!("{} {}: bad timestamp '{}': {}", table, id, raw, e)))
}
