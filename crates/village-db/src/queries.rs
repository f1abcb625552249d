use rusqlite::{Connection, Row, params};

use village_types::models::{EventId, PostId, UserId};

use crate::models::{EventRow, NewEventRow, NewPostRow, PostRow, UserRow};
use crate::{Database, DbResult};

const USER_COLUMNS: &str = "SELECT id, name, email, password, role, created_at FROM users";

// JOIN users (and events) so author name and event title come back in one query
const POST_COLUMNS: &str = "
    SELECT p.id, p.user_id, u.name, p.type, p.title, p.body, p.category,
           p.event_id, e.title, p.created_at
    FROM posts p
    JOIN users u ON u.id = p.user_id
    LEFT JOIN events e ON e.id = p.event_id";

const EVENT_COLUMNS: &str = "
    SELECT e.id, e.user_id, u.name, e.title, e.description, e.event_type,
           e.location, e.start_time, e.end_time, e.created_at
    FROM events e
    JOIN users u ON u.id = e.user_id";

impl Database {
    // -- Users --

    /// Inserts a user and returns the new id. A taken email surfaces as
    /// [`crate::DbError::UniqueViolation`] from the insert itself.
    pub fn insert_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        created_at: &str,
    ) -> DbResult<UserId> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (name, email, password, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![name, email, password_hash, created_at],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_user_by_id(&self, id: UserId) -> DbResult<Option<UserRow>> {
        self.with_conn(|conn| {
            query_one(conn, &format!("{USER_COLUMNS} WHERE id = ?1"), [id], user_row)
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> DbResult<Option<UserRow>> {
        self.with_conn(|conn| {
            query_one(conn, &format!("{USER_COLUMNS} WHERE email = ?1"), [email], user_row)
        })
    }

    // -- Sessions --

    pub fn insert_session(
        &self,
        token: &str,
        user_id: UserId,
        created_at: &str,
        expires_at: &str,
    ) -> DbResult<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
                params![token, user_id, created_at, expires_at],
            )?;
            Ok(())
        })
    }

    /// Owner of a session that is still live at `now`.
    pub fn get_live_session_user(&self, token: &str, now: &str) -> DbResult<Option<UserId>> {
        self.with_conn(|conn| {
            query_one(
                conn,
                "SELECT user_id FROM sessions WHERE token = ?1 AND expires_at > ?2",
                params![token, now],
                |row| row.get(0),
            )
        })
    }

    pub fn delete_session(&self, token: &str) -> DbResult<usize> {
        self.with_conn_mut(|conn| Ok(conn.execute("DELETE FROM sessions WHERE token = ?1", [token])?))
    }

    pub fn delete_expired_sessions(&self, now: &str) -> DbResult<usize> {
        self.with_conn_mut(|conn| {
            Ok(conn.execute("DELETE FROM sessions WHERE expires_at < ?1", [now])?)
        })
    }

    // -- Posts --

    pub fn insert_post(&self, post: &NewPostRow<'_>) -> DbResult<PostId> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO posts (user_id, type, title, body, category, event_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    post.user_id,
                    post.kind.as_str(),
                    post.title,
                    post.body,
                    post.category.as_str(),
                    post.event_id,
                    post.created_at,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_post(&self, id: PostId) -> DbResult<Option<PostRow>> {
        self.with_conn(|conn| {
            query_one(conn, &format!("{POST_COLUMNS} WHERE p.id = ?1"), [id], post_row)
        })
    }

    /// Newest first; `id` breaks ties between posts created in the same second.
    pub fn list_posts(&self, kind: Option<&str>, category: Option<&str>) -> DbResult<Vec<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{POST_COLUMNS}
                 WHERE (?1 IS NULL OR p.type = ?1) AND (?2 IS NULL OR p.category = ?2)
                 ORDER BY p.created_at DESC, p.id DESC"
            ))?;
            let rows = stmt
                .query_map(params![kind, category], post_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Deletes only when `user_id` owns the post. Returns rows affected.
    pub fn delete_post(&self, id: PostId, user_id: UserId) -> DbResult<usize> {
        self.with_conn_mut(|conn| {
            Ok(conn.execute(
                "DELETE FROM posts WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
            )?)
        })
    }

    pub fn find_post_id(&self, user_id: UserId, title: &str) -> DbResult<Option<PostId>> {
        self.with_conn(|conn| {
            query_one(
                conn,
                "SELECT id FROM posts WHERE user_id = ?1 AND title = ?2",
                params![user_id, title],
                |row| row.get(0),
            )
        })
    }

    // -- Events --

    pub fn insert_event(&self, event: &NewEventRow<'_>) -> DbResult<EventId> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO events
                    (user_id, title, description, event_type, location, start_time, end_time, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    event.user_id,
                    event.title,
                    event.description,
                    event.kind.as_str(),
                    event.location,
                    event.start_time,
                    event.end_time,
                    event.created_at,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_event(&self, id: EventId) -> DbResult<Option<EventRow>> {
        self.with_conn(|conn| {
            query_one(conn, &format!("{EVENT_COLUMNS} WHERE e.id = ?1"), [id], event_row)
        })
    }

    /// Soonest first; `id` breaks ties between events starting together.
    pub fn list_events(&self, kind: Option<&str>) -> DbResult<Vec<EventRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{EVENT_COLUMNS}
                 WHERE (?1 IS NULL OR e.event_type = ?1)
                 ORDER BY e.start_time ASC, e.id ASC"
            ))?;
            let rows = stmt
                .query_map([kind], event_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn delete_event(&self, id: EventId, user_id: UserId) -> DbResult<usize> {
        self.with_conn_mut(|conn| {
            Ok(conn.execute(
                "DELETE FROM events WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
            )?)
        })
    }

    pub fn find_event_id(&self, user_id: UserId, title: &str) -> DbResult<Option<EventId>> {
        self.with_conn(|conn| {
            query_one(
                conn,
                "SELECT id FROM events WHERE user_id = ?1 AND title = ?2",
                params![user_id, title],
                |row| row.get(0),
            )
        })
    }

    pub fn find_event_id_by_title(&self, title: &str) -> DbResult<Option<EventId>> {
        self.with_conn(|conn| {
            query_one(
                conn,
                "SELECT id FROM events WHERE title = ?1 ORDER BY id LIMIT 1",
                [title],
                |row| row.get(0),
            )
        })
    }

    // -- Interests --

    pub fn has_interest(&self, post_id: PostId, user_id: UserId) -> DbResult<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = query_one(
                conn,
                "SELECT 1 FROM interests WHERE post_id = ?1 AND user_id = ?2 LIMIT 1",
                params![post_id, user_id],
                |row| row.get(0),
            )?;
            Ok(found.is_some())
        })
    }

    /// A second insert for the same pair fails with [`crate::DbError::UniqueViolation`].
    pub fn insert_interest(&self, post_id: PostId, user_id: UserId, created_at: &str) -> DbResult<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO interests (post_id, user_id, created_at) VALUES (?1, ?2, ?3)",
                params![post_id, user_id, created_at],
            )?;
            Ok(())
        })
    }

    pub fn delete_interest(&self, post_id: PostId, user_id: UserId) -> DbResult<usize> {
        self.with_conn_mut(|conn| {
            Ok(conn.execute(
                "DELETE FROM interests WHERE post_id = ?1 AND user_id = ?2",
                params![post_id, user_id],
            )?)
        })
    }

    pub fn count_interests(&self, post_id: PostId) -> DbResult<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM interests WHERE post_id = ?1",
                [post_id],
                |row| row.get(0),
            )?)
        })
    }
}

fn query_one<P, T, F>(conn: &Connection, sql: &str, params: P, map: F) -> DbResult<Option<T>>
where
    P: rusqlite::Params,
    F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut stmt = conn.prepare(sql)?;
    stmt.query_row(params, map).optional()
}

fn user_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        role: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn post_row(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        author: row.get(2)?,
        kind: row.get(3)?,
        title: row.get(4)?,
        body: row.get(5)?,
        category: row.get(6)?,
        event_id: row.get(7)?,
        event_title: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn event_row(row: &Row<'_>) -> rusqlite::Result<EventRow> {
    Ok(EventRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        author: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        kind: row.get(5)?,
        location: row.get(6)?,
        start_time: row.get(7)?,
        end_time: row.get(8)?,
        created_at: row.get(9)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> DbResult<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> DbResult<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DbError;
    use village_types::models::{Category, EventKind, PostKind};

    const T0: &str = "2026-01-01 10:00:00";

    fn open() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("village.db")).unwrap();
        (dir, db)
    }

    fn post<'a>(user_id: UserId, title: &'a str, created_at: &'a str) -> NewPostRow<'a> {
        NewPostRow {
            user_id,
            kind: PostKind::Offer,
            title,
            body: "",
            category: Category::Other,
            event_id: None,
            created_at,
        }
    }

    #[test]
    fn duplicate_email_is_a_unique_violation() {
        let (_dir, db) = open();
        db.insert_user("Jan", "jan@village.nl", "hash", T0).unwrap();

        let err = db.insert_user("Other Jan", "jan@village.nl", "hash", T0).unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation(_)), "got {err:?}");

        // Exact match only
        db.insert_user("Jan", "Jan@village.nl", "hash", T0).unwrap();
    }

    #[test]
    fn user_row_defaults_role() {
        let (_dir, db) = open();
        let id = db.insert_user("Maria", "maria@village.nl", "hash", T0).unwrap();

        let row = db.get_user_by_id(id).unwrap().unwrap();
        assert_eq!(row.role, "villager");
        assert_eq!(row.password, "hash");
        assert!(db.get_user_by_email("nobody@village.nl").unwrap().is_none());
    }

    #[test]
    fn session_lookup_filters_expired_rows() {
        let (_dir, db) = open();
        let uid = db.insert_user("Kees", "kees@village.nl", "hash", T0).unwrap();
        db.insert_session("live", uid, T0, "2026-01-08 10:00:00").unwrap();
        db.insert_session("dead", uid, T0, "2026-01-01 11:00:00").unwrap();

        let now = "2026-01-02 10:00:00";
        assert_eq!(db.get_live_session_user("live", now).unwrap(), Some(uid));
        assert_eq!(db.get_live_session_user("dead", now).unwrap(), None);

        assert_eq!(db.delete_expired_sessions(now).unwrap(), 1);
        assert_eq!(db.delete_session("dead").unwrap(), 0);
        assert_eq!(db.delete_session("live").unwrap(), 1);
    }

    #[test]
    fn duplicate_session_token_is_rejected() {
        let (_dir, db) = open();
        let uid = db.insert_user("Kees", "kees@village.nl", "hash", T0).unwrap();
        db.insert_session("tok", uid, T0, "2026-01-08 10:00:00").unwrap();

        let err = db.insert_session("tok", uid, T0, "2026-01-08 10:00:00").unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation(_)));
    }

    #[test]
    fn post_with_unknown_event_is_a_foreign_key_violation() {
        let (_dir, db) = open();
        let uid = db.insert_user("Anna", "anna@village.nl", "hash", T0).unwrap();

        let mut new = post(uid, "eggs", T0);
        new.event_id = Some(999);
        assert!(matches!(db.insert_post(&new), Err(DbError::ForeignKeyViolation)));
    }

    #[test]
    fn delete_post_requires_owner() {
        let (_dir, db) = open();
        let owner = db.insert_user("Anna", "anna@village.nl", "hash", T0).unwrap();
        let other = db.insert_user("Jan", "jan@village.nl", "hash", T0).unwrap();
        let id = db.insert_post(&post(owner, "eggs", T0)).unwrap();

        assert_eq!(db.delete_post(id, other).unwrap(), 0);
        assert!(db.get_post(id).unwrap().is_some());
        assert_eq!(db.delete_post(id, owner).unwrap(), 1);
        assert!(db.get_post(id).unwrap().is_none());
    }

    #[test]
    fn posts_list_newest_first_with_filters() {
        let (_dir, db) = open();
        let uid = db.insert_user("Anna", "anna@village.nl", "hash", T0).unwrap();
        let first = db.insert_post(&post(uid, "first", T0)).unwrap();
        let second = db.insert_post(&post(uid, "second", T0)).unwrap();
        let mut fish = post(uid, "herring", "2026-01-01 12:00:00");
        fish.category = Category::Fish;
        let third = db.insert_post(&fish).unwrap();

        let ids: Vec<_> = db.list_posts(None, None).unwrap().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![third, second, first]);

        let fish: Vec<_> = db.list_posts(Some("offer"), Some("fish")).unwrap();
        assert_eq!(fish.len(), 1);
        assert_eq!(fish[0].author, "Anna");
        assert!(db.list_posts(Some("request"), None).unwrap().is_empty());
    }

    #[test]
    fn events_list_by_start_time() {
        let (_dir, db) = open();
        let uid = db.insert_user("Sophie", "sophie@village.nl", "hash", T0).unwrap();
        fn event<'a>(user_id: UserId, title: &'a str, start_time: &'a str) -> NewEventRow<'a> {
            NewEventRow {
                user_id,
                title,
                description: "",
                kind: EventKind::Gathering,
                location: "",
                start_time,
                end_time: None,
                created_at: T0,
            }
        }
        let late = db.insert_event(&event(uid, "bbq", "2026-06-15 18:00:00")).unwrap();
        let early = db.insert_event(&event(uid, "market", "2026-06-15 09:00:00")).unwrap();

        let ids: Vec<_> = db.list_events(None).unwrap().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![early, late]);
        assert!(db.list_events(Some("sport")).unwrap().is_empty());
        assert_eq!(db.find_event_id_by_title("bbq").unwrap(), Some(late));
    }

    #[test]
    fn deleting_event_unlinks_posts() {
        let (_dir, db) = open();
        let uid = db.insert_user("Jan", "jan@village.nl", "hash", T0).unwrap();
        let event_id = db
            .insert_event(&NewEventRow {
                user_id: uid,
                title: "Jan's Garage Sale",
                description: "",
                kind: EventKind::GarageSale,
                location: "",
                start_time: "2026-06-15 09:00:00",
                end_time: Some("2026-06-15 12:00:00"),
                created_at: T0,
            })
            .unwrap();
        let mut linked = post(uid, "rods", T0);
        linked.event_id = Some(event_id);
        let post_id = db.insert_post(&linked).unwrap();

        let row = db.get_post(post_id).unwrap().unwrap();
        assert_eq!(row.event_title.as_deref(), Some("Jan's Garage Sale"));

        assert_eq!(db.delete_event(event_id, uid).unwrap(), 1);
        let row = db.get_post(post_id).unwrap().unwrap();
        assert_eq!(row.event_id, None);
    }

    #[test]
    fn interest_pair_is_unique() {
        let (_dir, db) = open();
        let owner = db.insert_user("Anna", "anna@village.nl", "hash", T0).unwrap();
        let fan = db.insert_user("Jan", "jan@village.nl", "hash", T0).unwrap();
        let post_id = db.insert_post(&post(owner, "eggs", T0)).unwrap();

        db.insert_interest(post_id, fan, T0).unwrap();
        let err = db.insert_interest(post_id, fan, T0).unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation(_)));

        assert!(db.has_interest(post_id, fan).unwrap());
        assert_eq!(db.count_interests(post_id).unwrap(), 1);

        // Cascades with the post
        db.delete_post(post_id, owner).unwrap();
        assert_eq!(db.count_interests(post_id).unwrap(), 0);
    }
}
