use std::sync::Arc;

use argon2::Params;
use tempfile::TempDir;

use village_db::Database;
use village_types::models::{Category, PostKind, UserId};

use crate::auth::{AppState, AppStateInner};
use crate::resources::NewPost;

pub const PASSWORD: &str = "secret1";

/// Fresh database in a temp dir, with hashing cheap enough for tests.
pub fn state() -> (TempDir, AppState) {
    let dir = tempfile::tempdir().unwrap();
    let db = Arc::new(Database::open(&dir.path().join("village.db")).unwrap());
    let params = Params::new(1024, 1, 1, None).unwrap();
    let state = Arc::new(AppStateInner::new(db, params, false).unwrap());
    (dir, state)
}

/// Registers a user named after their email, with [`PASSWORD`].
pub fn user(state: &AppState, email: &str) -> UserId {
    state.register(email, email, PASSWORD).unwrap().id
}

pub fn offer(title: &str) -> NewPost {
    NewPost {
        kind: PostKind::Offer,
        title: title.to_string(),
        body: String::new(),
        category: Category::Other,
        event_id: None,
    }
}
