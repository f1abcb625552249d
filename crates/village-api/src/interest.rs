use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use village_db::time::format_timestamp;
use village_db::{Database, DbError};
use village_types::models::{PostId, PostKind, UserId};

use crate::error::{Error, Result};
use crate::resources::PostStore;

/// Result of a toggle: the caller's new state and the fresh total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Toggle {
    pub interested: bool,
    pub count: i64,
}

/// Who is interested in which post. A row exists exactly when the user is
/// interested; toggling is the only way to change that.
#[derive(Clone)]
pub struct InterestLedger {
    db: Arc<Database>,
    posts: PostStore,
}

impl InterestLedger {
    pub fn new(db: Arc<Database>, posts: PostStore) -> Self {
        Self { db, posts }
    }

    pub fn toggle(&self, post_id: PostId, caller: UserId) -> Result<Toggle> {
        let post = self.posts.get(post_id)?;
        if post.kind == PostKind::Announcement {
            return Err(Error::InvalidInput(
                "interest not available for announcements".into(),
            ));
        }
        if post.user_id == caller {
            return Err(Error::InvalidInput(
                "cannot express interest in your own post".into(),
            ));
        }

        let present = self.db.has_interest(post_id, caller)?;
        self.apply(post_id, caller, present)
    }

    /// Flips the state observed as `present`. A concurrent toggle may have
    /// inserted in between; losing that race still leaves the caller
    /// interested, which is what they asked for.
    fn apply(&self, post_id: PostId, caller: UserId, present: bool) -> Result<Toggle> {
        let interested = if present {
            self.db.delete_interest(post_id, caller)?;
            false
        } else {
            match self
                .db
                .insert_interest(post_id, caller, &format_timestamp(Utc::now()))
            {
                Ok(()) => {}
                Err(DbError::UniqueViolation(_)) => {
                    debug!("Interest in post {} by user {} already recorded", post_id, caller);
                }
                // Post deleted after it was loaded
                Err(DbError::ForeignKeyViolation) => return Err(Error::NotFound("post")),
                Err(e) => return Err(e.into()),
            }
            true
        };

        Ok(Toggle {
            interested,
            count: self.count(post_id)?,
        })
    }

    pub fn count(&self, post_id: PostId) -> Result<i64> {
        Ok(self.db.count_interests(post_id)?)
    }

    pub fn is_interested(&self, post_id: PostId, user_id: UserId) -> Result<bool> {
        Ok(self.db.has_interest(post_id, user_id)?)
    }
}
