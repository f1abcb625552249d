//! Server-side sessions keyed by opaque random tokens.
//!
//! A session is live while `now < expires_at`. Expired rows are ignored by
//! [`SessionManager::validate`] straight away and physically removed later by
//! the sweep, so the two never need to coordinate.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand_core::{OsRng, RngCore};
use tracing::{debug, info, warn};

use village_db::Database;
use village_db::time::format_timestamp;
use village_types::models::UserId;

use crate::error::{Error, Result, blocking};

/// 256 bits from the OS CSPRNG, rendered as 64 hex chars.
const TOKEN_BYTES: usize = 32;

pub const SESSION_TTL_DAYS: i64 = 7;

pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Clone)]
pub struct SessionManager {
    db: Arc<Database>,
    ttl: chrono::Duration,
}

impl SessionManager {
    pub fn new(db: Arc<Database>) -> Self {
        Self::with_ttl(db, chrono::Duration::days(SESSION_TTL_DAYS))
    }

    pub fn with_ttl(db: Arc<Database>, ttl: chrono::Duration) -> Self {
        Self { db, ttl }
    }

    /// Issues a new token for `user_id`. Collisions are left to the primary
    /// key and surface as an internal error.
    pub fn create(&self, user_id: UserId) -> Result<String> {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        let token = hex::encode(bytes);

        let now = Utc::now();
        self.db.insert_session(
            &token,
            user_id,
            &format_timestamp(now),
            &format_timestamp(now + self.ttl),
        )?;

        debug!("Session created for user {}", user_id);
        Ok(token)
    }

    /// Owner of a live session. Missing and expired tokens are both
    /// `NotFound`.
    pub fn validate(&self, token: &str) -> Result<UserId> {
        let now = format_timestamp(Utc::now());
        self.db
            .get_live_session_user(token, &now)?
            .ok_or(Error::NotFound("session"))
    }

    /// Idempotent: revoking an unknown token is not an error.
    pub fn revoke(&self, token: &str) -> Result<()> {
        let removed = self.db.delete_session(token)?;
        debug!("Session revoke removed {} row(s)", removed);
        Ok(())
    }

    pub fn sweep_expired(&self) -> Result<usize> {
        let now = format_timestamp(Utc::now());
        Ok(self.db.delete_expired_sessions(&now)?)
    }
}

/// Background task that purges expired sessions on a fixed interval.
///
/// Failures are logged and retried on the next tick; the loop never exits.
/// Intervals shorter than [`MIN_SWEEP_INTERVAL`] are raised to it.
pub async fn run_sweep_loop(sessions: SessionManager, interval: Duration) {
    if interval < MIN_SWEEP_INTERVAL {
        warn!(
            "Session sweep interval {:?} too short, using {:?}",
            interval, MIN_SWEEP_INTERVAL
        );
    }
    let mut ticker = tokio::time::interval(interval.max(MIN_SWEEP_INTERVAL));
    // The first tick completes immediately; start sweeping one interval in
    ticker.tick().await;

    loop {
        ticker.tick().await;

        let manager = sessions.clone();
        match blocking(move || manager.sweep_expired()).await {
            Ok(count) => {
                if count > 0 {
                    info!("Session sweep: removed {} expired sessions", count);
                }
            }
            Err(e) => {
                warn!("Session sweep error: {}", e);
            }
        }
    }
}
