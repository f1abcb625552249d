use tracing::debug;

use village_types::models::UserId;

use crate::error::{Error, Result};
use crate::sessions::SessionManager;

/// Outcome of resolving a request credential.
///
/// `clear_credential` is set when the client presented a token that no longer
/// maps to a live session; the transport should tell the client to drop it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub identity: Option<UserId>,
    pub clear_credential: bool,
}

impl Resolution {
    pub const ANONYMOUS: Resolution = Resolution {
        identity: None,
        clear_credential: false,
    };
}

/// Maps opaque tokens to caller identities. Knows nothing about cookies.
#[derive(Clone)]
pub struct IdentityResolver {
    sessions: SessionManager,
}

impl IdentityResolver {
    pub fn new(sessions: SessionManager) -> Self {
        Self { sessions }
    }

    /// Never rejects; storage failures are still errors.
    pub fn resolve(&self, token: Option<&str>) -> Result<Resolution> {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return Ok(Resolution::ANONYMOUS);
        };

        match self.sessions.validate(token) {
            Ok(user_id) => Ok(Resolution {
                identity: Some(user_id),
                clear_credential: false,
            }),
            Err(Error::NotFound(_)) => {
                debug!("Rejected stale or unknown session token");
                Ok(Resolution {
                    identity: None,
                    clear_credential: true,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Fails closed with `Unauthenticated` when there is no live session.
    pub fn require(&self, token: Option<&str>) -> Result<UserId> {
        let resolution = self.resolve(token)?;
        resolution.identity.ok_or(Error::Unauthenticated {
            clear_credential: resolution.clear_credential,
        })
    }
}
