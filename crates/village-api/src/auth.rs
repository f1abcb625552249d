use std::sync::Arc;

use argon2::Params;
use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::CookieJar;
use tracing::{info, warn};

use village_db::Database;
use village_types::api::{LoginRequest, MessageResponse, RegisterRequest};
use village_types::models::{User, UserId};

use crate::credentials::CredentialStore;
use crate::error::{Error, Result, blocking};
use crate::identity::IdentityResolver;
use crate::interest::InterestLedger;
use crate::middleware::{Caller, SESSION_COOKIE, removal_cookie, session_cookie};
use crate::resources::{EventStore, PostStore};
use crate::sessions::SessionManager;
use crate::validation;

pub type AppState = Arc<AppStateInner>;

/// Every core component, each holding its own handle to the shared database.
pub struct AppStateInner {
    pub db: Arc<Database>,
    pub credentials: CredentialStore,
    pub sessions: SessionManager,
    pub identity: IdentityResolver,
    pub posts: PostStore,
    pub events: EventStore,
    pub interests: InterestLedger,
    /// Mark the session cookie `Secure`; off for plain-HTTP development.
    pub cookie_secure: bool,
}

/// A successful login: the token to hand to the transport, and who it is for.
#[derive(Debug)]
pub struct Login {
    pub token: String,
    pub user: User,
}

impl AppStateInner {
    pub fn new(db: Arc<Database>, hashing: Params, cookie_secure: bool) -> Result<Self> {
        let credentials = CredentialStore::new(db.clone(), hashing)?;
        let sessions = SessionManager::new(db.clone());
        let posts = PostStore::new(db.clone());

        Ok(Self {
            identity: IdentityResolver::new(sessions.clone()),
            interests: InterestLedger::new(db.clone(), posts.clone()),
            events: EventStore::new(db.clone()),
            credentials,
            sessions,
            posts,
            db,
            cookie_secure,
        })
    }

    pub fn register(&self, name: &str, email: &str, password: &str) -> Result<User> {
        self.credentials.create_user(name, email, password)
    }

    pub fn login(&self, email: &str, password: &str) -> Result<Login> {
        let user_id = self.credentials.verify_login(email, password)?;
        let token = self.sessions.create(user_id)?;
        let user = self.credentials.get_by_id(user_id)?;
        info!("User {} logged in", user_id);
        Ok(Login { token, user })
    }

    /// Always succeeds. A failed revoke is logged; the session will still
    /// expire on its own.
    pub fn logout(&self, token: Option<&str>) {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return;
        };
        if let Err(e) = self.sessions.revoke(token) {
            warn!("Logout could not revoke session: {}", e);
        }
    }

    pub fn resolve_identity(&self, token: Option<&str>) -> Result<UserId> {
        self.identity.require(token)
    }
}

pub async fn register(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(req) = payload.map_err(|_| Error::InvalidInput("invalid JSON".into()))?;
    let fields = validation::registration(req)?;

    let user = blocking(move || state.register(&fields.name, &fields.email, &fields.password))
        .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(req) = payload.map_err(|_| Error::InvalidInput("invalid JSON".into()))?;
    let email = req.email.trim().to_string();
    if email.is_empty() || req.password.is_empty() {
        return Err(Error::InvalidInput("email and password are required".into()));
    }

    let secure = state.cookie_secure;
    let login = blocking(move || state.login(&email, &req.password)).await?;

    Ok((jar.add(session_cookie(login.token, secure)), Json(login.user)))
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> Result<impl IntoResponse> {
    let token = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());

    blocking(move || {
        state.logout(token.as_deref());
        Ok(())
    })
    .await?;

    Ok((
        jar.add(removal_cookie()),
        Json(MessageResponse {
            message: "logged out".into(),
        }),
    ))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(Caller(user_id)): Extension<Caller>,
) -> Result<impl IntoResponse> {
    let user = blocking(move || state.credentials.get_by_id(user_id)).await?;
    Ok(Json(user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, offer};

    #[test]
    fn register_login_resolve() {
        let (_dir, state) = testing::state();

        let user = state.register("Alice", "alice@x.test", "secret1").unwrap();
        let login = state.login("alice@x.test", "secret1").unwrap();
        assert_eq!(login.user, user);
        assert_eq!(state.resolve_identity(Some(&login.token)).unwrap(), user.id);
    }

    #[test]
    fn logout_is_idempotent() {
        let (_dir, state) = testing::state();
        state.register("Alice", "alice@x.test", "secret1").unwrap();
        let login = state.login("alice@x.test", "secret1").unwrap();

        state.logout(Some(&login.token));
        state.logout(Some(&login.token));
        state.logout(None);

        let err = state.resolve_identity(Some(&login.token)).unwrap_err();
        assert!(matches!(err, Error::Unauthenticated { clear_credential: true }));
    }

    #[test]
    fn bad_password_issues_no_session() {
        let (_dir, state) = testing::state();
        state.register("Alice", "alice@x.test", "secret1").unwrap();

        assert!(matches!(
            state.login("alice@x.test", "wrong"),
            Err(Error::InvalidCredentials)
        ));
        let sessions: i64 = state
            .db
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM sessions", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(sessions, 0);
    }

    #[test]
    fn bulletin_scenario() {
        let (_dir, state) = testing::state();

        let alice = state.register("Alice", "alice@x.test", "secret1").unwrap();
        let login = state.login("alice@x.test", "secret1").unwrap();
        let caller = state.resolve_identity(Some(&login.token)).unwrap();
        assert_eq!(caller, alice.id);
        let post = state.posts.create(caller, &offer("bread")).unwrap();

        let bob = state.register("Bob", "bob@x.test", "secret2").unwrap();
        let on = state.interests.toggle(post.id, bob.id).unwrap();
        assert!(on.interested);
        assert_eq!(on.count, 1);
        let off = state.interests.toggle(post.id, bob.id).unwrap();
        assert!(!off.interested);
        assert_eq!(off.count, 0);

        state.posts.delete(post.id, alice.id).unwrap();
        assert!(matches!(state.posts.get(post.id), Err(Error::NotFound("post"))));
    }
}
