use axum::{
    extract::{Request, State},
    http::{HeaderValue, header},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use tracing::warn;

use village_types::models::UserId;

use crate::auth::AppState;
use crate::error::{Result, blocking};
use crate::sessions::SESSION_TTL_DAYS;

pub const SESSION_COOKIE: &str = "session";

/// Authenticated caller, inserted by [`require_auth`].
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub UserId);

/// Caller if any, inserted by [`optional_auth`].
#[derive(Debug, Clone, Copy)]
pub struct MaybeCaller(pub Option<UserId>);

fn base_cookie(value: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .build()
}

pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    let mut cookie = base_cookie(token);
    cookie.set_max_age(cookie::time::Duration::days(SESSION_TTL_DAYS));
    cookie.set_secure(secure);
    cookie
}

/// Empty value, `Max-Age=0`: tells the browser to drop the session cookie.
pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = base_cookie(String::new());
    cookie.make_removal();
    cookie
}

fn session_token(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE).map(|c| c.value().to_string())
}

/// Rejects with 401 unless the session cookie maps to a live session.
pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response> {
    let token = session_token(&jar);
    let user_id = blocking(move || state.resolve_identity(token.as_deref())).await?;

    req.extensions_mut().insert(Caller(user_id));
    Ok(next.run(req).await)
}

/// Never rejects an anonymous or stale caller, but still clears a dead cookie.
pub async fn optional_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response> {
    let token = session_token(&jar);
    let resolution = blocking(move || state.identity.resolve(token.as_deref())).await?;

    req.extensions_mut().insert(MaybeCaller(resolution.identity));
    let mut resp = next.run(req).await;

    if resolution.clear_credential {
        match HeaderValue::from_str(&removal_cookie().to_string()) {
            Ok(value) => {
                resp.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => warn!("Could not encode removal cookie: {}", e),
        }
    }
    Ok(resp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_attributes() {
        let cookie = session_cookie("abc".into(), false).to_string();
        assert!(cookie.starts_with("session=abc"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Max-Age=604800"));
        assert!(!cookie.contains("Secure"));

        assert!(session_cookie("abc".into(), true).to_string().contains("Secure"));
    }

    #[test]
    fn removal_cookie_expires_immediately() {
        let cookie = removal_cookie();
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(cookie::time::Duration::ZERO));
    }
}
