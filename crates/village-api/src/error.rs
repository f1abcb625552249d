use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use village_db::DbError;
use village_types::api::ErrorResponse;

use crate::middleware::removal_cookie;

/// Failures returned by the core and rendered by the HTTP layer.
#[derive(Error, Debug)]
pub enum Error {
    /// Caller-correctable input problem; the message is shown to the client.
    #[error("{0}")]
    InvalidInput(String),

    /// Unknown email or wrong password. The two are never distinguished.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// No usable credential. `clear_credential` asks the transport to drop a
    /// token the client is still holding.
    #[error("{}", unauthenticated_message(.clear_credential))]
    Unauthenticated { clear_credential: bool },

    /// Missing, or owned by someone else.
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("internal error: {0:#}")]
    Internal(anyhow::Error),
}

fn unauthenticated_message(clear_credential: &bool) -> &'static str {
    if *clear_credential {
        "session expired"
    } else {
        "authentication required"
    }
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<DbError> for Error {
    fn from(err: DbError) -> Self {
        Error::Internal(err.into())
    }
}

impl From<argon2::password_hash::Error> for Error {
    fn from(err: argon2::password_hash::Error) -> Self {
        Error::Internal(anyhow::anyhow!("password hash: {}", err))
    }
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::InvalidCredentials | Error::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            // Internals stay in the server log
            Error::Internal(e) => {
                error!("{:#}", e);
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        let body = Json(ErrorResponse { error: message });

        match self {
            Error::Unauthenticated {
                clear_credential: true,
            } => (
                status,
                [(header::SET_COOKIE, removal_cookie().to_string())],
                body,
            )
                .into_response(),
            _ => (status, body).into_response(),
        }
    }
}

/// Runs blocking storage/hashing work off the async runtime.
pub async fn blocking<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        Error::Internal(e.into())
    })?
}
