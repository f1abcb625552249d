use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::error;

use village_types::api::HealthResponse;

use crate::auth::AppState;
use crate::error::blocking;

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let db = state.db.clone();
    let ping = blocking(move || Ok(db.ping()?)).await;

    match ping {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok".into(),
                message: None,
            }),
        ),
        Err(e) => {
            error!("Health check failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(HealthResponse {
                    status: "error".into(),
                    message: Some("database unreachable".into()),
                }),
            )
        }
    }
}
