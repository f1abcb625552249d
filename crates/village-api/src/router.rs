use std::path::Path;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use village_types::api::ErrorResponse;

use crate::auth::{self, AppState};
use crate::middleware::{optional_auth, require_auth};
use crate::{events, health, posts};

pub const MAX_BODY_BYTES: usize = 1024 * 1024;

async fn api_not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "not found".into(),
        }),
    )
}

/// JSON API under `/api`, static files everywhere else.
pub fn router(state: AppState, static_dir: &Path) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health::health))
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/posts", get(posts::list))
        .route("/events", get(events::list))
        .route("/events/{id}", get(events::get));

    let optional_routes = Router::new()
        .route("/posts/{id}", get(posts::get))
        .route_layer(middleware::from_fn_with_state(state.clone(), optional_auth));

    let protected_routes = Router::new()
        .route("/me", get(auth::me))
        .route("/posts", post(posts::create))
        .route("/posts/{id}", axum::routing::delete(posts::delete))
        .route("/posts/{id}/contact", get(posts::contact))
        .route("/posts/{id}/interest", post(posts::toggle_interest))
        .route("/events", post(events::create))
        .route("/events/{id}", axum::routing::delete(events::delete))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let api = Router::new()
        .merge(public_routes)
        .merge(optional_routes)
        .merge(protected_routes)
        .fallback(api_not_found)
        .with_state(state);

    let assets = ServeDir::new(static_dir)
        .not_found_service(ServeFile::new(static_dir.join("404.html")));

    Router::new()
        .nest("/api", api)
        .fallback_service(assets)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("same-origin"),
        ))
        .layer(TraceLayer::new_for_http())
}
