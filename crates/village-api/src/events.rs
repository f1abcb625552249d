use axum::{
    Extension, Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};

use village_types::api::{CreateEventRequest, EventListResponse, ListEventsQuery, MessageResponse};
use village_types::models::EventId;

use crate::auth::AppState;
use crate::error::{Error, Result, blocking};
use crate::middleware::Caller;
use crate::validation;

type PathId = std::result::Result<Path<EventId>, PathRejection>;

fn event_id(path: PathId) -> Result<EventId> {
    path.map(|Path(id)| id)
        .map_err(|_| Error::InvalidInput("invalid event id".into()))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(Caller(user_id)): Extension<Caller>,
    payload: std::result::Result<Json<CreateEventRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(req) = payload.map_err(|_| Error::InvalidInput("invalid JSON".into()))?;
    let new_event = validation::new_event(req)?;

    let event = blocking(move || state.events.create(user_id, &new_event)).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn list(
    State(state): State<AppState>,
    query: std::result::Result<Query<ListEventsQuery>, QueryRejection>,
) -> Result<impl IntoResponse> {
    let Query(query) = query.map_err(|_| Error::InvalidInput("invalid query".into()))?;
    let kind = validation::event_filter(query)?;

    let events = blocking(move || state.events.list(kind)).await?;
    Ok(Json(EventListResponse {
        count: events.len(),
        events,
    }))
}

pub async fn get(State(state): State<AppState>, path: PathId) -> Result<impl IntoResponse> {
    let id = event_id(path)?;
    let event = blocking(move || state.events.get(id)).await?;
    Ok(Json(event))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(Caller(user_id)): Extension<Caller>,
    path: PathId,
) -> Result<impl IntoResponse> {
    let id = event_id(path)?;
    blocking(move || state.events.delete(id, user_id)).await?;

    Ok(Json(MessageResponse {
        message: "event deleted".into(),
    }))
}
