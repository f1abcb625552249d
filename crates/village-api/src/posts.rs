use axum::{
    Extension, Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};

use village_types::api::{
    ContactResponse, CreatePostRequest, InterestResponse, ListPostsQuery, MessageResponse,
    PostDetailResponse, PostListResponse,
};
use village_types::models::PostId;

use crate::auth::AppState;
use crate::contact::mailto_for_post;
use crate::error::{Error, Result, blocking};
use crate::middleware::{Caller, MaybeCaller};
use crate::validation;

type PathId = std::result::Result<Path<PostId>, PathRejection>;

fn post_id(path: PathId) -> Result<PostId> {
    path.map(|Path(id)| id)
        .map_err(|_| Error::InvalidInput("invalid post id".into()))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(Caller(user_id)): Extension<Caller>,
    payload: std::result::Result<Json<CreatePostRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(req) = payload.map_err(|_| Error::InvalidInput("invalid JSON".into()))?;
    let new_post = validation::new_post(req)?;

    let post = blocking(move || state.posts.create(user_id, &new_post)).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn list(
    State(state): State<AppState>,
    query: std::result::Result<Query<ListPostsQuery>, QueryRejection>,
) -> Result<impl IntoResponse> {
    let Query(query) = query.map_err(|_| Error::InvalidInput("invalid query".into()))?;
    let filter = validation::post_filter(query)?;

    let posts = blocking(move || state.posts.list(filter)).await?;
    Ok(Json(PostListResponse {
        count: posts.len(),
        posts,
    }))
}

pub async fn get(
    State(state): State<AppState>,
    Extension(MaybeCaller(caller)): Extension<MaybeCaller>,
    path: PathId,
) -> Result<impl IntoResponse> {
    let id = post_id(path)?;

    let detail = blocking(move || {
        let post = state.posts.get(id)?;
        let interest_count = state.interests.count(id)?;
        let interested = match caller {
            Some(user_id) => state.interests.is_interested(id, user_id)?,
            None => false,
        };
        Ok(PostDetailResponse {
            post,
            interest_count,
            interested,
        })
    })
    .await?;

    Ok(Json(detail))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(Caller(user_id)): Extension<Caller>,
    path: PathId,
) -> Result<impl IntoResponse> {
    let id = post_id(path)?;
    blocking(move || state.posts.delete(id, user_id)).await?;

    Ok(Json(MessageResponse {
        message: "post deleted".into(),
    }))
}

pub async fn contact(
    State(state): State<AppState>,
    Extension(Caller(user_id)): Extension<Caller>,
    path: PathId,
) -> Result<impl IntoResponse> {
    let id = post_id(path)?;
    let mailto =
        blocking(move || mailto_for_post(&state.posts, &state.credentials, id, user_id)).await?;

    Ok(Json(ContactResponse { mailto }))
}

pub async fn toggle_interest(
    State(state): State<AppState>,
    Extension(Caller(user_id)): Extension<Caller>,
    path: PathId,
) -> Result<impl IntoResponse> {
    let id = post_id(path)?;
    let toggle = blocking(move || state.interests.toggle(id, user_id)).await?;

    Ok(Json(InterestResponse {
        interested: toggle.interested,
        interest_count: toggle.count,
    }))
}
