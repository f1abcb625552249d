use serde::{Deserialize, Serialize};

use crate::models::{Event, EventId, Post};

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

// -- Posts --

/// Raw post fields as sent by the client; enum fields stay strings until validated.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePostRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub event_id: Option<EventId>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListPostsQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostListResponse {
    pub posts: Vec<Post>,
    pub count: usize,
}

/// A single post plus the interest state as seen by the caller.
#[derive(Debug, Serialize, Deserialize)]
pub struct PostDetailResponse {
    #[serde(flatten)]
    pub post: Post,
    pub interest_count: i64,
    pub interested: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InterestResponse {
    pub interested: bool,
    pub interest_count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContactResponse {
    pub mailto: String,
}

// -- Events --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateEventRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub event_type: String,
    #[serde(default)]
    pub location: String,
    pub start_time: String,
    #[serde(default)]
    pub end_time: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListEventsQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EventListResponse {
    pub events: Vec<Event>,
    pub count: usize,
}

// -- Misc --

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
