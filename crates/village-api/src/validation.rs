//! Request-body and query checks. Everything past this module receives
//! trimmed, bounded, enum-typed values.

use chrono::{DateTime, SubsecRound, Utc};

use village_types::api::{
    CreateEventRequest, CreatePostRequest, ListEventsQuery, ListPostsQuery, RegisterRequest,
};
use village_types::models::{Category, EventKind, PostKind};

use crate::error::{Error, Result};
use crate::resources::{NewEvent, NewPost, PostFilter};

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_BODY_LEN: usize = 2000;
pub const MAX_LOCATION_LEN: usize = 200;

#[derive(Debug)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

fn invalid(msg: &str) -> Error {
    Error::InvalidInput(msg.to_string())
}

fn too_long(value: &str, max: usize) -> bool {
    value.chars().count() > max
}

/// One `@` with something on both sides, no whitespace.
fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

pub fn registration(req: RegisterRequest) -> Result<Registration> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(invalid("name is required"));
    }
    let email = req.email.trim();
    if !looks_like_email(email) {
        return Err(invalid("valid email is required"));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(invalid("password must be at least 6 characters"));
    }

    Ok(Registration {
        name: name.to_string(),
        email: email.to_string(),
        password: req.password,
    })
}

fn title(raw: &str) -> Result<String> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(invalid("title is required"));
    }
    if too_long(title, MAX_TITLE_LEN) {
        return Err(invalid("title must be under 200 characters"));
    }
    Ok(title.to_string())
}

pub fn new_post(req: CreatePostRequest) -> Result<NewPost> {
    let kind: PostKind = req
        .kind
        .parse()
        .map_err(|_| invalid("type must be offer, request, or announcement"))?;
    let title = title(&req.title)?;
    if too_long(&req.body, MAX_BODY_LEN) {
        return Err(invalid("body must be under 2000 characters"));
    }
    let category = match req.category.as_str() {
        "" => Category::default(),
        raw => raw
            .parse()
            .map_err(|_| invalid("category must be fish, produce, crafts, services, or other"))?,
    };

    Ok(NewPost {
        kind,
        title,
        body: req.body,
        category,
        event_id: req.event_id,
    })
}

/// Empty filter values mean "no filter"; anything else must be a known variant.
pub fn post_filter(query: ListPostsQuery) -> Result<PostFilter> {
    let kind = match query.kind.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(raw.parse().map_err(|_| invalid("invalid type filter"))?),
    };
    let category = match query.category.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(raw.parse().map_err(|_| invalid("invalid category filter"))?),
    };
    Ok(PostFilter { kind, category })
}

/// Truncated to whole seconds, the precision events are stored at.
fn rfc3339(raw: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc).trunc_subsecs(0))
        .map_err(|_| Error::InvalidInput(format!("{field} must be a valid RFC3339 datetime")))
}

pub fn new_event(req: CreateEventRequest) -> Result<NewEvent> {
    let title = title(&req.title)?;
    if too_long(&req.description, MAX_BODY_LEN) {
        return Err(invalid("description must be under 2000 characters"));
    }
    let kind: EventKind = req
        .event_type
        .parse()
        .map_err(|_| invalid("event_type must be garage_sale, sport, gathering, or other"))?;
    if too_long(&req.location, MAX_LOCATION_LEN) {
        return Err(invalid("location must be under 200 characters"));
    }

    if req.start_time.is_empty() {
        return Err(invalid("start_time is required"));
    }
    let start_time = rfc3339(&req.start_time, "start_time")?;
    let end_time = match req.end_time.as_deref() {
        None | Some("") => None,
        Some(raw) => {
            let end = rfc3339(raw, "end_time")?;
            if end <= start_time {
                return Err(invalid("end_time must be after start_time"));
            }
            Some(end)
        }
    };

    Ok(NewEvent {
        title,
        description: req.description,
        kind,
        location: req.location,
        start_time,
        end_time,
    })
}

pub fn event_filter(query: ListEventsQuery) -> Result<Option<EventKind>> {
    match query.kind.as_deref() {
        None | Some("") => Ok(None),
        Some(raw) => Ok(Some(raw.parse().map_err(|_| invalid("invalid event type filter"))?)),
    }
}
