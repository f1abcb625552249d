use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type UserId = i64;
pub type PostId = i64;
pub type EventId = i64;

/// A registered villager. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostKind {
    Offer,
    Request,
    Announcement,
}

impl PostKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Offer => "offer",
            Self::Request => "request",
            Self::Announcement => "announcement",
        }
    }
}

impl FromStr for PostKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "offer" => Ok(Self::Offer),
            "request" => Ok(Self::Request),
            "announcement" => Ok(Self::Announcement),
            other => Err(UnknownVariant {
                kind: "post type",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for PostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Fish,
    Produce,
    Crafts,
    Services,
    #[default]
    Other,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fish => "fish",
            Self::Produce => "produce",
            Self::Crafts => "crafts",
            Self::Services => "services",
            Self::Other => "other",
        }
    }
}

impl FromStr for Category {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fish" => Ok(Self::Fish),
            "produce" => Ok(Self::Produce),
            "crafts" => Ok(Self::Crafts),
            "services" => Ok(Self::Services),
            "other" => Ok(Self::Other),
            other => Err(UnknownVariant {
                kind: "category",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    GarageSale,
    Sport,
    Gathering,
    Other,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GarageSale => "garage_sale",
            Self::Sport => "sport",
            Self::Gathering => "gathering",
            Self::Other => "other",
        }
    }
}

impl FromStr for EventKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "garage_sale" => Ok(Self::GarageSale),
            "sport" => Ok(Self::Sport),
            "gathering" => Ok(Self::Gathering),
            "other" => Ok(Self::Other),
            other => Err(UnknownVariant {
                kind: "event type",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bulletin post. `author` and `event_title` are joined in at read time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub user_id: UserId,
    pub author: String,
    #[serde(rename = "type")]
    pub kind: PostKind,
    pub title: String,
    pub body: String,
    pub category: Category,
    pub event_id: Option<EventId>,
    pub event_title: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub user_id: UserId,
    pub author: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "event_type")]
    pub kind: EventKind,
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
