//! Demo data for a fresh village. Safe to run repeatedly: users are matched by
//! email, events and posts by (author, title).

use std::collections::HashMap;

use anyhow::Context;
use chrono::{DateTime, Utc};
use tracing::info;

use village_types::models::{Category, EventKind, PostKind, UserId};

use crate::auth::AppStateInner;
use crate::error::{Error, Result};
use crate::resources::{NewEvent, NewPost};

struct SeedUser {
    name: &'static str,
    email: &'static str,
    password: &'static str,
}

struct SeedEvent {
    author: &'static str,
    kind: EventKind,
    title: &'static str,
    description: &'static str,
    location: &'static str,
    start_time: &'static str,
    end_time: &'static str,
}

struct SeedPost {
    author: &'static str,
    kind: PostKind,
    title: &'static str,
    body: &'static str,
    category: Category,
    event: Option<&'static str>,
}

const USERS: &[SeedUser] = &[
    SeedUser { name: "Jan Visser", email: "jan@village.nl", password: "jan123" },
    SeedUser { name: "Maria de Boer", email: "maria@village.nl", password: "maria123" },
    SeedUser { name: "Pieter Bakker", email: "pieter@village.nl", password: "pieter123" },
    SeedUser { name: "Sophie Jansen", email: "sophie@village.nl", password: "sophie123" },
    SeedUser { name: "Kees Mulder", email: "kees@village.nl", password: "kees123" },
    SeedUser { name: "Anna de Vries", email: "anna@village.nl", password: "anna123" },
];

const EVENTS: &[SeedEvent] = &[
    SeedEvent {
        author: "jan@village.nl",
        kind: EventKind::GarageSale,
        title: "Jan's Garage Sale",
        description: "Old fishing gear, tools, and boat parts. Everything priced to go!",
        location: "Housenumber 7, driveway",
        start_time: "2026-06-15T09:00:00Z",
        end_time: "2026-06-15T12:00:00Z",
    },
    SeedEvent {
        author: "maria@village.nl",
        kind: EventKind::GarageSale,
        title: "Maria's Garden Sale",
        description: "Homemade preserves, old kitchenware, and children's books.",
        location: "Housenumber 15, front garden",
        start_time: "2026-06-15T09:30:00Z",
        end_time: "2026-06-15T13:00:00Z",
    },
    SeedEvent {
        author: "pieter@village.nl",
        kind: EventKind::Sport,
        title: "Village Football Match",
        description: "Annual match: East Village vs West Village. All skill levels welcome!",
        location: "Sports field behind the church",
        start_time: "2026-06-15T14:00:00Z",
        end_time: "2026-06-15T16:00:00Z",
    },
    SeedEvent {
        author: "kees@village.nl",
        kind: EventKind::Sport,
        title: "Kids' Sack Race & Games",
        description: "Fun games for children under 12. Prizes for everyone!",
        location: "Village green",
        start_time: "2026-06-15T13:00:00Z",
        end_time: "2026-06-15T14:30:00Z",
    },
    SeedEvent {
        author: "sophie@village.nl",
        kind: EventKind::Gathering,
        title: "Evening BBQ & Music",
        description: "Bring your own drinks, meat provided. Live acoustic music from 20:00.",
        location: "Community hall garden",
        start_time: "2026-06-15T18:00:00Z",
        end_time: "2026-06-15T23:00:00Z",
    },
];

macro_rules! post {
    ($author:expr, $kind:ident, $title:expr, $body:expr, $category:ident) => {
        post!($author, $kind, $title, $body, $category, None)
    };
    ($author:expr, $kind:ident, $title:expr, $body:expr, $category:ident, $event:expr) => {
        SeedPost {
            author: $author,
            kind: PostKind::$kind,
            title: $title,
            body: $body,
            category: Category::$category,
            event: $event,
        }
    };
}

const POSTS: &[SeedPost] = &[
    post!("jan@village.nl", Offer, "Fresh herring from this morning",
        "Caught 5kg of herring at the lake. Pick up at harbor before noon. €5/kg.", Fish),
    post!("maria@village.nl", Offer, "Homemade apple jam",
        "Made with apples from our garden. 6 jars available, €3 each.", Produce),
    post!("pieter@village.nl", Request, "Need help fixing garden fence",
        "Few panels blown over in the storm. Can anyone help this Saturday? I'll provide lunch!", Services),
    post!("sophie@village.nl", Offer, "Hand-knitted scarves",
        "Wool scarves in various colors. Perfect for the coming winter. €15 each.", Crafts),
    post!("kees@village.nl", Announcement, "Road closure next week",
        "The Dorpsstraat will be closed Mon-Wed for pipe repairs. Use the Molenweg detour.", Other),
    post!("anna@village.nl", Offer, "Free-range eggs",
        "Our chickens are laying well! Fresh eggs available daily, €2.50 per dozen.", Produce),
    post!("jan@village.nl", Request, "Looking for a dog sitter",
        "Going away for a weekend in March. Need someone to watch our labrador Rex.", Services),
    post!("maria@village.nl", Announcement, "Village council meeting",
        "Next meeting is March 5th at 19:30 in the community hall. All welcome.", Other),
    post!("pieter@village.nl", Offer, "Smoked mackerel",
        "Smoked it myself yesterday. 2kg available. €8/kg, ready to eat.", Fish),
    post!("sophie@village.nl", Request, "Looking for wool donations",
        "Starting a knitting group for teens. Any leftover yarn welcome!", Crafts),
    post!("kees@village.nl", Offer, "Tractor available for garden work",
        "Can help plough or move heavy loads this weekend. Free for neighbours.", Services),
    post!("anna@village.nl", Request, "Wanted: rhubarb",
        "Looking for rhubarb to make a pie for village day. Will trade for eggs!", Produce),
    post!("jan@village.nl", Offer, "Old fishing rods at Village Day",
        "Selling 3 fishing rods and a tackle box at my garage sale. €10-€25 each.", Fish,
        Some("Jan's Garage Sale")),
    post!("anna@village.nl", Offer, "Fresh eggs at Maria's sale",
        "I'll have a table at Maria's garden sale with eggs and rhubarb cake!", Produce,
        Some("Maria's Garden Sale")),
];

/// Rows created by one [`seed`] run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub users: usize,
    pub events: usize,
    pub posts: usize,
}

fn timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .with_context(|| format!("seed timestamp {raw}"))
        .map_err(Error::Internal)
}

/// Inserts whatever demo rows are missing. Events go in before posts so
/// linked posts can find them.
pub fn seed(state: &AppStateInner) -> Result<SeedReport> {
    let mut report = SeedReport::default();
    let mut ids: HashMap<&str, UserId> = HashMap::new();

    for user in USERS {
        let id = match state.credentials.get_by_email(user.email) {
            Ok(existing) => existing.id,
            Err(Error::NotFound(_)) => {
                report.users += 1;
                state.register(user.name, user.email, user.password)?.id
            }
            Err(e) => return Err(e),
        };
        ids.insert(user.email, id);
    }

    for event in EVENTS {
        let Some(&owner) = ids.get(event.author) else {
            continue;
        };
        if state.db.find_event_id(owner, event.title)?.is_some() {
            continue;
        }
        state.events.create(
            owner,
            &NewEvent {
                title: event.title.to_string(),
                description: event.description.to_string(),
                kind: event.kind,
                location: event.location.to_string(),
                start_time: timestamp(event.start_time)?,
                end_time: Some(timestamp(event.end_time)?),
            },
        )?;
        report.events += 1;
    }

    for post in POSTS {
        let Some(&owner) = ids.get(post.author) else {
            continue;
        };
        if state.db.find_post_id(owner, post.title)?.is_some() {
            continue;
        }
        let event_id = match post.event {
            Some(title) => state.db.find_event_id_by_title(title)?,
            None => None,
        };
        state.posts.create(
            owner,
            &NewPost {
                kind: post.kind,
                title: post.title.to_string(),
                body: post.body.to_string(),
                category: post.category,
                event_id,
            },
        )?;
        report.posts += 1;
    }

    info!(
        "Seeded {} users, {} events, {} posts",
        report.users, report.events, report.posts
    );
    Ok(report)
}
