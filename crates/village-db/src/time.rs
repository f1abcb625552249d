use chrono::{DateTime, NaiveDateTime, Utc};

/// Storage format for timestamps. Matches SQLite's `datetime('now')`, so
/// values written from Rust and column defaults compare lexicographically.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses a stored timestamp; RFC 3339 is accepted for rows written by hand.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    raw.parse::<DateTime<Utc>>().or_else(|_| {
        NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT).map(|ndt| ndt.and_utc())
    })
}
