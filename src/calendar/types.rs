//! Record types for the calendar and event collections.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Immutable snapshot of one calendar row read from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarRecord {
    pub id: i64,
    pub display_name: String,
    pub account_name: String,
    pub account_type: String,
}

/// One event row as stored. Timestamps are UTC; `timezone` is the IANA
/// identifier the event was created with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: i64,
    pub calendar_id: i64,
    pub title: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub timezone: String,
}

/// The fields of an event to be inserted. The writer does not check
/// `start < end`; that is the caller's job (see the validation module).
#[derive(Debug, Clone)]
pub struct EventConfig {
    pub calendar_id: i64,
    pub title: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub timezone: Tz,
}

impl EventConfig {
    pub fn new(calendar_id: i64, title: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        EventConfig {
            calendar_id,
            title: title.to_string(),
            description: String::new(),
            start,
            end,
            timezone: Tz::UTC,
        }
    }
}
