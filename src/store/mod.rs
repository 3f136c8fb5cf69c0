//! Content-store seam.
//!
//! All calendar and event state lives in an external, system-managed store;
//! this module defines the query/insert/notify interface the rest of the
//! crate talks through, plus the two backends that stand in for it on a
//! desktop: an in-memory store and a JSON-file store.

pub mod cursor;
pub mod file;
pub mod memory;

pub use cursor::Cursor;
pub use file::{default_store_path, FileStore};
pub use memory::MemoryStore;

use crate::calendar::types::{CalendarRecord, EventConfig, EventRecord};
use crate::permissions::Permission;
use crate::sync::Account;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The two collections the store exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Calendars,
    Events,
}

/// Opaque reference to an inserted event, assigned by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventId(pub i64);

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "event/{}", self.0)
    }
}

/// Selection predicate for the calendars collection.
#[derive(Debug, Clone, Default)]
pub struct CalendarFilter {
    /// Equality match on account type (e.g. "com.google").
    pub account_type: Option<String>,
}

impl CalendarFilter {
    pub fn account_type(account_type: &str) -> Self {
        CalendarFilter { account_type: Some(account_type.to_string()) }
    }

    fn matches(&self, record: &CalendarRecord) -> bool {
        self.account_type.as_deref().map_or(true, |t| record.account_type == t)
    }
}

/// Selection predicate for the events collection. Results are always
/// ordered by ascending start time.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Inclusive lower bound on the event start.
    pub starts_at_or_after: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the event end.
    pub ends_at_or_before: Option<DateTime<Utc>>,
    /// Exact-match title filter.
    pub title: Option<String>,
}

impl EventFilter {
    /// Events starting in [from, to] (end also capped at `to`) with an
    /// exact title.
    pub fn window_with_title(from: DateTime<Utc>, to: DateTime<Utc>, title: &str) -> Self {
        EventFilter {
            starts_at_or_after: Some(from),
            ends_at_or_before: Some(to),
            title: Some(title.to_string()),
        }
    }

    fn matches(&self, record: &EventRecord) -> bool {
        self.starts_at_or_after.map_or(true, |from| record.start >= from)
            && self.ends_at_or_before.map_or(true, |to| record.end <= to)
            && self.title.as_deref().map_or(true, |t| record.title == t)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("permission denied: the {0} permission has not been granted")]
    PermissionDenied(Permission),

    #[error("store rejected the row: {0}")]
    Rejected(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt store file: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Observer registered for change notifications on a collection.
pub trait ChangeObserver: Send + Sync {
    fn on_change(&self, collection: Collection);
}

/// The external store interface: filtered reads over two collections with
/// forward-only cursors, a single-row event insert, and change-notification
/// fan-out.
pub trait ContentStore: Send + Sync {
    fn query_calendars(&self, filter: &CalendarFilter) -> StoreResult<Cursor<CalendarRecord>>;

    /// Query events matching `filter`, ordered by ascending start time.
    fn query_events(&self, filter: &EventFilter) -> StoreResult<Cursor<EventRecord>>;

    /// Insert one event row; the store assigns and returns the reference.
    fn insert_event(&self, event: &EventConfig) -> StoreResult<EventId>;

    fn register_observer(&self, observer: Box<dyn ChangeObserver>);

    /// Publish a change on `collection` to every registered observer.
    fn notify_change(&self, collection: Collection);
}

/// Row data shared by the in-memory and file backends.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct StoreData {
    pub(crate) calendars: Vec<CalendarRecord>,
    pub(crate) events: Vec<EventRecord>,
    pub(crate) next_calendar_id: i64,
    pub(crate) next_event_id: i64,
}

impl StoreData {
    pub(crate) fn select_calendars(&self, filter: &CalendarFilter) -> Vec<CalendarRecord> {
        self.calendars.iter().filter(|c| filter.matches(c)).cloned().collect()
    }

    pub(crate) fn select_events(&self, filter: &EventFilter) -> Vec<EventRecord> {
        let mut rows: Vec<EventRecord> =
            self.events.iter().filter(|e| filter.matches(e)).cloned().collect();
        rows.sort_by_key(|e| e.start);
        rows
    }

    pub(crate) fn insert_event(&mut self, event: &EventConfig) -> StoreResult<EventRecord> {
        if !self.calendars.iter().any(|c| c.id == event.calendar_id) {
            return Err(StoreError::Rejected(format!(
                "no calendar with id {}",
                event.calendar_id
            )));
        }

        self.next_event_id += 1;
        let record = EventRecord {
            id: self.next_event_id,
            calendar_id: event.calendar_id,
            title: event.title.clone(),
            description: event.description.clone(),
            start: event.start,
            end: event.end,
            timezone: event.timezone.name().to_string(),
        };
        self.events.push(record.clone());
        Ok(record)
    }

    /// Create one calendar per account, named after the account itself, when
    /// the store has no calendars yet. This is how a fresh store comes to
    /// have a "primary" calendar per account.
    pub(crate) fn seed_calendars(&mut self, accounts: &[Account]) -> bool {
        if !self.calendars.is_empty() {
            return false;
        }
        for account in accounts {
            self.next_calendar_id += 1;
            self.calendars.push(CalendarRecord {
                id: self.next_calendar_id,
                display_name: account.name.clone(),
                account_name: account.name.clone(),
                account_type: account.account_type.clone(),
            });
        }
        !accounts.is_empty()
    }
}
