//! The calendar event workflow: list calendars for an account type, pick
//! the account's primary calendar, insert an event, and query inserted
//! events back out of the store.

use crate::store::{
    CalendarFilter, Collection, ContentStore, Cursor, EventFilter, EventId, StoreError,
};
use log::{debug, info};

pub mod types;
pub mod validation;

#[cfg(test)]
mod calendar_tests;

pub use types::{CalendarRecord, EventConfig, EventRecord};

/// Custom error type for calendar operations
#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    #[error("No primary calendar found for account type '{0}'")]
    NoCalendarFound(String),

    #[error("Failed to write event to the calendar store: {0}")]
    WriteFailed(String),

    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// List calendars belonging to `account_type`, in store order. An empty
/// match is an empty cursor, not an error.
pub fn list_calendars(
    store: &dyn ContentStore,
    account_type: &str,
) -> Result<Cursor<CalendarRecord>, CalendarError> {
    Ok(store.query_calendars(&CalendarFilter::account_type(account_type))?)
}

/// Find the account's primary calendar: the first calendar (in store order)
/// whose display name equals its account name.
///
/// Note: this heuristic misselects when the user has renamed their default
/// calendar; it is kept because it is all the store's naming gives us to go
/// on without a provider API.
pub fn find_primary_calendar(
    store: &dyn ContentStore,
    account_type: &str,
) -> Result<CalendarRecord, CalendarError> {
    let cursor = list_calendars(store, account_type)?;
    for record in cursor {
        debug!(
            "Calendar row: id={} name={} account={}",
            record.id, record.display_name, record.account_name
        );
        if record.display_name == record.account_name {
            info!("Selected primary calendar id={} name={}", record.id, record.display_name);
            return Ok(record);
        }
    }
    Err(CalendarError::NoCalendarFound(account_type.to_string()))
}

/// Insert one event into the store and publish a change notification on the
/// events collection. Best-effort and non-transactional: there is no
/// rollback if anything after the insert fails.
///
/// `start < end` is not checked here; run
/// [`validation::validate_event_config`] first.
pub fn create_event(
    store: &dyn ContentStore,
    config: &EventConfig,
) -> Result<EventId, CalendarError> {
    let id = store
        .insert_event(config)
        .map_err(|e| CalendarError::WriteFailed(e.to_string()))?;

    store.notify_change(Collection::Events);
    info!("Inserted event '{}' as {}", config.title, id);
    Ok(id)
}

/// Query events matching `filter`, ordered by ascending start time. An
/// empty result set is a normal outcome.
pub fn query_events(
    store: &dyn ContentStore,
    filter: &EventFilter,
) -> Result<Cursor<EventRecord>, CalendarError> {
    Ok(store.query_events(filter)?)
}
