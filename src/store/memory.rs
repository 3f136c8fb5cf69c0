//! In-memory content store.
//!
//! Backs the unit and integration tests, and is the building block the file
//! backend persists. Tracks open cursor handles so tests can assert that
//! every query releases its cursor.

use super::{
    CalendarFilter, ChangeObserver, Collection, ContentStore, Cursor, EventFilter, EventId,
    StoreData, StoreError, StoreResult,
};
use crate::calendar::types::{CalendarRecord, EventConfig, EventRecord};
use crate::permissions::{Permission, PermissionSet};
use log::debug;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

pub struct MemoryStore {
    data: Mutex<StoreData>,
    observers: Mutex<Vec<Box<dyn ChangeObserver>>>,
    open_cursors: Arc<AtomicUsize>,
    permissions: PermissionSet,
}

impl MemoryStore {
    pub fn new(permissions: PermissionSet) -> Self {
        MemoryStore {
            data: Mutex::new(StoreData::default()),
            observers: Mutex::new(Vec::new()),
            open_cursors: Arc::new(AtomicUsize::new(0)),
            permissions,
        }
    }

    pub fn with_calendars(permissions: PermissionSet, calendars: Vec<CalendarRecord>) -> Self {
        let store = Self::new(permissions);
        {
            let mut data = store.data_lock();
            data.next_calendar_id = calendars.iter().map(|c| c.id).max().unwrap_or(0);
            data.calendars = calendars;
        }
        store
    }

    /// Number of query cursors handed out and not yet released.
    pub fn open_cursors(&self) -> usize {
        self.open_cursors.load(Ordering::SeqCst)
    }

    fn require(&self, permission: Permission) -> StoreResult<()> {
        if self.permissions.is_granted(permission) {
            Ok(())
        } else {
            Err(StoreError::PermissionDenied(permission))
        }
    }

    fn open_cursor<T>(&self, rows: Vec<T>) -> Cursor<T> {
        self.open_cursors.fetch_add(1, Ordering::SeqCst);
        let counter = Arc::clone(&self.open_cursors);
        Cursor::new(rows, move || {
            counter.fetch_sub(1, Ordering::SeqCst);
        })
    }

    fn data_lock(&self) -> MutexGuard<'_, StoreData> {
        self.data.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ContentStore for MemoryStore {
    fn query_calendars(&self, filter: &CalendarFilter) -> StoreResult<Cursor<CalendarRecord>> {
        self.require(Permission::ReadCalendar)?;
        let rows = self.data_lock().select_calendars(filter);
        debug!("Calendar query matched {} row(s)", rows.len());
        Ok(self.open_cursor(rows))
    }

    fn query_events(&self, filter: &EventFilter) -> StoreResult<Cursor<EventRecord>> {
        self.require(Permission::ReadCalendar)?;
        let rows = self.data_lock().select_events(filter);
        debug!("Event query matched {} row(s)", rows.len());
        Ok(self.open_cursor(rows))
    }

    fn insert_event(&self, event: &EventConfig) -> StoreResult<EventId> {
        self.require(Permission::WriteCalendar)?;
        let record = self.data_lock().insert_event(event)?;
        Ok(EventId(record.id))
    }

    fn register_observer(&self, observer: Box<dyn ChangeObserver>) {
        self.observers.lock().unwrap_or_else(|e| e.into_inner()).push(observer);
    }

    fn notify_change(&self, collection: Collection) {
        let observers = self.observers.lock().unwrap_or_else(|e| e.into_inner());
        for observer in observers.iter() {
            observer.on_change(collection);
        }
    }
}
