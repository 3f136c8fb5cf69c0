//! JSON-file content store.
//!
//! The desktop stand-in for the OS-managed calendar store: rows live in a
//! single JSON file (by default under `~/.calprobe/`) and every successful
//! insert is written through before the reference is returned.

use super::{
    CalendarFilter, ChangeObserver, Collection, ContentStore, Cursor, EventFilter, EventId,
    StoreData, StoreError, StoreResult,
};
use crate::calendar::types::{CalendarRecord, EventConfig, EventRecord};
use crate::permissions::{Permission, PermissionSet};
use crate::sync::Account;
use log::{debug, info};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

pub const STORE_DIR: &str = ".calprobe";
pub const STORE_FILE: &str = "store.json";

// Cap on the store file size before loading it.
const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

pub struct FileStore {
    path: PathBuf,
    data: Mutex<StoreData>,
    observers: Mutex<Vec<Box<dyn ChangeObserver>>>,
    open_cursors: Arc<AtomicUsize>,
    permissions: PermissionSet,
}

impl FileStore {
    /// Open (or create) the store file at `path`.
    pub fn open(path: impl Into<PathBuf>, permissions: PermissionSet) -> StoreResult<Self> {
        let path = path.into();
        let data = load_data(&path)?;
        debug!(
            "Opened store at {} ({} calendar(s), {} event(s))",
            path.display(),
            data.calendars.len(),
            data.events.len()
        );
        Ok(FileStore {
            path,
            data: Mutex::new(data),
            observers: Mutex::new(Vec::new()),
            open_cursors: Arc::new(AtomicUsize::new(0)),
            permissions,
        })
    }

    /// Create one calendar per account when the store is still empty, then
    /// persist. A no-op on an already-populated store.
    pub fn seed_calendars(&self, accounts: &[Account]) -> StoreResult<()> {
        let mut data = self.data_lock();
        if data.seed_calendars(accounts) {
            info!("Seeded {} calendar(s) from configured accounts", data.calendars.len());
            save_data(&self.path, &data)?;
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
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

impl ContentStore for FileStore {
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
        let mut data = self.data_lock();
        let record = data.insert_event(event)?;

        // Write through before handing out the reference; an event that
        // never reached disk must not look inserted.
        if let Err(e) = save_data(&self.path, &data) {
            data.events.retain(|r| r.id != record.id);
            data.next_event_id -= 1;
            return Err(e);
        }
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

/// Default store file location: `~/.calprobe/store.json`.
pub fn default_store_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(STORE_DIR).join(STORE_FILE))
}

fn load_data(path: &Path) -> StoreResult<StoreData> {
    if !path.exists() {
        return Ok(StoreData::default());
    }

    let metadata = std::fs::metadata(path)?;
    if metadata.len() > MAX_FILE_SIZE {
        return Err(StoreError::Corrupt(format!(
            "{} exceeds the {} byte size limit",
            path.display(),
            MAX_FILE_SIZE
        )));
    }

    let file = File::open(path)?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader)
        .map_err(|e| StoreError::Corrupt(format!("failed to parse {}: {}", path.display(), e)))
}

fn save_data(path: &Path, data: &StoreData) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, data)
        .map_err(|e| StoreError::Corrupt(format!("failed to write {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    fn account(name: &str) -> Account {
        Account { name: name.to_string(), account_type: "com.google".to_string() }
    }

    fn store_in(dir: &TempDir) -> FileStore {
        FileStore::open(dir.path().join("store.json"), PermissionSet::all_granted()).unwrap()
    }

    #[test]
    fn opening_a_missing_file_yields_an_empty_store() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.query_calendars(&CalendarFilter::default()).unwrap().count(), 0);
    }

    #[test]
    fn seeding_creates_one_calendar_per_account() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.seed_calendars(&[account("alice@example.com"), account("bob@example.com")]).unwrap();

        let calendars: Vec<_> =
            store.query_calendars(&CalendarFilter::default()).unwrap().collect();
        assert_eq!(calendars.len(), 2);
        assert!(calendars.iter().all(|c| c.display_name == c.account_name));
    }

    #[test]
    fn seeding_is_a_no_op_on_a_populated_store() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.seed_calendars(&[account("alice@example.com")]).unwrap();
        store.seed_calendars(&[account("bob@example.com")]).unwrap();

        assert_eq!(store.query_calendars(&CalendarFilter::default()).unwrap().count(), 1);
    }

    #[test]
    fn inserted_events_survive_a_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");

        let id = {
            let store = FileStore::open(&path, PermissionSet::all_granted()).unwrap();
            store.seed_calendars(&[account("alice@example.com")]).unwrap();
            let start = Utc::now();
            let config = EventConfig::new(1, "Persisted", start, start + Duration::hours(1));
            store.insert_event(&config).unwrap()
        };

        let reopened = FileStore::open(&path, PermissionSet::all_granted()).unwrap();
        let events: Vec<_> = reopened.query_events(&EventFilter::default()).unwrap().collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, id.0);
        assert_eq!(events[0].title, "Persisted");
    }

    #[test]
    fn corrupt_file_is_reported_not_swallowed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "not json").unwrap();

        let result = FileStore::open(&path, PermissionSet::all_granted());
        assert!(matches!(result, Err(StoreError::Corrupt(_))));
    }
}
