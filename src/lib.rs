pub mod app;
pub mod calendar;
pub mod config;
pub mod delegate;
pub mod permissions;
pub mod store;
pub mod sync;

use anyhow::Result;
use log::*;

pub async fn run() -> Result<()> {
    let mut app = app::Application::new()?;
    info!("Initializing calprobe application");
    app.run().await
}

// Re-export commonly used types
pub use calendar::{CalendarError, CalendarRecord, EventConfig, EventRecord};
pub use config::Config;
pub use store::{ContentStore, EventFilter, FileStore, MemoryStore};
pub use sync::SyncOutcome;
