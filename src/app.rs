//! Terminal front end. One command per operation: request permissions,
//! list calendars, insert an event, query events back, trigger a sync, or
//! delegate event creation to the external editor.

use crate::calendar::{self, validation, CalendarError, EventConfig};
use crate::config::{Config, ConfigAccounts};
use crate::delegate::{self, BrowserComposer, DelegateError, EventComposer, EventDraft, Handoff};
use crate::permissions::{AutoGrantGate, Permission, PermissionGate, PermissionSet};
use crate::store::{
    default_store_path, ChangeObserver, Collection, ContentStore, EventFilter, FileStore,
};
use crate::sync::{trigger_sync, AccountRegistry, LoggingScheduler, SyncOutcome, SyncScheduler};
use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use log::{debug, error, info};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::collections::HashMap;
use std::sync::Arc;

/// Command line arguments structure
#[derive(Debug)]
pub struct CommandArgs {
    pub command: String,
    pub args: Vec<String>,
    pub flags: HashMap<String, Option<String>>,
}

impl CommandArgs {
    pub fn parse(input: &str) -> Result<Self> {
        let mut parts = Vec::new();
        let mut current = String::new();
        let mut in_quotes = false;

        for c in input.chars() {
            match c {
                '"' => {
                    in_quotes = !in_quotes;
                    if !in_quotes && !current.is_empty() {
                        parts.push(current.clone());
                        current.clear();
                    }
                }
                ' ' if !in_quotes => {
                    if !current.is_empty() {
                        parts.push(current.clone());
                        current.clear();
                    }
                }
                _ => current.push(c),
            }
        }
        if !current.is_empty() {
            parts.push(current);
        }

        if parts.is_empty() {
            return Err(anyhow!("No command provided"));
        }

        let command = parts.remove(0).to_lowercase();
        let mut args = Vec::new();
        let mut flags = HashMap::new();
        let mut i = 0;

        while i < parts.len() {
            if parts[i].starts_with("--") {
                let flag = parts[i].clone();
                if i + 1 < parts.len() && !parts[i + 1].starts_with("--") {
                    flags.insert(flag, Some(parts[i + 1].clone()));
                    i += 1;
                } else {
                    flags.insert(flag, None);
                }
            } else {
                args.push(parts[i].clone());
            }
            i += 1;
        }

        Ok(CommandArgs { command, args, flags })
    }
}

/// Logs change notifications published on the store so it is visible that
/// dependent views would refresh.
struct RefreshLogger;

impl ChangeObserver for RefreshLogger {
    fn on_change(&self, collection: Collection) {
        info!("Change published on {:?}; registered views should refresh", collection);
    }
}

pub struct Application {
    config: Config,
    store: Arc<dyn ContentStore>,
    permissions: PermissionSet,
    gate: Box<dyn PermissionGate>,
    registry: Arc<dyn AccountRegistry>,
    scheduler: Arc<dyn SyncScheduler>,
    composer: Box<dyn EventComposer>,
    handoff: Handoff,
}

impl Application {
    pub fn new() -> Result<Self> {
        let config = Config::load()?;
        let permissions = PermissionSet::new();

        let store_path =
            default_store_path().ok_or_else(|| anyhow!("Could not find home directory"))?;
        let store = FileStore::open(store_path, permissions.clone())?;
        store.seed_calendars(&config.accounts())?;
        store.register_observer(Box::new(RefreshLogger));

        let registry: Arc<dyn AccountRegistry> = Arc::new(ConfigAccounts::from_config(&config));

        Ok(Self {
            gate: Box::new(AutoGrantGate::new(permissions.clone())),
            store: Arc::new(store),
            permissions,
            registry,
            scheduler: Arc::new(LoggingScheduler),
            composer: Box::new(BrowserComposer),
            handoff: Handoff::new(),
            config,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        log::info!("Starting calprobe Terminal");

        let mut rl = DefaultEditor::new()?;
        println!("Welcome to calprobe! Type 'help' for commands.");

        loop {
            match rl.readline(">> ") {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(line.as_str());
                    if let Err(err) = self.process_command(&line).await {
                        error!("Failed to process command: {:?}", err);
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("CTRL-D");
                    break;
                }
                Err(err) => {
                    println!("Error: {:?}", err);
                    break;
                }
            }
        }
        Ok(())
    }

    async fn process_command(&mut self, line: &str) -> Result<()> {
        let args = CommandArgs::parse(line)?;

        match args.command.as_str() {
            "perms" => self.handle_perms(),
            "calendars" => self.handle_calendars(),
            "add" => self.handle_add(args),
            "query" => self.handle_query(args),
            "sync" => self.handle_sync(args).await,
            "delegate" => self.handle_delegate(args),
            "resume" => self.handle_resume(),
            "help" => {
                print_help();
                Ok(())
            }
            "exit" | "quit" => {
                std::process::exit(0);
            }
            _ => {
                println!("Unknown command. Type 'help' for available commands.");
                Ok(())
            }
        }
    }

    fn handle_perms(&mut self) -> Result<()> {
        let grants =
            self.gate.request(&[Permission::ReadCalendar, Permission::WriteCalendar]);
        for grant in grants {
            println!(
                "  {} {}",
                grant.permission,
                if grant.granted { "granted" } else { "denied" }
            );
        }
        debug!(
            "Permission state: read={} write={}",
            self.permissions.is_granted(Permission::ReadCalendar),
            self.permissions.is_granted(Permission::WriteCalendar)
        );
        Ok(())
    }

    fn handle_calendars(&self) -> Result<()> {
        let account_type = self.config.account_type();
        let cursor = match calendar::list_calendars(self.store.as_ref(), account_type) {
            Ok(cursor) => cursor,
            Err(e) => {
                println!("Failed to list calendars: {}", e);
                return Ok(());
            }
        };

        let mut count = 0;
        println!("Calendars for account type '{}':", account_type);
        for record in cursor {
            count += 1;
            println!(
                "  - {} (account: {}, id: {})",
                record.display_name, record.account_name, record.id
            );
        }
        if count == 0 {
            println!("  No {} calendars found.", account_type);
        }
        Ok(())
    }

    fn handle_add(&self, args: CommandArgs) -> Result<()> {
        let account_type = self.config.account_type();

        let primary = match calendar::find_primary_calendar(self.store.as_ref(), account_type) {
            Ok(primary) => primary,
            Err(CalendarError::NoCalendarFound(_)) => {
                println!("Could not find the primary {} calendar!", account_type);
                return Ok(());
            }
            Err(e) => {
                println!("Failed to select a calendar: {}", e);
                return Ok(());
            }
        };

        let tz = match validation::parse_timezone(self.config.timezone()) {
            Ok(tz) => tz,
            Err(e) => {
                println!("{}", e);
                return Ok(());
            }
        };

        let (start, end) = match self.event_window(&args, &tz) {
            Ok(window) => window,
            Err(message) => {
                println!("{}", message);
                return Ok(());
            }
        };

        let title = args.args.first().map(String::as_str).unwrap_or(self.config.default_title());
        let mut config = EventConfig::new(primary.id, title, start, end);
        config.timezone = tz;
        config.description = args
            .flags
            .get("--description")
            .and_then(|v| v.clone())
            .unwrap_or_else(|| format!("Event inserted into calendar: {}", primary.display_name));

        if let Err(e) = validation::validate_event_config(&config) {
            println!("{}", e);
            return Ok(());
        }

        match calendar::create_event(self.store.as_ref(), &config) {
            Ok(id) => {
                println!("Event added to calendar: {} ({})", primary.display_name, id);
                self.spawn_sync(primary.account_name.clone());
            }
            Err(e) => {
                println!("Failed to add event: {}", e);
            }
        }
        Ok(())
    }

    fn handle_query(&self, args: CommandArgs) -> Result<()> {
        let title = args.args.first().map(String::as_str).unwrap_or(self.config.default_title());

        let from = match parse_flag_date(&args, "--from") {
            Ok(Some(date)) => date,
            Ok(None) => Utc::now(),
            Err(message) => {
                println!("{}", message);
                return Ok(());
            }
        };
        let to = match parse_flag_date(&args, "--to") {
            Ok(Some(date)) => date,
            Ok(None) => from + Duration::days(7),
            Err(message) => {
                println!("{}", message);
                return Ok(());
            }
        };

        let filter = EventFilter::window_with_title(from, to, title);
        let cursor = match calendar::query_events(self.store.as_ref(), &filter) {
            Ok(cursor) => cursor,
            Err(e) => {
                println!("Failed to query events: {}", e);
                return Ok(());
            }
        };

        let mut count = 0;
        for record in cursor {
            count += 1;
            println!(
                "  {} - {}  {} (id: {})",
                record.start.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
                record.end.with_timezone(&Local).format("%H:%M"),
                record.title,
                record.id
            );
        }
        if count == 0 {
            println!("No matching event found.");
        } else {
            println!("{} event(s) found.", count);
        }
        Ok(())
    }

    async fn handle_sync(&self, args: CommandArgs) -> Result<()> {
        let account_type = self.config.account_type();
        let account_name = match args.args.first() {
            Some(name) => name.clone(),
            None => match self.config.accounts().first() {
                Some(account) => account.name.clone(),
                None => {
                    println!("No accounts configured; add [[accounts]] to config.toml.");
                    return Ok(());
                }
            },
        };

        let outcome = trigger_sync(
            self.registry.as_ref(),
            self.scheduler.as_ref(),
            &account_name,
            account_type,
        )
        .await;

        match outcome {
            SyncOutcome::Requested => println!("Sync requested for account: {}", account_name),
            SyncOutcome::NoAccount => {
                println!("No matching {} account found; nothing to sync.", account_type)
            }
            SyncOutcome::Failed(reason) => println!("Sync request failed: {}", reason),
        }
        Ok(())
    }

    fn handle_delegate(&mut self, args: CommandArgs) -> Result<()> {
        let tz = match validation::parse_timezone(self.config.timezone()) {
            Ok(tz) => tz,
            Err(e) => {
                println!("{}", e);
                return Ok(());
            }
        };
        let (start, end) = match self.event_window(&args, &tz) {
            Ok(window) => window,
            Err(message) => {
                println!("{}", message);
                return Ok(());
            }
        };

        let draft = EventDraft {
            title: args
                .args
                .first()
                .map(String::as_str)
                .unwrap_or(self.config.default_title())
                .to_string(),
            description: args
                .flags
                .get("--description")
                .and_then(|v| v.clone())
                .unwrap_or_else(|| "Created via calprobe".to_string()),
            location: args.flags.get("--location").and_then(|v| v.clone()).unwrap_or_default(),
            start,
            end,
        };

        match delegate::delegate_event(self.composer.as_ref(), &mut self.handoff, &draft) {
            Ok(()) => {
                println!("Handed the event to the external editor. Type 'resume' when you're back.")
            }
            Err(DelegateError::NoHandlerAvailable) => {
                println!("There is no app that can perform this action!")
            }
        }
        Ok(())
    }

    fn handle_resume(&mut self) -> Result<()> {
        if self.handoff.resumed() {
            println!("Welcome back! The event editor has closed.");
        } else {
            println!("No event handoff is outstanding.");
        }
        Ok(())
    }

    /// Fire-and-forget: the write already succeeded, so the sync outcome is
    /// only logged, never surfaced.
    fn spawn_sync(&self, account_name: String) {
        let registry = Arc::clone(&self.registry);
        let scheduler = Arc::clone(&self.scheduler);
        let account_type = self.config.account_type().to_string();
        tokio::spawn(async move {
            let outcome =
                trigger_sync(registry.as_ref(), scheduler.as_ref(), &account_name, &account_type)
                    .await;
            debug!("Post-insert sync outcome: {:?}", outcome);
        });
    }

    /// Resolve the [start, end) times for `add`/`delegate` from `--date`,
    /// `--time` and `--duration`, defaulting to two days from now at 10:00
    /// in the configured timezone for one hour.
    fn event_window(
        &self,
        args: &CommandArgs,
        tz: &Tz,
    ) -> std::result::Result<(DateTime<Utc>, DateTime<Utc>), String> {
        let now_local = Utc::now().with_timezone(tz);

        let date = match args.flags.get("--date").and_then(|v| v.as_deref()) {
            Some(value) => {
                if !validation::validate_date_format(value) {
                    return Err(format!("Invalid date '{}'. Use YYYY-MM-DD.", value));
                }
                NaiveDate::parse_from_str(value, "%Y-%m-%d")
                    .map_err(|_| format!("Invalid date '{}'. Use YYYY-MM-DD.", value))?
            }
            None => (now_local + Duration::days(2)).date_naive(),
        };

        let time = match args.flags.get("--time").and_then(|v| v.as_deref()) {
            Some(value) => {
                if !validation::validate_time_format(value) {
                    return Err(format!("Invalid time '{}'. Use HH:MM.", value));
                }
                NaiveTime::parse_from_str(value, "%H:%M")
                    .map_err(|_| format!("Invalid time '{}'. Use HH:MM.", value))?
            }
            None => NaiveTime::from_hms_opt(10, 0, 0).expect("10:00 is a valid time"),
        };

        let start_local = tz
            .from_local_datetime(&date.and_time(time))
            .earliest()
            .ok_or_else(|| format!("{} {} does not exist in {}", date, time, tz))?;

        let duration_minutes = match args.flags.get("--duration").and_then(|v| v.as_deref()) {
            Some(value) => value
                .parse::<i64>()
                .ok()
                .filter(|m| *m > 0)
                .ok_or_else(|| format!("Invalid duration '{}'. Use whole minutes.", value))?,
            None => self.config.default_duration_minutes(),
        };

        let start = start_local.with_timezone(&Utc);
        Ok((start, start + Duration::minutes(duration_minutes)))
    }
}

fn print_help() {
    println!("Available commands:");
    println!("  perms - Request calendar read/write permissions");
    println!("  calendars - List calendars for the configured account type");
    println!("  add [\"<title>\"] [--date YYYY-MM-DD] [--time HH:MM] [--duration <minutes>] [--description \"<text>\"] - Insert an event into the primary calendar");
    println!("  query [\"<title>\"] [--from YYYY-MM-DD] [--to YYYY-MM-DD] - List inserted events in a time window");
    println!("  sync [<account>] - Request an expedited sync for the account");
    println!("  delegate [\"<title>\"] [--location \"<place>\"] [--description \"<text>\"] - Create the event via the external editor");
    println!("  resume - Tell calprobe you are back from the external editor");
    println!("  help - Show this help");
    println!("  exit - Exit the application");
}

/// Parse an optional `--from`/`--to` style date flag as start of day UTC.
fn parse_flag_date(
    args: &CommandArgs,
    flag: &str,
) -> std::result::Result<Option<DateTime<Utc>>, String> {
    match args.flags.get(flag).and_then(|v| v.as_deref()) {
        None => Ok(None),
        Some(value) => {
            if !validation::validate_date_format(value) {
                return Err(format!("Invalid date '{}'. Use YYYY-MM-DD.", value));
            }
            let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .map_err(|_| format!("Invalid date '{}'. Use YYYY-MM-DD.", value))?;
            let midnight = NaiveTime::from_hms_opt(0, 0, 0).expect("midnight is a valid time");
            Ok(Some(Utc.from_utc_datetime(&date.and_time(midnight))))
        }
    }
}
