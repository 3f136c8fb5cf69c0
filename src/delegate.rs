//! Delegated event creation.
//!
//! Instead of writing to the store directly, an event draft can be handed
//! to an external, user-facing editor (here: the provider's web composer in
//! the default browser). Whether the user actually saves is never known;
//! the only signal is the host resuming, tracked by the [`Handoff`]
//! automaton.

use chrono::{DateTime, Utc};
use log::{debug, info};
use thiserror::Error;
use url::Url;

const COMPOSE_BASE: &str = "https://calendar.google.com/calendar/render";

/// The fields handed to the external editor. Everything is a suggestion;
/// the user can change or discard any of it.
#[derive(Debug, Clone)]
pub struct EventDraft {
    pub title: String,
    pub description: String,
    pub location: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum DelegateError {
    #[error("No external event editor is available to handle the request")]
    NoHandlerAvailable,
}

/// Seam to whatever can present an event-creation UI.
pub trait EventComposer: Send + Sync {
    fn open(&self, draft: &EventDraft) -> Result<(), DelegateError>;
}

/// Opens the event template in the default browser.
#[derive(Debug, Default)]
pub struct BrowserComposer;

impl BrowserComposer {
    /// Build the composer URL carrying the draft fields.
    pub fn compose_url(draft: &EventDraft) -> Url {
        let dates = format!(
            "{}/{}",
            draft.start.format("%Y%m%dT%H%M%SZ"),
            draft.end.format("%Y%m%dT%H%M%SZ")
        );

        let mut url = Url::parse(COMPOSE_BASE).expect("compose base URL is valid");
        url.query_pairs_mut()
            .append_pair("action", "TEMPLATE")
            .append_pair("text", &draft.title)
            .append_pair("details", &draft.description)
            .append_pair("location", &draft.location)
            .append_pair("dates", &dates);
        url
    }
}

impl EventComposer for BrowserComposer {
    fn open(&self, draft: &EventDraft) -> Result<(), DelegateError> {
        let url = Self::compose_url(draft);
        debug!("Opening external editor: {}", url);
        webbrowser::open(url.as_str()).map_err(|e| {
            debug!("Browser launch failed: {}", e);
            DelegateError::NoHandlerAvailable
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandoffState {
    #[default]
    Idle,
    AwaitingReturn,
}

/// Two-state automaton tracking an outstanding handoff to the external
/// editor, driven by explicit `delegated` / `resumed` events.
#[derive(Debug, Default)]
pub struct Handoff {
    state: HandoffState,
}

impl Handoff {
    pub fn new() -> Self {
        Handoff { state: HandoffState::Idle }
    }

    pub fn state(&self) -> HandoffState {
        self.state
    }

    /// The draft was handed off; the next resume belongs to it.
    pub fn delegated(&mut self) {
        self.state = HandoffState::AwaitingReturn;
    }

    /// The host resumed. Returns true when a handoff was outstanding (i.e.
    /// a "welcome back" notice is due) and resets to idle.
    pub fn resumed(&mut self) -> bool {
        match self.state {
            HandoffState::AwaitingReturn => {
                self.state = HandoffState::Idle;
                true
            }
            HandoffState::Idle => false,
        }
    }
}

/// Hand `draft` to the external editor and mark the handoff outstanding.
/// Returns immediately after delegation; completion is only ever observed
/// through [`Handoff::resumed`].
pub fn delegate_event(
    composer: &dyn EventComposer,
    handoff: &mut Handoff,
    draft: &EventDraft,
) -> Result<(), DelegateError> {
    composer.open(draft)?;
    handoff.delegated();
    info!("Delegated event '{}' to the external editor", draft.title);
    Ok(())
}
