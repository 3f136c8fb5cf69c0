//! Expedited sync trigger.
//!
//! After a direct insert, the owning account's sync adapter is asked for a
//! manual, expedited pass so the provider's own apps pick the event up. The
//! request is best-effort and fire-and-forget: whatever happens here, the
//! write has already succeeded, so nothing is propagated to the caller.

use async_trait::async_trait;
use log::{debug, error, info};
use serde::{Deserialize, Serialize};

/// Authority string naming the calendar data source a sync request targets.
pub const CALENDAR_AUTHORITY: &str = "com.android.calendar";

/// An account known to the external account subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub name: String,
    pub account_type: String,
}

/// A transient sync request for one (account, authority) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    pub account: Account,
    pub authority: String,
    pub manual: bool,
    pub expedited: bool,
}

impl SyncRequest {
    /// The flags a post-insert refresh uses: manual and expedited, against
    /// the calendar authority.
    pub fn expedited_manual(account: Account) -> Self {
        SyncRequest {
            account,
            authority: CALENDAR_AUTHORITY.to_string(),
            manual: true,
            expedited: true,
        }
    }
}

/// How a sync trigger ended. Never an error to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The request was handed to the sync subsystem.
    Requested,
    /// No account of the requested type and name exists; logged, non-fatal.
    NoAccount,
    /// The sync subsystem rejected the request; logged, non-fatal.
    Failed(String),
}

/// Lookup into the external account subsystem.
pub trait AccountRegistry: Send + Sync {
    fn accounts_by_type(&self, account_type: &str) -> Vec<Account>;
}

/// Submission seam to the external (asynchronous) sync subsystem.
#[async_trait]
pub trait SyncScheduler: Send + Sync {
    async fn request_sync(&self, request: SyncRequest) -> anyhow::Result<()>;
}

/// Ask for an expedited sync pass for `account_name`. Completes with an
/// outcome in every case; failures are logged and never raised.
pub async fn trigger_sync(
    registry: &dyn AccountRegistry,
    scheduler: &dyn SyncScheduler,
    account_name: &str,
    account_type: &str,
) -> SyncOutcome {
    let accounts = registry.accounts_by_type(account_type);
    let account = match accounts.into_iter().find(|a| a.name == account_name) {
        Some(account) => account,
        None => {
            debug!(
                "No matching {} account found for calendar owner: {}",
                account_type, account_name
            );
            return SyncOutcome::NoAccount;
        }
    };

    let request = SyncRequest::expedited_manual(account);
    match scheduler.request_sync(request).await {
        Ok(()) => {
            info!("Requested expedited sync for account: {}", account_name);
            SyncOutcome::Requested
        }
        Err(e) => {
            error!("Failed to trigger sync: {}", e);
            SyncOutcome::Failed(e.to_string())
        }
    }
}

/// Scheduler for environments without a real sync adapter: logs the request
/// and reports success.
#[derive(Debug, Default)]
pub struct LoggingScheduler;

#[async_trait]
impl SyncScheduler for LoggingScheduler {
    async fn request_sync(&self, request: SyncRequest) -> anyhow::Result<()> {
        info!(
            "Sync requested: account={} authority={} manual={} expedited={}",
            request.account.name, request.authority, request.manual, request.expedited
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    struct FixedRegistry(Vec<Account>);

    impl AccountRegistry for FixedRegistry {
        fn accounts_by_type(&self, account_type: &str) -> Vec<Account> {
            self.0.iter().filter(|a| a.account_type == account_type).cloned().collect()
        }
    }

    struct FailingScheduler;

    #[async_trait]
    impl SyncScheduler for FailingScheduler {
        async fn request_sync(&self, _request: SyncRequest) -> anyhow::Result<()> {
            Err(anyhow!("sync subsystem unavailable"))
        }
    }

    fn account(name: &str) -> Account {
        Account { name: name.to_string(), account_type: "com.google".to_string() }
    }

    #[tokio::test]
    async fn matching_account_gets_a_manual_expedited_request() {
        let registry = FixedRegistry(vec![account("alice@example.com")]);
        let outcome = trigger_sync(
            &registry,
            &LoggingScheduler,
            "alice@example.com",
            "com.google",
        )
        .await;
        assert_eq!(outcome, SyncOutcome::Requested);
    }

    #[tokio::test]
    async fn missing_account_is_a_logged_no_op() {
        let registry = FixedRegistry(vec![account("alice@example.com")]);
        let outcome =
            trigger_sync(&registry, &LoggingScheduler, "bob@example.com", "com.google").await;
        assert_eq!(outcome, SyncOutcome::NoAccount);
    }

    #[tokio::test]
    async fn account_type_mismatch_is_a_logged_no_op() {
        let registry = FixedRegistry(vec![account("alice@example.com")]);
        let outcome =
            trigger_sync(&registry, &LoggingScheduler, "alice@example.com", "com.exchange").await;
        assert_eq!(outcome, SyncOutcome::NoAccount);
    }

    #[tokio::test]
    async fn scheduler_failure_is_captured_not_raised() {
        let registry = FixedRegistry(vec![account("alice@example.com")]);
        let outcome =
            trigger_sync(&registry, &FailingScheduler, "alice@example.com", "com.google").await;
        assert!(matches!(outcome, SyncOutcome::Failed(reason) if reason.contains("unavailable")));
    }

    #[test]
    fn request_flags_match_the_expedited_manual_bundle() {
        let request = SyncRequest::expedited_manual(account("alice@example.com"));
        assert!(request.manual);
        assert!(request.expedited);
        assert_eq!(request.authority, CALENDAR_AUTHORITY);
    }
}
