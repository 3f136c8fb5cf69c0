//! Calendar permission gate.
//!
//! The content store requires a read grant for queries and a write grant for
//! inserts. Grants are recorded in a shared [`PermissionSet`] that store
//! backends consult at the call boundary; nothing in the workflow pre-checks
//! permissions, so an operation attempted without a grant fails at the store.

use log::info;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// The two calendar capabilities a caller can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    ReadCalendar,
    WriteCalendar,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::ReadCalendar => write!(f, "read-calendar"),
            Permission::WriteCalendar => write!(f, "write-calendar"),
        }
    }
}

/// Outcome of a single permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionGrant {
    pub permission: Permission,
    pub granted: bool,
}

/// Shared record of granted permissions, cloned into store backends.
#[derive(Debug, Clone, Default)]
pub struct PermissionSet {
    granted: Arc<Mutex<HashSet<Permission>>>,
}

impl PermissionSet {
    /// Starts with nothing granted; the gate must be asked first.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything granted up front. Used by tests and embedded callers that
    /// have no permission dialog to drive.
    pub fn all_granted() -> Self {
        let set = Self::new();
        set.grant(Permission::ReadCalendar);
        set.grant(Permission::WriteCalendar);
        set
    }

    pub fn grant(&self, permission: Permission) {
        self.lock().insert(permission);
    }

    pub fn is_granted(&self, permission: Permission) -> bool {
        self.lock().contains(&permission)
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<Permission>> {
        // A poisoned lock only means another thread panicked mid-grant;
        // the set itself is still usable.
        self.granted.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Request/response capability check, the stand-in for the OS permission
/// dialog. One call may cover several permissions and reports each grant
/// individually.
pub trait PermissionGate: Send + Sync {
    fn request(&self, permissions: &[Permission]) -> Vec<PermissionGrant>;
}

/// Gate that grants whatever is asked of it and records the grants in the
/// shared set. This mirrors the user tapping "Allow" on the dialog.
pub struct AutoGrantGate {
    set: PermissionSet,
}

impl AutoGrantGate {
    pub fn new(set: PermissionSet) -> Self {
        Self { set }
    }
}

impl PermissionGate for AutoGrantGate {
    fn request(&self, permissions: &[Permission]) -> Vec<PermissionGrant> {
        permissions
            .iter()
            .map(|&permission| {
                self.set.grant(permission);
                info!("Granted {} permission", permission);
                PermissionGrant { permission, granted: true }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_granted_until_requested() {
        let set = PermissionSet::new();
        assert!(!set.is_granted(Permission::ReadCalendar));
        assert!(!set.is_granted(Permission::WriteCalendar));
    }

    #[test]
    fn auto_grant_gate_records_grants_in_shared_set() {
        let set = PermissionSet::new();
        let gate = AutoGrantGate::new(set.clone());

        let grants = gate.request(&[Permission::ReadCalendar, Permission::WriteCalendar]);

        assert_eq!(grants.len(), 2);
        assert!(grants.iter().all(|g| g.granted));
        assert!(set.is_granted(Permission::ReadCalendar));
        assert!(set.is_granted(Permission::WriteCalendar));
    }

    #[test]
    fn all_granted_covers_both_permissions() {
        let set = PermissionSet::all_granted();
        assert!(set.is_granted(Permission::ReadCalendar));
        assert!(set.is_granted(Permission::WriteCalendar));
    }
}
