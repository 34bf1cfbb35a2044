//! The run lease shared by every process that syncs the same catalog.
//!
//! The in-process coordinator only sees runs started in its own process; the
//! lease lives in the catalog store so a CLI run and a scheduled server run
//! cannot overlap, and so either process can read the other's progress.

use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::sync_run::SyncProgress;

/// The run currently holding the lease.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaseHolder {
    pub run_id: Uuid,
    pub acquired_at: DateTime<Utc>,
}

impl LeaseHolder {
    /// Whether the lease is younger than `stale_after` at `now`.
    #[must_use]
    pub fn is_fresh_at(&self, now: DateTime<Utc>, stale_after: Duration) -> bool {
        let stale_after = chrono::Duration::from_std(stale_after).unwrap_or(chrono::Duration::MAX);
        now - self.acquired_at < stale_after
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaseOutcome {
    Acquired,
    /// Another run holds a fresh lease.
    Held(LeaseHolder),
}

/// The lease row as stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeaseState {
    pub holder: Option<LeaseHolder>,
    pub progress: Option<SyncProgress>,
    /// Set once the run released the lease; `None` while it is live.
    pub progress_expires_at: Option<DateTime<Utc>>,
}

impl LeaseState {
    /// Whether a run holds a lease younger than `stale_after` at `now`.
    #[must_use]
    pub fn is_held_at(&self, now: DateTime<Utc>, stale_after: Duration) -> bool {
        self.holder
            .is_some_and(|holder| holder.is_fresh_at(now, stale_after))
    }

    /// Progress still readable at `now`.
    #[must_use]
    pub fn progress_at(&self, now: DateTime<Utc>) -> Option<&SyncProgress> {
        match self.progress_expires_at {
            Some(expires) if now >= expires => None,
            _ => self.progress.as_ref(),
        }
    }
}
