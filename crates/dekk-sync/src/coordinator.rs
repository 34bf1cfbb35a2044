//! Run exclusivity, live progress and cancellation for sync runs.
//!
//! One [`SyncCoordinator`] is shared (via `Arc`) by everything that starts,
//! observes or cancels a run: the engine, the HTTP surface and the scheduler.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dekk_core::{SyncProgress, SyncStats};
use tokio::sync::broadcast;
use uuid::Uuid;

/// A lock older than this is considered abandoned.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// How long the final progress snapshot of a run stays readable.
pub const DEFAULT_PROGRESS_TTL: Duration = Duration::from_secs(5 * 60);

const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Notifications for collaborators that chain work after a sync.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    Started { run_id: Uuid, started_at: DateTime<Utc> },
    Completed(Arc<SyncStats>),
    Cancelled(Arc<SyncStats>),
    Failed(Arc<SyncStats>),
}

/// Returned when another run holds a fresh lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockHeld {
    pub run_id: Uuid,
    pub acquired_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
struct LockState {
    run_id: Uuid,
    acquired_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct CoordinatorState {
    lock: Option<LockState>,
    progress: Option<SyncProgress>,
    progress_expires_at: Option<DateTime<Utc>>,
}

pub struct SyncCoordinator {
    state: Mutex<CoordinatorState>,
    cancel_requested: AtomicBool,
    lock_timeout: chrono::Duration,
    progress_ttl: chrono::Duration,
    events: broadcast::Sender<SyncEvent>,
}

impl Default for SyncCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_TIMEOUT, DEFAULT_PROGRESS_TTL)
    }
}

impl SyncCoordinator {
    #[must_use]
    pub fn new(lock_timeout: Duration, progress_ttl: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: Mutex::new(CoordinatorState::default()),
            cancel_requested: AtomicBool::new(false),
            lock_timeout: chrono::Duration::from_std(lock_timeout)
                .unwrap_or(chrono::Duration::MAX),
            progress_ttl: chrono::Duration::from_std(progress_ttl)
                .unwrap_or(chrono::Duration::MAX),
            events,
        }
    }

    /// Age at which a held lock counts as abandoned.
    #[must_use]
    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout.to_std().unwrap_or(Duration::MAX)
    }

    /// How long a finished run's final progress stays readable.
    #[must_use]
    pub fn progress_ttl(&self) -> chrono::Duration {
        self.progress_ttl
    }

    fn state(&self) -> MutexGuard<'_, CoordinatorState> {
        // The state is plain data; a panic while holding the lock cannot leave
        // it half-updated in a way later readers would trip over.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Acquires the run lock.
    ///
    /// # Errors
    ///
    /// Returns [`LockHeld`] when another run holds a lock younger than the
    /// lock timeout.
    pub fn try_acquire(self: &Arc<Self>) -> Result<SyncLockGuard, LockHeld> {
        self.try_acquire_at(Utc::now())
    }

    /// [`Self::try_acquire`] with an explicit clock reading.
    ///
    /// # Errors
    ///
    /// Returns [`LockHeld`] when another run holds a fresh lock at `now`.
    pub fn try_acquire_at(self: &Arc<Self>, now: DateTime<Utc>) -> Result<SyncLockGuard, LockHeld> {
        let mut state = self.state();

        if let Some(existing) = state.lock {
            let age = now - existing.acquired_at;
            if age < self.lock_timeout {
                return Err(LockHeld {
                    run_id: existing.run_id,
                    acquired_at: existing.acquired_at,
                });
            }
            tracing::warn!(
                stale_run_id = %existing.run_id,
                acquired_at = %existing.acquired_at,
                "replacing stale sync lock"
            );
        }

        let run_id = Uuid::new_v4();
        state.lock = Some(LockState {
            run_id,
            acquired_at: now,
        });
        state.progress = None;
        state.progress_expires_at = None;
        drop(state);

        self.cancel_requested.store(false, Ordering::SeqCst);

        Ok(SyncLockGuard {
            coordinator: Arc::clone(self),
            run_id,
            acquired_at: now,
        })
    }

    fn release(&self, run_id: Uuid) {
        let mut state = self.state();
        // A stale guard must not release the lock a newer run took over.
        if state.lock.is_some_and(|l| l.run_id == run_id) {
            state.lock = None;
            drop(state);
            self.cancel_requested.store(false, Ordering::SeqCst);
        }
    }

    /// Whether a run currently holds a fresh lock.
    #[must_use]
    pub fn is_running(&self) -> bool {
        let now = Utc::now();
        self.state()
            .lock
            .is_some_and(|l| now - l.acquired_at < self.lock_timeout)
    }

    /// Asks the active run to stop at its next item boundary.
    ///
    /// Returns `false` when no run is active; the request is then dropped
    /// rather than left to cancel the next run.
    pub fn request_cancel(&self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.cancel_requested.store(true, Ordering::SeqCst);
        true
    }

    /// Consumes a pending cancellation request.
    pub fn take_cancel_request(&self) -> bool {
        self.cancel_requested.swap(false, Ordering::SeqCst)
    }

    /// Publishes live progress for `run_id` and returns the snapshot.
    pub fn publish_progress(&self, run_id: Uuid, stats: &SyncStats) -> SyncProgress {
        let now = Utc::now();
        let progress = progress_snapshot(run_id, stats, now);
        let mut state = self.state();
        state.progress = Some(progress.clone());
        state.progress_expires_at = None;
        progress
    }

    /// Publishes the final snapshot of a run, readable until the TTL runs
    /// out. Returns the snapshot and its expiry.
    pub fn finish_progress(&self, run_id: Uuid, stats: &SyncStats) -> (SyncProgress, DateTime<Utc>) {
        let now = Utc::now();
        let progress = progress_snapshot(run_id, stats, now);
        let expires_at = now + self.progress_ttl;
        let mut state = self.state();
        state.progress = Some(progress.clone());
        state.progress_expires_at = Some(expires_at);
        (progress, expires_at)
    }

    pub fn clear_progress(&self) {
        let mut state = self.state();
        state.progress = None;
        state.progress_expires_at = None;
    }

    /// Current progress, or `None` if nothing ran recently.
    #[must_use]
    pub fn progress(&self) -> Option<SyncProgress> {
        self.progress_at(Utc::now())
    }

    #[must_use]
    pub fn progress_at(&self, now: DateTime<Utc>) -> Option<SyncProgress> {
        let mut state = self.state();
        if state.progress_expires_at.is_some_and(|expires| now >= expires) {
            state.progress = None;
            state.progress_expires_at = None;
        }
        state.progress.clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    pub fn emit(&self, event: SyncEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

fn progress_snapshot(run_id: Uuid, stats: &SyncStats, now: DateTime<Utc>) -> SyncProgress {
    SyncProgress {
        run_id,
        status: stats.status,
        dry_run: stats.dry_run,
        started_at: stats.started_at,
        updated_at: now,
        total: stats.fetched,
        processed: stats.processed,
        created: stats.created,
        updated: stats.updated,
        skipped: stats.skipped,
        errors: stats.errors,
        percentage: stats.percentage(),
        eta_secs: estimate_remaining_secs(stats, now),
    }
}

/// Remaining time at the average per-item rate so far.
fn estimate_remaining_secs(stats: &SyncStats, now: DateTime<Utc>) -> Option<i64> {
    if stats.processed == 0 || stats.status.is_terminal() {
        return None;
    }
    let elapsed_ms = (now - stats.started_at).num_milliseconds().max(0);
    let processed = i64::try_from(stats.processed).ok()?;
    let remaining = i64::try_from(stats.fetched.saturating_sub(stats.processed)).ok()?;
    Some(elapsed_ms * remaining / processed / 1000)
}

/// Holds the run lock; dropping it releases the lock on every exit path.
pub struct SyncLockGuard {
    coordinator: Arc<SyncCoordinator>,
    run_id: Uuid,
    acquired_at: DateTime<Utc>,
}

impl std::fmt::Debug for SyncLockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncLockGuard")
            .field("run_id", &self.run_id)
            .field("acquired_at", &self.acquired_at)
            .finish_non_exhaustive()
    }
}

impl SyncLockGuard {
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    #[must_use]
    pub fn acquired_at(&self) -> DateTime<Utc> {
        self.acquired_at
    }
}

impl Drop for SyncLockGuard {
    fn drop(&mut self) {
        self.coordinator.release(self.run_id);
    }
}

#[cfg(test)]
#[path = "coordinator_test.rs"]
mod tests;
