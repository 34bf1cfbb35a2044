//! Boundaries between the sync engine and its collaborators.
//!
//! The engine is generic over these traits; `dekk-db` provides the Postgres
//! catalog, `dekk-scraper` the supplier feed, and `dekk-sync` an in-memory
//! catalog and a log-only notifier.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::catalog::{CatalogEntry, CatalogId, EntryUpdate, StoredEntry};
use crate::lease::{LeaseOutcome, LeaseState};
use crate::products::CanonicalProduct;
use crate::sync_run::{SyncProgress, SyncStats};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog entry {0} not found")]
    NotFound(CatalogId),

    #[error("catalog already has an entry for sku {0}")]
    DuplicateSku(String),

    #[error("catalog write rejected for {sku}: {reason}")]
    Rejected { sku: String, reason: String },

    #[error("catalog store unavailable: {0}")]
    Unavailable(String),
}

impl CatalogError {
    /// Whether the error means the store itself is gone, so continuing the
    /// batch loop would only produce more failures.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, CatalogError::Unavailable(_))
    }
}

#[derive(Debug, Error)]
#[error("notification to {recipient} failed: {reason}")]
pub struct NotificationError {
    pub recipient: String,
    pub reason: String,
}

/// Persistence boundary for catalog entries.
pub trait CatalogPort: Send + Sync {
    fn find_by_sku(
        &self,
        sku: &str,
    ) -> impl Future<Output = Result<Option<StoredEntry>, CatalogError>> + Send;

    fn create(
        &self,
        entry: &CatalogEntry,
    ) -> impl Future<Output = Result<CatalogId, CatalogError>> + Send;

    fn update(
        &self,
        id: CatalogId,
        update: &EntryUpdate,
    ) -> impl Future<Output = Result<(), CatalogError>> + Send;

    /// All entries carrying a supplier tag, i.e. every entry the sync owns.
    fn list_by_supplier_tag(
        &self,
    ) -> impl Future<Output = Result<Vec<StoredEntry>, CatalogError>> + Send;

    /// Sets stock to zero and status to out-of-stock, variants included.
    fn deactivate(&self, id: CatalogId) -> impl Future<Output = Result<(), CatalogError>> + Send;
}

/// Persists the report of a finished sync run.
pub trait RunRecorder: Send + Sync {
    fn record_run(&self, stats: &SyncStats)
        -> impl Future<Output = Result<(), CatalogError>> + Send;
}

/// Run exclusivity and progress shared across processes.
pub trait RunLease: Send + Sync {
    /// Takes the lease for `run_id` unless another run holds one younger
    /// than `stale_after`. An older lease is taken over.
    fn acquire_lease(
        &self,
        run_id: Uuid,
        stale_after: Duration,
    ) -> impl Future<Output = Result<LeaseOutcome, CatalogError>> + Send;

    /// Replaces the shared progress of the run holding the lease.
    fn publish_progress(
        &self,
        progress: &SyncProgress,
    ) -> impl Future<Output = Result<(), CatalogError>> + Send;

    /// Gives up the lease held by `run_id`. `final_progress` stays readable
    /// until `expires_at`; `None` clears it.
    fn release_lease(
        &self,
        run_id: Uuid,
        final_progress: Option<&SyncProgress>,
        expires_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), CatalogError>> + Send;

    fn read_lease(&self) -> impl Future<Output = Result<LeaseState, CatalogError>> + Send;
}

/// Delivery channel for run reports.
pub trait NotificationPort: Send + Sync {
    fn send_report(
        &self,
        recipient: &str,
        subject: &str,
        body_lines: &[String],
    ) -> impl Future<Output = Result<(), NotificationError>> + Send;
}

/// Source of canonical products for one sync run. Implementations are
/// fail-soft: upstream problems yield fewer products, never an error.
pub trait ProductFeed: Send + Sync {
    fn fetch_all(&self) -> impl Future<Output = Vec<CanonicalProduct>> + Send;
}
