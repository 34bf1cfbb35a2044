use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a single sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Initializing,
    Fetching,
    Processing,
    ObsoleteHandling,
    Finalizing,
    Completed,
    Failed,
    Aborted,
    Cancelled,
}

impl SyncStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SyncStatus::Initializing => "initializing",
            SyncStatus::Fetching => "fetching",
            SyncStatus::Processing => "processing",
            SyncStatus::ObsoleteHandling => "obsolete_handling",
            SyncStatus::Finalizing => "finalizing",
            SyncStatus::Completed => "completed",
            SyncStatus::Failed => "failed",
            SyncStatus::Aborted => "aborted",
            SyncStatus::Cancelled => "cancelled",
        }
    }

    /// Whether the run has reached a final state.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SyncStatus::Completed | SyncStatus::Failed | SyncStatus::Aborted | SyncStatus::Cancelled
        )
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SyncStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initializing" => Ok(SyncStatus::Initializing),
            "fetching" => Ok(SyncStatus::Fetching),
            "processing" => Ok(SyncStatus::Processing),
            "obsolete_handling" => Ok(SyncStatus::ObsoleteHandling),
            "finalizing" => Ok(SyncStatus::Finalizing),
            "completed" => Ok(SyncStatus::Completed),
            "failed" => Ok(SyncStatus::Failed),
            "aborted" => Ok(SyncStatus::Aborted),
            "cancelled" => Ok(SyncStatus::Cancelled),
            other => Err(format!("unknown sync status '{other}'")),
        }
    }
}

/// One entry of a run's error log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemError {
    /// SKU the error belongs to, or `None` for run-level failures.
    pub sku: Option<String>,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// A catalog entry created during the run, listed in the run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedItem {
    pub sku: String,
    pub display_name: String,
}

/// Snapshot of a run for pollers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncProgress {
    pub run_id: Uuid,
    pub status: SyncStatus,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub total: usize,
    pub processed: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: usize,
    pub percentage: f64,
    pub eta_secs: Option<i64>,
}

/// Counters and outcome of one sync run.
///
/// Always returned to the caller, even for aborted or failed runs, so
/// "locked" and "crashed half way" stay distinguishable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    pub status: SyncStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub batch_size: usize,
    pub dry_run: bool,
    pub fetched: usize,
    pub processed: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: usize,
    pub obsolete_found: usize,
    pub obsolete_deactivated: usize,
    pub error_log: Vec<ItemError>,
    pub created_items: Vec<CreatedItem>,
}

impl SyncStats {
    #[must_use]
    pub fn new(started_at: DateTime<Utc>, batch_size: usize, dry_run: bool) -> Self {
        Self {
            status: SyncStatus::Initializing,
            started_at,
            finished_at: None,
            batch_size,
            dry_run,
            fetched: 0,
            processed: 0,
            created: 0,
            updated: 0,
            skipped: 0,
            errors: 0,
            obsolete_found: 0,
            obsolete_deactivated: 0,
            error_log: Vec::new(),
            created_items: Vec::new(),
        }
    }

    /// Records a per-item or run-level error and bumps the error counter.
    pub fn record_error(&mut self, sku: Option<&str>, message: impl Into<String>, at: DateTime<Utc>) {
        self.errors += 1;
        self.error_log.push(ItemError {
            sku: sku.map(str::to_string),
            message: message.into(),
            timestamp: at,
        });
    }

    /// Moves the run into a terminal state.
    pub fn finish(&mut self, status: SyncStatus, at: DateTime<Utc>) {
        self.status = status;
        self.finished_at = Some(at);
    }

    /// Share of fetched items processed so far, 0–100.
    #[must_use]
    pub fn percentage(&self) -> f64 {
        if self.fetched == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let pct = self.processed as f64 / self.fetched as f64 * 100.0;
        pct.min(100.0)
    }
}
