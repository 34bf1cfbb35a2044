//! Database operations for the single-row `sync_lease` table.

use std::time::Duration;

use chrono::{DateTime, Utc};
use dekk_core::{LeaseHolder, LeaseOutcome, LeaseState, SyncProgress};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// The `sync_lease` row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SyncLeaseRow {
    pub run_id: Option<Uuid>,
    pub acquired_at: Option<DateTime<Utc>>,
    /// JSONB [`SyncProgress`].
    pub progress: Option<serde_json::Value>,
    pub progress_expires_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

const LEASE_COLUMNS: &str = "run_id, acquired_at, progress, progress_expires_at, updated_at";

impl SyncLeaseRow {
    fn holder(&self) -> Option<LeaseHolder> {
        Some(LeaseHolder {
            run_id: self.run_id?,
            acquired_at: self.acquired_at?,
        })
    }

    /// Decodes the row.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Json`] if the progress column is malformed.
    pub fn into_state(self) -> Result<LeaseState, DbError> {
        let holder = self.holder();
        let progress = self.progress.map(serde_json::from_value).transpose()?;
        Ok(LeaseState {
            holder,
            progress,
            progress_expires_at: self.progress_expires_at,
        })
    }
}

/// Takes the lease for `run_id` unless a lease younger than `stale_after`
/// is held at `now`.
///
/// The row is locked for the check, so concurrent callers in different
/// processes are serialized and at most one of them acquires.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a statement fails, including when the lease
/// row is missing because migrations have not run.
pub async fn acquire_sync_lease(
    pool: &PgPool,
    run_id: Uuid,
    stale_after: Duration,
    now: DateTime<Utc>,
) -> Result<LeaseOutcome, DbError> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query_as::<_, SyncLeaseRow>(&format!(
        "SELECT {LEASE_COLUMNS} FROM sync_lease WHERE id = 1 FOR UPDATE"
    ))
    .fetch_one(&mut *tx)
    .await?;

    if let Some(holder) = row.holder() {
        if holder.is_fresh_at(now, stale_after) {
            tx.rollback().await?;
            return Ok(LeaseOutcome::Held(holder));
        }
        tracing::warn!(
            stale_run_id = %holder.run_id,
            acquired_at = %holder.acquired_at,
            "taking over stale sync lease"
        );
    }

    sqlx::query(
        "UPDATE sync_lease \
         SET run_id = $1, acquired_at = $2, progress = NULL, progress_expires_at = NULL, \
             updated_at = NOW() \
         WHERE id = 1",
    )
    .bind(run_id)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(LeaseOutcome::Acquired)
}

/// Stores live progress if its run still holds the lease.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn publish_sync_progress(pool: &PgPool, progress: &SyncProgress) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE sync_lease \
         SET progress = $2, progress_expires_at = NULL, updated_at = NOW() \
         WHERE id = 1 AND run_id = $1",
    )
    .bind(progress.run_id)
    .bind(serde_json::to_value(progress)?)
    .execute(pool)
    .await?;
    Ok(())
}

/// Clears the lease held by `run_id` and leaves `final_progress` readable
/// until `expires_at`. A lease taken over by a newer run is left alone.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn release_sync_lease(
    pool: &PgPool,
    run_id: Uuid,
    final_progress: Option<&SyncProgress>,
    expires_at: DateTime<Utc>,
) -> Result<(), DbError> {
    let progress = final_progress.map(serde_json::to_value).transpose()?;
    sqlx::query(
        "UPDATE sync_lease \
         SET run_id = NULL, acquired_at = NULL, progress = $2, progress_expires_at = $3, \
             updated_at = NOW() \
         WHERE id = 1 AND run_id = $1",
    )
    .bind(run_id)
    .bind(progress)
    .bind(expires_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Reads the lease. A missing row reads as free.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails or [`DbError::Json`] for
/// malformed progress.
pub async fn read_sync_lease(pool: &PgPool) -> Result<LeaseState, DbError> {
    let row = sqlx::query_as::<_, SyncLeaseRow>(&format!(
        "SELECT {LEASE_COLUMNS} FROM sync_lease WHERE id = 1"
    ))
    .fetch_optional(pool)
    .await?;

    row.map_or_else(|| Ok(LeaseState::default()), SyncLeaseRow::into_state)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(run_id: Option<Uuid>, acquired_at: Option<DateTime<Utc>>) -> SyncLeaseRow {
        SyncLeaseRow {
            run_id,
            acquired_at,
            progress: None,
            progress_expires_at: None,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn half_set_holder_reads_as_free() {
        assert!(row(Some(Uuid::new_v4()), None).holder().is_none());
        assert!(row(None, Some(Utc::now())).holder().is_none());
    }

    #[test]
    fn malformed_progress_is_a_json_error() {
        let mut bad = row(None, None);
        bad.progress = Some(serde_json::json!({"run_id": 7}));
        assert!(matches!(bad.into_state(), Err(DbError::Json(_))));
    }

    #[test]
    fn held_row_decodes_its_holder() {
        let run_id = Uuid::new_v4();
        let acquired_at = Utc::now();
        let state = row(Some(run_id), Some(acquired_at)).into_state().unwrap();
        assert_eq!(
            state.holder,
            Some(LeaseHolder {
                run_id,
                acquired_at
            })
        );
        assert!(state.progress.is_none());
    }
}
