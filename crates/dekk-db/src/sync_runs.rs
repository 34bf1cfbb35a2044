//! Database operations for `sync_runs` and `sync_run_errors`.

use chrono::{DateTime, Utc};
use dekk_core::SyncStats;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{to_i32, DbError};

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `sync_runs` table.
#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct SyncRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub status: String,
    pub dry_run: bool,
    pub batch_size: i32,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub fetched: i32,
    pub processed: i32,
    pub created: i32,
    pub updated: i32,
    pub skipped: i32,
    pub errors: i32,
    pub obsolete_found: i32,
    pub obsolete_deactivated: i32,
    /// JSONB list of `{sku, display_name}` objects.
    pub created_items: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// A row from the `sync_run_errors` table.
#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct SyncRunErrorRow {
    pub id: i64,
    pub sync_run_id: i64,
    pub sku: Option<String>,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

const RUN_COLUMNS: &str = "id, public_id, status, dry_run, batch_size, started_at, finished_at, \
     fetched, processed, created, updated, skipped, errors, obsolete_found, \
     obsolete_deactivated, created_items, created_at";

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Persists a finished run and its error log in one transaction.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if an insert fails.
pub async fn insert_sync_run(pool: &PgPool, stats: &SyncStats) -> Result<SyncRunRow, DbError> {
    let created_items = serde_json::to_value(&stats.created_items)?;
    let mut tx = pool.begin().await?;

    let row = sqlx::query_as::<_, SyncRunRow>(&format!(
        "INSERT INTO sync_runs \
             (public_id, status, dry_run, batch_size, started_at, finished_at, fetched, \
              processed, created, updated, skipped, errors, obsolete_found, \
              obsolete_deactivated, created_items) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
         RETURNING {RUN_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(stats.status.as_str())
    .bind(stats.dry_run)
    .bind(to_i32(stats.batch_size))
    .bind(stats.started_at)
    .bind(stats.finished_at)
    .bind(to_i32(stats.fetched))
    .bind(to_i32(stats.processed))
    .bind(to_i32(stats.created))
    .bind(to_i32(stats.updated))
    .bind(to_i32(stats.skipped))
    .bind(to_i32(stats.errors))
    .bind(to_i32(stats.obsolete_found))
    .bind(to_i32(stats.obsolete_deactivated))
    .bind(created_items)
    .fetch_one(&mut *tx)
    .await?;

    for error in &stats.error_log {
        sqlx::query(
            "INSERT INTO sync_run_errors (sync_run_id, sku, message, occurred_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(row.id)
        .bind(error.sku.as_deref())
        .bind(&error.message)
        .bind(error.timestamp)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(row)
}

/// Most recent runs first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_sync_runs(pool: &PgPool, limit: i64) -> Result<Vec<SyncRunRow>, DbError> {
    let rows = sqlx::query_as::<_, SyncRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM sync_runs ORDER BY started_at DESC, id DESC LIMIT $1"
    ))
    .bind(limit.max(0))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Error log of one run, in the order the errors occurred.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_sync_run_errors(
    pool: &PgPool,
    sync_run_id: i64,
) -> Result<Vec<SyncRunErrorRow>, DbError> {
    let rows = sqlx::query_as::<_, SyncRunErrorRow>(
        "SELECT id, sync_run_id, sku, message, occurred_at \
         FROM sync_run_errors WHERE sync_run_id = $1 ORDER BY occurred_at, id",
    )
    .bind(sync_run_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
