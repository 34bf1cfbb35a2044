//! Database operations for `catalog_entries` and `catalog_variants`, plus the
//! [`PgCatalog`] adapter the sync engine writes through.

use std::time::Duration;

use chrono::{DateTime, Utc};
use dekk_core::{
    AttributeSet, CatalogEntry, CatalogError, CatalogId, CatalogPort, CatalogVariant,
    EntryUpdate, LeaseOutcome, LeaseState, RunLease, RunRecorder, StockStatus, StoredEntry,
    SyncProgress, SyncStats,
};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::sync_lease::{
    acquire_sync_lease, publish_sync_progress, read_sync_lease, release_sync_lease,
};
use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `catalog_entries` table.
///
/// `attributes` and `categories` are JSONB: an [`AttributeSet`] list and a
/// list of category slugs.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CatalogEntryRow {
    pub id: i64,
    pub sku: String,
    pub external_id: String,
    pub supplier_code: String,
    pub display_name: String,
    pub description: String,
    pub price: Decimal,
    pub stock_quantity: i64,
    pub stock_status: String,
    pub attributes: serde_json::Value,
    pub categories: serde_json::Value,
    pub image_ref: Option<String>,
    pub gallery_image_ref: Option<String>,
    pub energy_label_ref: Option<String>,
    pub is_variable: bool,
    pub last_synced_at: DateTime<Utc>,
    pub sync_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A row from the `catalog_variants` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CatalogVariantRow {
    pub id: i64,
    pub entry_id: i64,
    pub position: i32,
    pub sku: String,
    pub price: Decimal,
    pub stock_quantity: i64,
    pub attribute_key: String,
    pub attribute_value: String,
}

const ENTRY_COLUMNS: &str = "id, sku, external_id, supplier_code, display_name, description, \
     price, stock_quantity, stock_status, attributes, categories, image_ref, \
     gallery_image_ref, energy_label_ref, is_variable, last_synced_at, sync_count, \
     created_at, updated_at";

const VARIANT_COLUMNS: &str =
    "id, entry_id, position, sku, price, stock_quantity, attribute_key, attribute_value";

impl CatalogVariantRow {
    /// Converts the row into the engine's variant type.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidColumn`] for an unknown attribute key.
    pub fn into_variant(self) -> Result<CatalogVariant, DbError> {
        let attribute_key = self
            .attribute_key
            .parse()
            .map_err(|_| DbError::InvalidColumn {
                column: "catalog_variants.attribute_key",
                value: self.attribute_key.clone(),
            })?;
        Ok(CatalogVariant {
            sku: self.sku,
            price: self.price,
            stock_quantity: self.stock_quantity,
            attribute_key,
            attribute_value: self.attribute_value,
        })
    }
}

impl CatalogEntryRow {
    /// Converts the row and its variants (in position order) into a
    /// [`StoredEntry`].
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidColumn`] for unknown enum values or
    /// [`DbError::Json`] for malformed JSONB columns.
    pub fn into_stored(self, variants: Vec<CatalogVariantRow>) -> Result<StoredEntry, DbError> {
        let supplier_code = self
            .supplier_code
            .parse()
            .map_err(|_| DbError::InvalidColumn {
                column: "catalog_entries.supplier_code",
                value: self.supplier_code.clone(),
            })?;
        let stock_status = self
            .stock_status
            .parse()
            .map_err(|_| DbError::InvalidColumn {
                column: "catalog_entries.stock_status",
                value: self.stock_status.clone(),
            })?;
        let attributes: AttributeSet = serde_json::from_value(self.attributes)?;
        let categories: Vec<String> = serde_json::from_value(self.categories)?;
        let variants = variants
            .into_iter()
            .map(CatalogVariantRow::into_variant)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(StoredEntry {
            id: self.id,
            entry: CatalogEntry {
                sku: self.sku,
                external_id: self.external_id,
                display_name: self.display_name,
                description: self.description,
                price: self.price,
                stock_quantity: self.stock_quantity,
                stock_status,
                attributes,
                categories,
                image_ref: self.image_ref,
                gallery_image_ref: self.gallery_image_ref,
                energy_label_ref: self.energy_label_ref,
                last_synced_at: self.last_synced_at,
                sync_count: self.sync_count,
                supplier_code,
                is_variable: self.is_variable,
                variants,
            },
        })
    }
}

// ---------------------------------------------------------------------------
// catalog_entries operations
// ---------------------------------------------------------------------------

/// Looks up an entry and its variants by SKU.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails, or a decode error for
/// malformed rows.
pub async fn find_entry_by_sku(pool: &PgPool, sku: &str) -> Result<Option<StoredEntry>, DbError> {
    let row = sqlx::query_as::<_, CatalogEntryRow>(&format!(
        "SELECT {ENTRY_COLUMNS} FROM catalog_entries WHERE sku = $1"
    ))
    .bind(sku)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let variants = sqlx::query_as::<_, CatalogVariantRow>(&format!(
        "SELECT {VARIANT_COLUMNS} FROM catalog_variants WHERE entry_id = $1 ORDER BY position"
    ))
    .bind(row.id)
    .fetch_all(pool)
    .await?;

    row.into_stored(variants).map(Some)
}

/// Inserts an entry and its variants in one transaction. Returns the new id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on failure, including a unique violation when
/// the SKU already exists.
pub async fn insert_entry(pool: &PgPool, entry: &CatalogEntry) -> Result<i64, DbError> {
    let mut tx = pool.begin().await?;

    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO catalog_entries \
             (sku, external_id, supplier_code, display_name, description, price, \
              stock_quantity, stock_status, attributes, categories, image_ref, \
              gallery_image_ref, energy_label_ref, is_variable, last_synced_at, sync_count) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
         RETURNING id",
    )
    .bind(&entry.sku)
    .bind(&entry.external_id)
    .bind(entry.supplier_code.as_str())
    .bind(&entry.display_name)
    .bind(&entry.description)
    .bind(entry.price)
    .bind(entry.stock_quantity)
    .bind(entry.stock_status.as_str())
    .bind(serde_json::to_value(&entry.attributes)?)
    .bind(serde_json::to_value(&entry.categories)?)
    .bind(entry.image_ref.as_deref())
    .bind(entry.gallery_image_ref.as_deref())
    .bind(entry.energy_label_ref.as_deref())
    .bind(entry.is_variable)
    .bind(entry.last_synced_at)
    .bind(entry.sync_count)
    .fetch_one(&mut *tx)
    .await?;

    insert_variants(&mut tx, id, &entry.variants).await?;
    tx.commit().await?;
    Ok(id)
}

async fn insert_variants(
    tx: &mut Transaction<'_, Postgres>,
    entry_id: i64,
    variants: &[CatalogVariant],
) -> Result<(), DbError> {
    for (position, variant) in variants.iter().enumerate() {
        sqlx::query(
            "INSERT INTO catalog_variants \
                 (entry_id, position, sku, price, stock_quantity, attribute_key, attribute_value) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(entry_id)
        .bind(crate::to_i32(position))
        .bind(&variant.sku)
        .bind(variant.price)
        .bind(variant.stock_quantity)
        .bind(variant.attribute_key.as_str())
        .bind(&variant.attribute_value)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Writes the `Some` fields of `update`. A variant list replaces the stored
/// variants wholesale.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no entry has `id`, or [`DbError::Sqlx`]
/// if a statement fails.
pub async fn update_entry(pool: &PgPool, id: i64, update: &EntryUpdate) -> Result<(), DbError> {
    let attributes = update
        .attributes
        .as_ref()
        .map(serde_json::to_value)
        .transpose()?;
    let categories = update
        .categories
        .as_ref()
        .map(serde_json::to_value)
        .transpose()?;

    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "UPDATE catalog_entries SET \
             display_name      = COALESCE($2, display_name), \
             description       = COALESCE($3, description), \
             price             = COALESCE($4, price), \
             stock_quantity    = COALESCE($5, stock_quantity), \
             stock_status      = COALESCE($6, stock_status), \
             attributes        = COALESCE($7, attributes), \
             categories        = COALESCE($8, categories), \
             image_ref         = COALESCE($9, image_ref), \
             gallery_image_ref = COALESCE($10, gallery_image_ref), \
             energy_label_ref  = COALESCE($11, energy_label_ref), \
             is_variable       = COALESCE($12, is_variable), \
             last_synced_at    = COALESCE($13, last_synced_at), \
             sync_count        = COALESCE($14, sync_count), \
             updated_at        = NOW() \
         WHERE id = $1",
    )
    .bind(id)
    .bind(update.display_name.as_deref())
    .bind(update.description.as_deref())
    .bind(update.price)
    .bind(update.stock_quantity)
    .bind(update.stock_status.map(StockStatus::as_str))
    .bind(attributes)
    .bind(categories)
    .bind(update.image_ref.as_deref())
    .bind(update.gallery_image_ref.as_deref())
    .bind(update.energy_label_ref.as_deref())
    .bind(update.is_variable)
    .bind(update.last_synced_at)
    .bind(update.sync_count)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    if let Some(variants) = &update.variants {
        sqlx::query("DELETE FROM catalog_variants WHERE entry_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_variants(&mut tx, id, variants).await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Every entry the sync owns, with variants, ordered by id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails, or a decode error for
/// malformed rows.
pub async fn list_supplier_entries(pool: &PgPool) -> Result<Vec<StoredEntry>, DbError> {
    let rows = sqlx::query_as::<_, CatalogEntryRow>(&format!(
        "SELECT {ENTRY_COLUMNS} FROM catalog_entries ORDER BY id"
    ))
    .fetch_all(pool)
    .await?;

    let variants = sqlx::query_as::<_, CatalogVariantRow>(&format!(
        "SELECT {VARIANT_COLUMNS} FROM catalog_variants ORDER BY entry_id, position"
    ))
    .fetch_all(pool)
    .await?;

    Ok(assemble_entries(rows, variants))
}

/// Pairs entry rows with their variants and decodes them.
///
/// Both inputs must be ordered by entry id. An entry that fails to decode is
/// logged and left out so one bad row cannot hide the rest of the catalog.
#[must_use]
pub fn assemble_entries(
    rows: Vec<CatalogEntryRow>,
    variants: Vec<CatalogVariantRow>,
) -> Vec<StoredEntry> {
    let mut variants = variants.into_iter().peekable();
    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
        let mut own = Vec::new();
        // Orphaned variants (entry_id below the current row) are skipped.
        while let Some(v) = variants.next_if(|v| v.entry_id <= row.id) {
            if v.entry_id == row.id {
                own.push(v);
            }
        }
        let (entry_id, sku) = (row.id, row.sku.clone());
        match row.into_stored(own) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                tracing::warn!(
                    entry_id,
                    sku = %sku,
                    error = %e,
                    "skipping undecodable catalog entry"
                );
            }
        }
    }
    entries
}

/// Zeroes stock on an entry and its variants and marks it out of stock.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no entry has `id`, or [`DbError::Sqlx`]
/// if a statement fails.
pub async fn deactivate_entry(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "UPDATE catalog_entries \
         SET stock_quantity = 0, stock_status = 'out_of_stock', updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(id)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    sqlx::query("UPDATE catalog_variants SET stock_quantity = 0 WHERE entry_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Port adapter
// ---------------------------------------------------------------------------

/// Postgres-backed [`CatalogPort`] and [`RunRecorder`].
#[derive(Debug, Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Maps a database failure to the engine's error vocabulary. Connection-level
/// failures become [`CatalogError::Unavailable`], which stops the run.
pub(crate) fn to_catalog_error(err: DbError, sku: &str, id: Option<CatalogId>) -> CatalogError {
    match err {
        DbError::NotFound => CatalogError::NotFound(id.unwrap_or_default()),
        DbError::Sqlx(sqlx::Error::Database(db)) if db.is_unique_violation() => {
            CatalogError::DuplicateSku(sku.to_string())
        }
        DbError::Sqlx(
            e @ (sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::WorkerCrashed),
        ) => CatalogError::Unavailable(e.to_string()),
        DbError::MissingDatabaseUrl => {
            CatalogError::Unavailable("DATABASE_URL is not set".to_string())
        }
        other => CatalogError::Rejected {
            sku: sku.to_string(),
            reason: other.to_string(),
        },
    }
}

impl CatalogPort for PgCatalog {
    async fn find_by_sku(&self, sku: &str) -> Result<Option<StoredEntry>, CatalogError> {
        find_entry_by_sku(&self.pool, sku)
            .await
            .map_err(|e| to_catalog_error(e, sku, None))
    }

    async fn create(&self, entry: &CatalogEntry) -> Result<CatalogId, CatalogError> {
        insert_entry(&self.pool, entry)
            .await
            .map_err(|e| to_catalog_error(e, &entry.sku, None))
    }

    async fn update(&self, id: CatalogId, update: &EntryUpdate) -> Result<(), CatalogError> {
        update_entry(&self.pool, id, update)
            .await
            .map_err(|e| to_catalog_error(e, &id.to_string(), Some(id)))
    }

    async fn list_by_supplier_tag(&self) -> Result<Vec<StoredEntry>, CatalogError> {
        list_supplier_entries(&self.pool)
            .await
            .map_err(|e| to_catalog_error(e, "*", None))
    }

    async fn deactivate(&self, id: CatalogId) -> Result<(), CatalogError> {
        deactivate_entry(&self.pool, id)
            .await
            .map_err(|e| to_catalog_error(e, &id.to_string(), Some(id)))
    }
}

impl RunRecorder for PgCatalog {
    async fn record_run(&self, stats: &SyncStats) -> Result<(), CatalogError> {
        crate::sync_runs::insert_sync_run(&self.pool, stats)
            .await
            .map(|_| ())
            .map_err(|e| to_catalog_error(e, "sync_run", None))
    }
}

impl RunLease for PgCatalog {
    async fn acquire_lease(
        &self,
        run_id: Uuid,
        stale_after: Duration,
    ) -> Result<LeaseOutcome, CatalogError> {
        acquire_sync_lease(&self.pool, run_id, stale_after, Utc::now())
            .await
            .map_err(|e| to_catalog_error(e, "sync_lease", None))
    }

    async fn publish_progress(&self, progress: &SyncProgress) -> Result<(), CatalogError> {
        publish_sync_progress(&self.pool, progress)
            .await
            .map_err(|e| to_catalog_error(e, "sync_lease", None))
    }

    async fn release_lease(
        &self,
        run_id: Uuid,
        final_progress: Option<&SyncProgress>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), CatalogError> {
        release_sync_lease(&self.pool, run_id, final_progress, expires_at)
            .await
            .map_err(|e| to_catalog_error(e, "sync_lease", None))
    }

    async fn read_lease(&self) -> Result<LeaseState, CatalogError> {
        read_sync_lease(&self.pool)
            .await
            .map_err(|e| to_catalog_error(e, "sync_lease", None))
    }
}
