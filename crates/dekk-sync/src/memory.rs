//! In-process catalog store, used for dry local runs and engine tests.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dekk_core::{
    CatalogEntry, CatalogError, CatalogId, CatalogPort, EntryUpdate, LeaseHolder, LeaseOutcome,
    LeaseState, RunLease, RunRecorder, StoredEntry, SyncProgress, SyncStats,
};
use uuid::Uuid;

#[derive(Debug, Default)]
struct MemoryState {
    entries: BTreeMap<CatalogId, CatalogEntry>,
    next_id: CatalogId,
    runs: Vec<SyncStats>,
    writes: usize,
    failing_skus: HashSet<String>,
    unavailable: bool,
    lease: LeaseState,
}

impl MemoryState {
    fn check_available(&self) -> Result<(), CatalogError> {
        if self.unavailable {
            Err(CatalogError::Unavailable("memory catalog switched off".to_string()))
        } else {
            Ok(())
        }
    }

    fn check_writable(&self, sku: &str) -> Result<(), CatalogError> {
        self.check_available()?;
        if self.failing_skus.contains(sku) {
            return Err(CatalogError::Rejected {
                sku: sku.to_string(),
                reason: "write refused".to_string(),
            });
        }
        Ok(())
    }

    fn insert(&mut self, entry: CatalogEntry) -> CatalogId {
        self.next_id += 1;
        let id = self.next_id;
        self.entries.insert(id, entry);
        id
    }
}

/// A [`CatalogPort`] keeping everything in a `BTreeMap`, ordered by id.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    state: Mutex<MemoryState>,
}

impl MemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seeds an entry without counting it as a sync write.
    pub fn seed(&self, entry: CatalogEntry) -> CatalogId {
        self.state().insert(entry)
    }

    #[must_use]
    pub fn get_by_sku(&self, sku: &str) -> Option<StoredEntry> {
        self.state()
            .entries
            .iter()
            .find(|(_, e)| e.sku == sku)
            .map(|(id, e)| StoredEntry {
                id: *id,
                entry: e.clone(),
            })
    }

    #[must_use]
    pub fn entries(&self) -> Vec<StoredEntry> {
        self.state()
            .entries
            .iter()
            .map(|(id, e)| StoredEntry {
                id: *id,
                entry: e.clone(),
            })
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state().entries.is_empty()
    }

    /// Number of successful creates, updates and deactivations.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.state().writes
    }

    #[must_use]
    pub fn recorded_runs(&self) -> Vec<SyncStats> {
        self.state().runs.clone()
    }

    /// Makes every write for `sku` fail with a non-fatal rejection.
    pub fn fail_on(&self, sku: &str) {
        self.state().failing_skus.insert(sku.to_string());
    }

    /// Simulates the store going away: every catalog call fails fatally. The
    /// run lease keeps working.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state().unavailable = unavailable;
    }
}

impl CatalogPort for MemoryCatalog {
    async fn find_by_sku(&self, sku: &str) -> Result<Option<StoredEntry>, CatalogError> {
        self.state().check_available()?;
        Ok(self.get_by_sku(sku))
    }

    async fn create(&self, entry: &CatalogEntry) -> Result<CatalogId, CatalogError> {
        let mut state = self.state();
        state.check_writable(&entry.sku)?;
        if state.entries.values().any(|e| e.sku == entry.sku) {
            return Err(CatalogError::DuplicateSku(entry.sku.clone()));
        }
        state.writes += 1;
        Ok(state.insert(entry.clone()))
    }

    async fn update(&self, id: CatalogId, update: &EntryUpdate) -> Result<(), CatalogError> {
        let mut state = self.state();
        let sku = state
            .entries
            .get(&id)
            .map(|e| e.sku.clone())
            .ok_or(CatalogError::NotFound(id))?;
        state.check_writable(&sku)?;
        if let Some(entry) = state.entries.get_mut(&id) {
            update.apply_to(entry);
        }
        state.writes += 1;
        Ok(())
    }

    async fn list_by_supplier_tag(&self) -> Result<Vec<StoredEntry>, CatalogError> {
        self.state().check_available()?;
        Ok(self.entries())
    }

    async fn deactivate(&self, id: CatalogId) -> Result<(), CatalogError> {
        let mut state = self.state();
        state.check_available()?;
        let entry = state
            .entries
            .get_mut(&id)
            .ok_or(CatalogError::NotFound(id))?;
        entry.mark_out_of_stock();
        state.writes += 1;
        Ok(())
    }
}

impl RunRecorder for MemoryCatalog {
    async fn record_run(&self, stats: &SyncStats) -> Result<(), CatalogError> {
        let mut state = self.state();
        state.check_available()?;
        state.runs.push(stats.clone());
        Ok(())
    }
}

impl RunLease for MemoryCatalog {
    async fn acquire_lease(
        &self,
        run_id: Uuid,
        stale_after: Duration,
    ) -> Result<LeaseOutcome, CatalogError> {
        let now = Utc::now();
        let mut state = self.state();
        if let Some(holder) = state.lease.holder {
            if holder.is_fresh_at(now, stale_after) {
                return Ok(LeaseOutcome::Held(holder));
            }
        }
        state.lease = LeaseState {
            holder: Some(LeaseHolder {
                run_id,
                acquired_at: now,
            }),
            progress: None,
            progress_expires_at: None,
        };
        Ok(LeaseOutcome::Acquired)
    }

    async fn publish_progress(&self, progress: &SyncProgress) -> Result<(), CatalogError> {
        let mut state = self.state();
        if state
            .lease
            .holder
            .is_some_and(|h| h.run_id == progress.run_id)
        {
            state.lease.progress = Some(progress.clone());
        }
        Ok(())
    }

    async fn release_lease(
        &self,
        run_id: Uuid,
        final_progress: Option<&SyncProgress>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), CatalogError> {
        let mut state = self.state();
        if state.lease.holder.is_some_and(|h| h.run_id == run_id) {
            state.lease = LeaseState {
                holder: None,
                progress: final_progress.cloned(),
                progress_expires_at: Some(expires_at),
            };
        }
        Ok(())
    }

    async fn read_lease(&self) -> Result<LeaseState, CatalogError> {
        Ok(self.state().lease.clone())
    }
}

#[cfg(test)]
mod tests {
    use dekk_core::{AttributeSet, StockStatus, SupplierCode};
    use rust_decimal::Decimal;

    use super::*;

    fn entry(sku: &str) -> CatalogEntry {
        CatalogEntry {
            sku: sku.to_string(),
            external_id: "1".to_string(),
            display_name: sku.to_string(),
            description: String::new(),
            price: Decimal::from(1000),
            stock_quantity: 4,
            stock_status: StockStatus::InStock,
            attributes: AttributeSet::new(),
            categories: Vec::new(),
            image_ref: None,
            gallery_image_ref: None,
            energy_label_ref: None,
            last_synced_at: Utc::now(),
            sync_count: 1,
            supplier_code: SupplierCode::A,
            is_variable: false,
            variants: Vec::new(),
        }
    }

    #[tokio::test]
    async fn create_then_find() {
        let catalog = MemoryCatalog::new();
        let id = catalog.create(&entry("1-BK")).await.unwrap();
        let found = catalog.find_by_sku("1-BK").await.unwrap().unwrap();
        assert_eq!(found.id, id);
        assert_eq!(catalog.write_count(), 1);
    }

    #[tokio::test]
    async fn duplicate_sku_is_rejected() {
        let catalog = MemoryCatalog::new();
        catalog.create(&entry("1-BK")).await.unwrap();
        let err = catalog.create(&entry("1-BK")).await.unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateSku(_)));
    }

    #[tokio::test]
    async fn update_applies_only_set_fields() {
        let catalog = MemoryCatalog::new();
        let id = catalog.seed(entry("1-BK"));
        let update = EntryUpdate {
            price: Some(Decimal::from(900)),
            ..EntryUpdate::default()
        };
        catalog.update(id, &update).await.unwrap();

        let stored = catalog.get_by_sku("1-BK").unwrap();
        assert_eq!(stored.entry.price, Decimal::from(900));
        assert_eq!(stored.entry.stock_quantity, 4);
    }

    #[tokio::test]
    async fn deactivate_zeroes_stock() {
        let catalog = MemoryCatalog::new();
        let id = catalog.seed(entry("1-BK"));
        catalog.deactivate(id).await.unwrap();
        let stored = catalog.get_by_sku("1-BK").unwrap();
        assert_eq!(stored.entry.stock_status, StockStatus::OutOfStock);
        assert_eq!(stored.entry.stock_quantity, 0);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let catalog = MemoryCatalog::new();
        assert!(matches!(
            catalog.deactivate(42).await,
            Err(CatalogError::NotFound(42))
        ));
    }

    #[tokio::test]
    async fn unavailable_store_fails_fatally() {
        let catalog = MemoryCatalog::new();
        catalog.set_unavailable(true);
        let err = catalog.find_by_sku("1-BK").await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn fresh_lease_is_refused_until_released() {
        let catalog = MemoryCatalog::new();
        let first = Uuid::new_v4();
        let hour = Duration::from_secs(3600);

        assert_eq!(
            catalog.acquire_lease(first, hour).await.unwrap(),
            LeaseOutcome::Acquired
        );
        match catalog.acquire_lease(Uuid::new_v4(), hour).await.unwrap() {
            LeaseOutcome::Held(holder) => assert_eq!(holder.run_id, first),
            LeaseOutcome::Acquired => panic!("lease handed out twice"),
        }

        catalog.release_lease(first, None, Utc::now()).await.unwrap();
        assert_eq!(
            catalog.acquire_lease(Uuid::new_v4(), hour).await.unwrap(),
            LeaseOutcome::Acquired
        );
    }

    #[tokio::test]
    async fn stale_lease_is_taken_over() {
        let catalog = MemoryCatalog::new();
        catalog
            .acquire_lease(Uuid::new_v4(), Duration::ZERO)
            .await
            .unwrap();
        let outcome = catalog
            .acquire_lease(Uuid::new_v4(), Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(outcome, LeaseOutcome::Acquired);
    }

    #[tokio::test]
    async fn failing_sku_is_rejected_but_not_fatal() {
        let catalog = MemoryCatalog::new();
        catalog.fail_on("1-BK");
        let err = catalog.create(&entry("1-BK")).await.unwrap_err();
        assert!(!err.is_fatal());
        assert_eq!(catalog.write_count(), 0);
    }
}
