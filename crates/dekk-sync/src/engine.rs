//! The reconciliation engine: fetch, per-item create/update/skip, obsolete
//! handling and run reporting.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dekk_core::{
    AppConfig, CanonicalProduct, CatalogEntry, CatalogError, CatalogId, CatalogPort, CreatedItem,
    LeaseOutcome, NotificationPort, ProductFeed, RunLease, RunRecorder, StockStatus, StoredEntry,
    SupplierCode, SyncStats, SyncStatus,
};
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::coordinator::{SyncCoordinator, SyncEvent};
use crate::diff::diff_entry;
use crate::extract::AttributeExtractor;
use crate::name::{build_categories, build_description, build_name};
use crate::obsolete::{find_obsolete, ObsoletePolicy, ObsoleteScope};
use crate::pricing::{build_variants, exposed_stock, final_price};

pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const DEFAULT_BATCH_PAUSE: Duration = Duration::from_millis(100);
pub const DEFAULT_OBSOLETE_BATCH_SIZE: usize = 20;

const DEFAULT_MARKUP_ISK: i64 = 400;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("failed to list catalog entries for obsolete handling: {0}")]
    ObsoleteListing(#[source] CatalogError),

    #[error("{sku} is not a valid tire: {reason}")]
    InvalidProduct { sku: String, reason: String },
}

impl SyncError {
    /// Whether the run has to stop.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            SyncError::Catalog(e) => e.is_fatal(),
            SyncError::ObsoleteListing(_) => true,
            SyncError::InvalidProduct { .. } => false,
        }
    }
}

/// Per-invocation knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    pub handle_obsolete: bool,
    pub batch_size: usize,
    pub dry_run: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            handle_obsolete: true,
            batch_size: DEFAULT_BATCH_SIZE,
            dry_run: false,
        }
    }
}

impl SyncOptions {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            handle_obsolete: config.sync_handle_obsolete,
            batch_size: config.sync_batch_size,
            dry_run: false,
        }
    }
}

/// Engine-wide settings fixed for the engine's lifetime.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Deducted from every raw price.
    pub markup: Decimal,
    /// Receives the new-products report. `None` disables it.
    pub notify_recipient: Option<String>,
    pub batch_pause: Duration,
    pub obsolete_batch_size: usize,
    pub obsolete_policy: ObsoletePolicy,
    pub obsolete_scope: ObsoleteScope,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            markup: Decimal::from(DEFAULT_MARKUP_ISK),
            notify_recipient: None,
            batch_pause: DEFAULT_BATCH_PAUSE,
            obsolete_batch_size: DEFAULT_OBSOLETE_BATCH_SIZE,
            obsolete_policy: ObsoletePolicy::Immediate,
            obsolete_scope: ObsoleteScope::AllSuppliers,
        }
    }
}

impl SyncSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            markup: config.price_markup_isk,
            notify_recipient: config.notify_email.clone(),
            batch_pause: Duration::from_millis(config.sync_batch_pause_ms),
            obsolete_batch_size: config.obsolete_batch_size,
            obsolete_policy: ObsoletePolicy::from_grace_days(config.obsolete_grace_days),
            obsolete_scope: ObsoleteScope::from_skip_silent(
                config.obsolete_skip_silent_suppliers,
            ),
        }
    }
}

/// What `sync_product` did (or, in a dry run, would do) with one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    /// `id` is `None` in a dry run.
    Created {
        id: Option<CatalogId>,
        display_name: String,
    },
    Updated { changed_fields: Vec<&'static str> },
    Skipped,
}

enum RunOutcome {
    Finished,
    Cancelled,
}

pub struct SyncEngine<C, F, N> {
    catalog: Arc<C>,
    feed: Arc<F>,
    notifier: Arc<N>,
    coordinator: Arc<SyncCoordinator>,
    settings: SyncSettings,
    supplier_a: AttributeExtractor,
    supplier_b: AttributeExtractor,
}

impl<C, F, N> SyncEngine<C, F, N>
where
    C: CatalogPort + RunRecorder + RunLease,
    F: ProductFeed,
    N: NotificationPort,
{
    pub fn new(
        catalog: Arc<C>,
        feed: Arc<F>,
        notifier: Arc<N>,
        coordinator: Arc<SyncCoordinator>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            catalog,
            feed,
            notifier,
            coordinator,
            settings,
            supplier_a: AttributeExtractor::for_supplier(SupplierCode::A),
            supplier_b: AttributeExtractor::for_supplier(SupplierCode::B),
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &Arc<C> {
        &self.catalog
    }

    #[must_use]
    pub fn coordinator(&self) -> &Arc<SyncCoordinator> {
        &self.coordinator
    }

    #[must_use]
    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    fn extractor(&self, code: SupplierCode) -> &AttributeExtractor {
        match code {
            SupplierCode::A => &self.supplier_a,
            SupplierCode::B => &self.supplier_b,
        }
    }

    /// Runs one full sync and returns its stats.
    ///
    /// Never returns an error: lock contention (in this process or through
    /// the shared lease) yields `aborted`, a fatal catalog failure yields
    /// `failed` with the partial counters, and a cancel request yields
    /// `cancelled`.
    pub async fn run_sync(&self, options: SyncOptions) -> SyncStats {
        let started_at = Utc::now();
        let mut stats = SyncStats::new(started_at, options.batch_size, options.dry_run);

        let guard = match self.coordinator.try_acquire() {
            Ok(guard) => guard,
            Err(held) => {
                tracing::warn!(
                    held_by = %held.run_id,
                    acquired_at = %held.acquired_at,
                    "sync already running, aborting"
                );
                stats.finish(SyncStatus::Aborted, Utc::now());
                return stats;
            }
        };
        let run_id = guard.run_id();

        match self
            .catalog
            .acquire_lease(run_id, self.coordinator.lock_timeout())
            .await
        {
            Ok(LeaseOutcome::Acquired) => {}
            Ok(LeaseOutcome::Held(holder)) => {
                tracing::warn!(
                    held_by = %holder.run_id,
                    acquired_at = %holder.acquired_at,
                    "sync running in another process, aborting"
                );
                stats.finish(SyncStatus::Aborted, Utc::now());
                return stats;
            }
            Err(e) => {
                tracing::error!(%run_id, error = %e, "failed to acquire sync lease");
                stats.record_error(None, format!("sync lease unavailable: {e}"), Utc::now());
                stats.finish(SyncStatus::Failed, Utc::now());
                self.finalize(run_id, &stats).await;
                return stats;
            }
        }

        tracing::info!(
            %run_id,
            batch_size = options.batch_size,
            dry_run = options.dry_run,
            handle_obsolete = options.handle_obsolete,
            "sync run started"
        );
        self.coordinator
            .emit(SyncEvent::Started { run_id, started_at });

        let status = match self.execute(run_id, options, &mut stats).await {
            Ok(RunOutcome::Finished) => SyncStatus::Completed,
            Ok(RunOutcome::Cancelled) => SyncStatus::Cancelled,
            Err(e) => {
                tracing::error!(%run_id, error = %e, "sync run failed");
                stats.record_error(None, e.to_string(), Utc::now());
                SyncStatus::Failed
            }
        };
        stats.finish(status, Utc::now());

        self.finalize(run_id, &stats).await;
        self.release_lease(run_id, &stats).await;
        drop(guard);
        stats
    }

    async fn execute(
        &self,
        run_id: Uuid,
        options: SyncOptions,
        stats: &mut SyncStats,
    ) -> Result<RunOutcome, SyncError> {
        self.set_status(run_id, stats, SyncStatus::Fetching).await;
        let products = self.feed.fetch_all().await;
        stats.fetched = products.len();
        tracing::info!(%run_id, fetched = stats.fetched, "fetched supplier products");

        self.set_status(run_id, stats, SyncStatus::Processing).await;
        let batch_size = options.batch_size.max(1);
        for (index, batch) in products.chunks(batch_size).enumerate() {
            if index > 0 {
                self.pause().await;
            }
            for product in batch {
                if self.coordinator.take_cancel_request() {
                    tracing::info!(
                        %run_id,
                        processed = stats.processed,
                        fetched = stats.fetched,
                        "sync run cancelled"
                    );
                    return Ok(RunOutcome::Cancelled);
                }
                self.process_item(product, options.dry_run, stats).await?;
                self.coordinator.publish_progress(run_id, stats);
            }
            self.share_progress(run_id, stats).await;
        }

        if options.handle_obsolete {
            self.set_status(run_id, stats, SyncStatus::ObsoleteHandling).await;
            if let RunOutcome::Cancelled = self
                .handle_obsolete(run_id, &products, options.dry_run, stats)
                .await?
            {
                return Ok(RunOutcome::Cancelled);
            }
        }

        self.set_status(run_id, stats, SyncStatus::Finalizing).await;
        Ok(RunOutcome::Finished)
    }

    async fn process_item(
        &self,
        product: &CanonicalProduct,
        dry_run: bool,
        stats: &mut SyncStats,
    ) -> Result<(), SyncError> {
        match self.sync_product(product, dry_run).await {
            Ok(SyncAction::Created { display_name, .. }) => {
                tracing::debug!(sku = %product.sku, %display_name, dry_run, "created");
                stats.created += 1;
                stats.created_items.push(CreatedItem {
                    sku: product.sku.clone(),
                    display_name,
                });
            }
            Ok(SyncAction::Updated { changed_fields }) => {
                tracing::debug!(sku = %product.sku, ?changed_fields, dry_run, "updated");
                stats.updated += 1;
            }
            Ok(SyncAction::Skipped) => {
                tracing::debug!(sku = %product.sku, "unchanged since last sync");
                stats.skipped += 1;
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::warn!(sku = %product.sku, error = %e, "failed to sync product");
                stats.record_error(Some(&product.sku), e.to_string(), Utc::now());
            }
        }
        stats.processed += 1;
        Ok(())
    }

    /// Decides and applies the action for one product.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] when the product is not a valid tire or the
    /// catalog rejects a read or write.
    pub async fn sync_product(
        &self,
        product: &CanonicalProduct,
        dry_run: bool,
    ) -> Result<SyncAction, SyncError> {
        if !product.is_valid_tire() {
            return Err(SyncError::InvalidProduct {
                sku: product.sku.clone(),
                reason: "rim diameter is zero".to_string(),
            });
        }

        let now = Utc::now();
        let fresh = self.build_entry(product, now)?;

        match self.catalog.find_by_sku(&product.sku).await? {
            None => {
                let id = if dry_run {
                    None
                } else {
                    Some(self.catalog.create(&fresh).await?)
                };
                Ok(SyncAction::Created {
                    id,
                    display_name: fresh.display_name,
                })
            }
            // Feeds without modification times stamp the fetch time, which is
            // always newer, so such products are updated on every run.
            Some(stored) if product.last_modified <= stored.entry.last_synced_at => {
                Ok(SyncAction::Skipped)
            }
            Some(stored) => self.update_entry(&stored, &fresh, now, dry_run).await,
        }
    }

    async fn update_entry(
        &self,
        stored: &StoredEntry,
        fresh: &CatalogEntry,
        now: DateTime<Utc>,
        dry_run: bool,
    ) -> Result<SyncAction, SyncError> {
        let mut update = diff_entry(&stored.entry, fresh);
        let changed_fields = update.changed_fields();
        update.last_synced_at = Some(now);
        update.sync_count = Some(stored.entry.sync_count.saturating_add(1));

        if !dry_run {
            self.catalog.update(stored.id, &update).await?;
        }
        Ok(SyncAction::Updated { changed_fields })
    }

    /// The entry the catalog should hold for `product` right now.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidProduct`] when the price is out of range
    /// once markup or stud surcharge are applied.
    pub fn build_entry(
        &self,
        product: &CanonicalProduct,
        now: DateTime<Utc>,
    ) -> Result<CatalogEntry, SyncError> {
        let price_out_of_range = || SyncError::InvalidProduct {
            sku: product.sku.clone(),
            reason: format!("price {} is out of range", product.raw_price),
        };

        let attributes = self.extractor(product.supplier_code).extract(product);
        let price =
            final_price(product.raw_price, self.settings.markup).ok_or_else(price_out_of_range)?;
        let stock = exposed_stock(product.quantity);
        let variants = build_variants(
            &product.sku,
            &attributes,
            price,
            stock,
            product.rim_diameter_inches,
        )
        .ok_or_else(price_out_of_range)?;

        let mut display_name = build_name(&attributes);
        if display_name.is_empty() {
            display_name = product.title.trim().to_string();
        }

        Ok(CatalogEntry {
            sku: product.sku.clone(),
            external_id: product.external_id.clone(),
            display_name,
            description: build_description(&attributes),
            price,
            stock_quantity: stock,
            stock_status: StockStatus::from_quantity(stock),
            categories: build_categories(&attributes),
            is_variable: attributes.is_variable(),
            attributes,
            image_ref: product.image_url.clone(),
            gallery_image_ref: product.gallery_image_url.clone(),
            energy_label_ref: product.energy_label_url.clone(),
            last_synced_at: now,
            sync_count: 1,
            supplier_code: product.supplier_code,
            variants,
        })
    }

    async fn handle_obsolete(
        &self,
        run_id: Uuid,
        products: &[CanonicalProduct],
        dry_run: bool,
        stats: &mut SyncStats,
    ) -> Result<RunOutcome, SyncError> {
        if products.is_empty() {
            tracing::warn!(
                %run_id,
                scope = ?self.settings.obsolete_scope,
                "no products fetched; every in-stock entry in scope is a candidate"
            );
        }

        let entries = self
            .catalog
            .list_by_supplier_tag()
            .await
            .map_err(SyncError::ObsoleteListing)?;
        let obsolete = find_obsolete(
            entries,
            products,
            self.settings.obsolete_policy,
            self.settings.obsolete_scope,
            Utc::now(),
        );
        stats.obsolete_found = obsolete.len();
        tracing::info!(%run_id, obsolete = obsolete.len(), "obsolete entries found");

        if dry_run {
            for stored in &obsolete {
                tracing::info!(sku = %stored.entry.sku, "dry run: would deactivate obsolete entry");
            }
            return Ok(RunOutcome::Finished);
        }

        for (index, chunk) in obsolete
            .chunks(self.settings.obsolete_batch_size.max(1))
            .enumerate()
        {
            if index > 0 {
                self.pause().await;
            }
            if self.coordinator.take_cancel_request() {
                tracing::info!(%run_id, "sync run cancelled during obsolete handling");
                return Ok(RunOutcome::Cancelled);
            }
            for stored in chunk {
                match self.catalog.deactivate(stored.id).await {
                    Ok(()) => {
                        tracing::debug!(sku = %stored.entry.sku, "deactivated obsolete entry");
                        stats.obsolete_deactivated += 1;
                    }
                    Err(e) if e.is_fatal() => return Err(e.into()),
                    Err(e) => {
                        tracing::warn!(sku = %stored.entry.sku, error = %e, "failed to deactivate entry");
                        stats.record_error(
                            Some(&stored.entry.sku),
                            format!("deactivate failed: {e}"),
                            Utc::now(),
                        );
                    }
                }
            }
            self.share_progress(run_id, stats).await;
        }

        Ok(RunOutcome::Finished)
    }

    /// Records the run, publishes the final progress and event, and sends
    /// the new-products report.
    async fn finalize(&self, run_id: Uuid, stats: &SyncStats) {
        if let Err(e) = self.catalog.record_run(stats).await {
            tracing::error!(%run_id, error = %e, "failed to record sync run");
        }

        let shared = Arc::new(stats.clone());
        match stats.status {
            SyncStatus::Cancelled => {
                self.coordinator.clear_progress();
                self.coordinator.emit(SyncEvent::Cancelled(shared));
            }
            SyncStatus::Failed => {
                self.coordinator.finish_progress(run_id, stats);
                self.coordinator.emit(SyncEvent::Failed(shared));
            }
            _ => {
                self.coordinator.finish_progress(run_id, stats);
                self.coordinator.emit(SyncEvent::Completed(shared));
            }
        }

        tracing::info!(
            %run_id,
            status = %stats.status,
            fetched = stats.fetched,
            processed = stats.processed,
            created = stats.created,
            updated = stats.updated,
            skipped = stats.skipped,
            errors = stats.errors,
            obsolete_deactivated = stats.obsolete_deactivated,
            "sync run finished"
        );

        if stats.status == SyncStatus::Completed && !stats.dry_run {
            self.send_report(stats).await;
        }
    }

    async fn send_report(&self, stats: &SyncStats) {
        let Some(recipient) = self.settings.notify_recipient.as_deref() else {
            return;
        };
        if stats.created_items.is_empty() {
            return;
        }

        let subject = format!("Dekk sync: {} new products", stats.created_items.len());
        let lines: Vec<String> = stats
            .created_items
            .iter()
            .map(|item| format!("{} - {}", item.sku, item.display_name))
            .collect();

        if let Err(e) = self.notifier.send_report(recipient, &subject, &lines).await {
            tracing::warn!(error = %e, "failed to send sync report");
        }
    }

    async fn set_status(&self, run_id: Uuid, stats: &mut SyncStats, status: SyncStatus) {
        stats.status = status;
        self.share_progress(run_id, stats).await;
    }

    /// Publishes progress locally and to the shared lease. Shared progress is
    /// best effort; a failed write never stops the run.
    async fn share_progress(&self, run_id: Uuid, stats: &SyncStats) {
        let progress = self.coordinator.publish_progress(run_id, stats);
        if let Err(e) = self.catalog.publish_progress(&progress).await {
            tracing::warn!(%run_id, error = %e, "failed to publish shared sync progress");
        }
    }

    /// Gives up the shared lease, leaving the final progress readable like
    /// the local one. A failed release is taken over once the lease is stale.
    async fn release_lease(&self, run_id: Uuid, stats: &SyncStats) {
        let final_progress = self.coordinator.progress().filter(|p| p.run_id == run_id);
        let expires_at = Utc::now() + self.coordinator.progress_ttl();
        if let Err(e) = self
            .catalog
            .release_lease(run_id, final_progress.as_ref(), expires_at)
            .await
        {
            tracing::warn!(
                %run_id,
                status = %stats.status,
                error = %e,
                "failed to release sync lease"
            );
        }
    }

    async fn pause(&self) {
        if !self.settings.batch_pause.is_zero() {
            tokio::time::sleep(self.settings.batch_pause).await;
        }
    }
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;
