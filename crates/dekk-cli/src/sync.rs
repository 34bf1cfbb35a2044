//! `sync` command handler.
//!
//! Wires the configured supplier feeds, the Postgres catalog and the log
//! notifier into a [`SyncEngine`] and runs it once in the foreground. Ctrl-C
//! during a run requests cancellation instead of killing the process, so the
//! run is still recorded.

use std::sync::Arc;
use std::time::Duration;

use dekk_core::{AppConfig, SyncStats, SyncStatus};
use dekk_db::PgCatalog;
use dekk_scraper::SupplierFeeds;
use dekk_sync::{
    LogNotifier, SyncCoordinator, SyncEngine, SyncOptions, SyncSettings, DEFAULT_PROGRESS_TTL,
};

/// Flags accepted by `dekk-cli sync`.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SyncArgs {
    pub dry_run: bool,
    pub batch_size: Option<usize>,
    pub skip_obsolete: bool,
}

/// Merges command-line flags over the configured defaults.
pub(crate) fn build_options(config: &AppConfig, args: SyncArgs) -> SyncOptions {
    let mut options = SyncOptions::from_app_config(config);
    options.dry_run = args.dry_run;
    if let Some(batch_size) = args.batch_size {
        options.batch_size = batch_size.max(1);
    }
    if args.skip_obsolete {
        options.handle_obsolete = false;
    }
    options
}

/// Runs one sync and prints its summary.
///
/// # Errors
///
/// Returns an error if the record patches or HTTP client cannot be loaded,
/// or if the run finished with status `failed`.
pub(crate) async fn run_sync_command(
    pool: sqlx::PgPool,
    config: &AppConfig,
    args: SyncArgs,
) -> anyhow::Result<()> {
    let patches = dekk_core::load_record_patches(&config.record_patches_path)?;
    let feed = SupplierFeeds::from_config(config, patches)
        .map_err(|e| anyhow::anyhow!("failed to build supplier feeds: {e}"))?;

    let coordinator = Arc::new(SyncCoordinator::new(
        Duration::from_secs(config.sync_lock_timeout_secs),
        DEFAULT_PROGRESS_TTL,
    ));
    let engine = SyncEngine::new(
        Arc::new(PgCatalog::new(pool)),
        Arc::new(feed),
        Arc::new(LogNotifier),
        Arc::clone(&coordinator),
        SyncSettings::from_app_config(config),
    );

    let cancel_on_ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() && coordinator.request_cancel() {
            tracing::warn!("ctrl-c received; cancelling after the current item");
        }
    });

    let options = build_options(config, args);
    let stats = engine.run_sync(options).await;
    cancel_on_ctrl_c.abort();

    print_summary(&stats);

    if stats.status == SyncStatus::Failed {
        anyhow::bail!("sync run failed after {} of {} products", stats.processed, stats.fetched);
    }
    Ok(())
}

fn print_summary(stats: &SyncStats) {
    let mode = if stats.dry_run { " (dry run)" } else { "" };
    println!("sync {}{mode}", stats.status);
    println!(
        "  fetched {}  processed {}  created {}  updated {}  skipped {}  errors {}",
        stats.fetched, stats.processed, stats.created, stats.updated, stats.skipped, stats.errors
    );
    if stats.obsolete_found > 0 {
        println!(
            "  obsolete {} found, {} deactivated",
            stats.obsolete_found, stats.obsolete_deactivated
        );
    }
    for item in &stats.created_items {
        println!("  + {} - {}", item.sku, item.display_name);
    }
    for error in &stats.error_log {
        let sku = error.sku.as_deref().unwrap_or("-");
        println!("  ! {sku}: {}", error.message);
    }
}
