//! Type-erased handle to the sync engine shared by the API and the scheduler.

use std::sync::Arc;

use dekk_core::{
    CatalogError, CatalogPort, LeaseState, NotificationPort, ProductFeed, RunLease, RunRecorder,
    SyncStats,
};
use dekk_sync::{SyncCoordinator, SyncEngine, SyncEvent, SyncOptions};
use futures::future::{BoxFuture, FutureExt};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

/// Starts background sync runs and exposes their coordinator.
pub trait SyncRunner: Send + Sync {
    fn coordinator(&self) -> &Arc<SyncCoordinator>;

    /// Options used when a trigger does not override them.
    fn default_options(&self) -> SyncOptions;

    /// Spawns one run onto the runtime. Lock contention surfaces as an
    /// `aborted` result, not as a spawn failure.
    fn spawn_run(&self, options: SyncOptions) -> JoinHandle<SyncStats>;

    /// The run lease shared with other processes, e.g. a CLI run.
    fn shared_lease(&self) -> BoxFuture<'_, Result<LeaseState, CatalogError>>;
}

pub struct EngineRunner<C, F, N> {
    engine: Arc<SyncEngine<C, F, N>>,
    defaults: SyncOptions,
}

impl<C, F, N> EngineRunner<C, F, N> {
    pub fn new(engine: SyncEngine<C, F, N>, defaults: SyncOptions) -> Self {
        Self {
            engine: Arc::new(engine),
            defaults,
        }
    }
}

impl<C, F, N> SyncRunner for EngineRunner<C, F, N>
where
    C: CatalogPort + RunRecorder + RunLease + 'static,
    F: ProductFeed + 'static,
    N: NotificationPort + 'static,
{
    fn coordinator(&self) -> &Arc<SyncCoordinator> {
        self.engine.coordinator()
    }

    fn default_options(&self) -> SyncOptions {
        self.defaults
    }

    fn spawn_run(&self, options: SyncOptions) -> JoinHandle<SyncStats> {
        let engine = Arc::clone(&self.engine);
        tokio::spawn(async move { engine.run_sync(options).await })
    }

    fn shared_lease(&self) -> BoxFuture<'_, Result<LeaseState, CatalogError>> {
        self.engine.catalog().read_lease().boxed()
    }
}

/// Logs every lifecycle event until the coordinator is dropped.
pub fn spawn_event_logger(mut events: broadcast::Receiver<SyncEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SyncEvent::Started { run_id, started_at }) => {
                    tracing::info!(%run_id, %started_at, "sync run started");
                }
                Ok(SyncEvent::Completed(stats)) => {
                    tracing::info!(
                        created = stats.created,
                        updated = stats.updated,
                        skipped = stats.skipped,
                        errors = stats.errors,
                        obsolete_deactivated = stats.obsolete_deactivated,
                        dry_run = stats.dry_run,
                        "sync run completed"
                    );
                }
                Ok(SyncEvent::Cancelled(stats)) => {
                    tracing::warn!(
                        processed = stats.processed,
                        fetched = stats.fetched,
                        "sync run cancelled"
                    );
                }
                Ok(SyncEvent::Failed(stats)) => {
                    tracing::error!(
                        processed = stats.processed,
                        errors = stats.errors,
                        "sync run failed"
                    );
                }
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "sync event logger lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use dekk_core::{CanonicalProduct, SyncStatus};
    use dekk_sync::{LogNotifier, MemoryCatalog, SyncSettings};

    struct EmptyFeed;

    impl ProductFeed for EmptyFeed {
        async fn fetch_all(&self) -> Vec<CanonicalProduct> {
            Vec::new()
        }
    }

    type TestRunner = EngineRunner<MemoryCatalog, EmptyFeed, LogNotifier>;

    fn runner(defaults: SyncOptions) -> (TestRunner, Arc<MemoryCatalog>) {
        let catalog = Arc::new(MemoryCatalog::new());
        let engine = SyncEngine::new(
            Arc::clone(&catalog),
            Arc::new(EmptyFeed),
            Arc::new(LogNotifier),
            Arc::new(SyncCoordinator::default()),
            SyncSettings {
                batch_pause: Duration::ZERO,
                ..SyncSettings::default()
            },
        );
        (EngineRunner::new(engine, defaults), catalog)
    }

    #[tokio::test]
    async fn spawned_run_completes_and_is_recorded() {
        let (runner, catalog) = runner(SyncOptions::default());
        let stats = runner
            .spawn_run(runner.default_options())
            .await
            .expect("task joined");

        assert_eq!(stats.status, SyncStatus::Completed);
        assert_eq!(catalog.recorded_runs().len(), 1);
        assert!(!runner.coordinator().is_running());
    }

    #[tokio::test]
    async fn spawned_run_aborts_while_lock_is_held() {
        let (runner, catalog) = runner(SyncOptions::default());
        let _guard = runner.coordinator().try_acquire().expect("lock");

        let stats = runner
            .spawn_run(SyncOptions::default())
            .await
            .expect("task joined");

        assert_eq!(stats.status, SyncStatus::Aborted);
        assert!(catalog.recorded_runs().is_empty());
    }

    #[tokio::test]
    async fn spawned_run_aborts_while_another_process_holds_the_lease() {
        let (runner, catalog) = runner(SyncOptions::default());
        let other = uuid::Uuid::new_v4();
        catalog
            .acquire_lease(other, Duration::from_secs(3600))
            .await
            .expect("lease");

        let stats = runner
            .spawn_run(SyncOptions::default())
            .await
            .expect("task joined");

        assert_eq!(stats.status, SyncStatus::Aborted);
        assert!(catalog.recorded_runs().is_empty());
        let shared = runner.shared_lease().await.expect("lease readable");
        assert_eq!(shared.holder.map(|h| h.run_id), Some(other));
    }

    #[test]
    fn default_options_are_the_configured_ones() {
        let defaults = SyncOptions {
            handle_obsolete: false,
            batch_size: 7,
            dry_run: true,
        };
        let (runner, _) = runner(defaults);
        assert_eq!(runner.default_options(), defaults);
    }

    #[tokio::test]
    async fn event_logger_stops_when_channel_closes() {
        let (tx, rx) = broadcast::channel(4);
        let logger = spawn_event_logger(rx);
        tx.send(SyncEvent::Started {
            run_id: uuid::Uuid::new_v4(),
            started_at: chrono::Utc::now(),
        })
        .expect("receiver alive");
        drop(tx);

        tokio::time::timeout(Duration::from_secs(1), logger)
            .await
            .expect("logger exits")
            .expect("logger joined");
    }
}
