//! Background job scheduler.
//!
//! Registers the recurring catalog sync on a [`JobScheduler`] at server
//! startup. A tick that finds a run already in progress, in this process or
//! in another one holding the shared lease, is skipped.

use std::sync::Arc;

use chrono::Utc;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::runner::SyncRunner;

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive for
/// the lifetime of the process. Dropping it shuts down all scheduled jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// `schedule` is not a valid cron expression, or the scheduler fails to start.
pub async fn build_scheduler(
    runner: Arc<dyn SyncRunner>,
    schedule: &str,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    register_sync_job(&scheduler, runner, schedule).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the recurring sync job on `schedule` (six-field cron, UTC).
async fn register_sync_job(
    scheduler: &JobScheduler,
    runner: Arc<dyn SyncRunner>,
    schedule: &str,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(schedule, move |_uuid, _lock| {
        let runner = Arc::clone(&runner);

        Box::pin(async move {
            run_scheduled_sync(runner.as_ref()).await;
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(schedule, "scheduler: sync job registered");
    Ok(())
}

async fn run_scheduled_sync(runner: &dyn SyncRunner) {
    if runner.coordinator().is_running() {
        tracing::info!("scheduler: sync already in progress; skipping tick");
        return;
    }
    match runner.shared_lease().await {
        Ok(shared) if shared.is_held_at(Utc::now(), runner.coordinator().lock_timeout()) => {
            tracing::info!("scheduler: sync running in another process; skipping tick");
            return;
        }
        Ok(_) => {}
        // The run itself re-checks the lease and fails or aborts cleanly.
        Err(e) => tracing::warn!(error = %e, "scheduler: shared sync lease unreadable"),
    }

    tracing::info!("scheduler: starting scheduled sync run");
    match runner.spawn_run(runner.default_options()).await {
        Ok(stats) => tracing::info!(
            status = %stats.status,
            fetched = stats.fetched,
            created = stats.created,
            updated = stats.updated,
            errors = stats.errors,
            "scheduler: scheduled sync run finished"
        ),
        Err(e) => tracing::error!(error = %e, "scheduler: sync task did not complete"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use dekk_core::{CatalogError, LeaseHolder, LeaseState, SyncStats, SyncStatus};
    use dekk_sync::{SyncCoordinator, SyncOptions};
    use futures::future::{BoxFuture, FutureExt};
    use tokio::task::JoinHandle;

    #[derive(Default)]
    struct CountingRunner {
        coordinator: Arc<SyncCoordinator>,
        spawned: AtomicUsize,
        shared: LeaseState,
    }

    impl SyncRunner for CountingRunner {
        fn coordinator(&self) -> &Arc<SyncCoordinator> {
            &self.coordinator
        }

        fn default_options(&self) -> SyncOptions {
            SyncOptions::default()
        }

        fn spawn_run(&self, options: SyncOptions) -> JoinHandle<SyncStats> {
            self.spawned.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let mut stats = SyncStats::new(chrono::Utc::now(), options.batch_size, false);
                stats.finish(SyncStatus::Completed, chrono::Utc::now());
                stats
            })
        }

        fn shared_lease(&self) -> BoxFuture<'_, Result<LeaseState, CatalogError>> {
            let shared = self.shared.clone();
            async move { Ok(shared) }.boxed()
        }
    }

    #[tokio::test]
    async fn scheduled_tick_starts_a_run() {
        let runner = CountingRunner::default();
        run_scheduled_sync(&runner).await;
        assert_eq!(runner.spawned.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn scheduled_tick_skips_while_running() {
        let runner = CountingRunner::default();
        let _guard = runner.coordinator.try_acquire().expect("lock");

        run_scheduled_sync(&runner).await;
        assert_eq!(runner.spawned.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn scheduled_tick_skips_while_another_process_runs() {
        let runner = CountingRunner {
            shared: LeaseState {
                holder: Some(LeaseHolder {
                    run_id: uuid::Uuid::new_v4(),
                    acquired_at: Utc::now(),
                }),
                ..LeaseState::default()
            },
            ..CountingRunner::default()
        };

        run_scheduled_sync(&runner).await;
        assert_eq!(runner.spawned.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalid_schedule_is_rejected() {
        let runner: Arc<dyn SyncRunner> = Arc::new(CountingRunner::default());
        assert!(build_scheduler(runner, "every six hours").await.is_err());
    }
}
