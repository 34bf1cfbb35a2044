mod api;
mod middleware;
mod runner;
mod scheduler;

use std::sync::Arc;
use std::time::Duration;

use dekk_db::PgCatalog;
use dekk_scraper::SupplierFeeds;
use dekk_sync::{
    LogNotifier, SyncCoordinator, SyncEngine, SyncOptions, SyncSettings, DEFAULT_PROGRESS_TTL,
};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::AuthState,
    runner::{spawn_event_logger, EngineRunner, SyncRunner},
};

/// How long shutdown waits for a cancelled run to record itself.
const SHUTDOWN_DRAIN: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(dekk_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = dekk_db::PoolConfig::from_app_config(&config);
    let pool = dekk_db::connect_pool(&config.database_url, pool_config).await?;
    dekk_db::run_migrations(&pool).await?;

    let patches = dekk_core::load_record_patches(&config.record_patches_path)?;
    tracing::info!(patches = patches.len(), "record patches loaded");
    let feed = SupplierFeeds::from_config(&config, patches)?;

    let coordinator = Arc::new(SyncCoordinator::new(
        Duration::from_secs(config.sync_lock_timeout_secs),
        DEFAULT_PROGRESS_TTL,
    ));
    let _event_logger = spawn_event_logger(coordinator.subscribe());

    let engine = SyncEngine::new(
        Arc::new(PgCatalog::new(pool.clone())),
        Arc::new(feed),
        Arc::new(LogNotifier),
        Arc::clone(&coordinator),
        SyncSettings::from_app_config(&config),
    );
    let runner: Arc<dyn SyncRunner> = Arc::new(EngineRunner::new(
        engine,
        SyncOptions::from_app_config(&config),
    ));

    let mut scheduler =
        scheduler::build_scheduler(Arc::clone(&runner), &config.sync_schedule).await?;

    let auth = AuthState::from_env(matches!(config.env, dekk_core::Environment::Development))?;
    let app = build_app(
        AppState {
            pool,
            sync: runner,
        },
        auth,
        default_rate_limit_state(),
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, env = %config.env, "dekk-server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if coordinator.request_cancel() {
        tracing::warn!("shutdown with a sync run in progress; cancellation requested");
        let drained = tokio::time::timeout(SHUTDOWN_DRAIN, async {
            while coordinator.is_running() {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        })
        .await;
        if drained.is_err() {
            tracing::warn!("sync run still active after shutdown drain; exiting anyway");
        }
    }
    if let Err(e) = scheduler.shutdown().await {
        tracing::warn!(error = %e, "scheduler did not shut down cleanly");
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
