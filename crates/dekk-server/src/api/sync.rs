use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use dekk_core::LeaseState;
use dekk_sync::SyncProgress;
use serde::{Deserialize, Serialize};

use super::{
    map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ErrorCode, ResponseMeta,
};
use crate::middleware::RequestId;

/// Optional overrides for a manual trigger, e.g. `POST /api/v1/sync?dry_run=true`.
#[derive(Debug, Default, Deserialize)]
pub(super) struct TriggerParams {
    pub dry_run: Option<bool>,
    pub batch_size: Option<usize>,
    pub handle_obsolete: Option<bool>,
}

#[derive(Debug, Serialize)]
pub(super) struct TriggerData {
    pub status: &'static str,
    pub dry_run: bool,
    pub batch_size: usize,
    pub handle_obsolete: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct ProgressData {
    pub running: bool,
    pub progress: Option<SyncProgress>,
}

/// The shared lease, or `None` when the store cannot be read.
async fn read_shared(state: &AppState) -> Option<LeaseState> {
    match state.sync.shared_lease().await {
        Ok(shared) => Some(shared),
        Err(e) => {
            tracing::warn!(error = %e, "shared sync lease unreadable; using local state");
            None
        }
    }
}

/// Whether the shared lease shows a live run in any process.
fn shared_running(state: &AppState, shared: Option<&LeaseState>) -> bool {
    let lock_timeout = state.sync.coordinator().lock_timeout();
    shared.is_some_and(|s| s.is_held_at(Utc::now(), lock_timeout))
}

/// The more recently updated of two snapshots.
pub(super) fn freshest(
    local: Option<SyncProgress>,
    shared: Option<SyncProgress>,
) -> Option<SyncProgress> {
    match (local, shared) {
        (Some(local), Some(shared)) if shared.updated_at > local.updated_at => Some(shared),
        (Some(local), _) => Some(local),
        (None, shared) => shared,
    }
}

#[derive(Debug, Serialize)]
pub(super) struct CancelData {
    pub cancelling: bool,
}

#[derive(Debug, Deserialize)]
pub(super) struct RunsQuery {
    pub limit: Option<i64>,
}

pub(super) async fn trigger_sync(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<TriggerParams>,
) -> Result<impl IntoResponse, ApiError> {
    if state.sync.coordinator().is_running() {
        return Err(ApiError::new(
            req_id.0,
            ErrorCode::Conflict,
            "a sync run is already in progress",
        ));
    }
    if shared_running(&state, read_shared(&state).await.as_ref()) {
        return Err(ApiError::new(
            req_id.0,
            ErrorCode::Conflict,
            "a sync run is in progress in another process",
        ));
    }
    if params.batch_size == Some(0) {
        return Err(ApiError::new(
            req_id.0,
            ErrorCode::ValidationError,
            "batch_size must be at least 1",
        ));
    }

    let mut options = state.sync.default_options();
    if let Some(dry_run) = params.dry_run {
        options.dry_run = dry_run;
    }
    if let Some(batch_size) = params.batch_size {
        options.batch_size = batch_size;
    }
    if let Some(handle_obsolete) = params.handle_obsolete {
        options.handle_obsolete = handle_obsolete;
    }

    // Detached; the run reports through the coordinator and the run log.
    drop(state.sync.spawn_run(options));
    tracing::info!(
        dry_run = options.dry_run,
        batch_size = options.batch_size,
        "sync run triggered via api"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse {
            data: TriggerData {
                status: "started",
                dry_run: options.dry_run,
                batch_size: options.batch_size,
                handle_obsolete: options.handle_obsolete,
            },
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

pub(super) async fn cancel_sync(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.sync.coordinator().request_cancel() {
        let message = if shared_running(&state, read_shared(&state).await.as_ref()) {
            "the sync run in progress belongs to another process"
        } else {
            "no sync run is in progress"
        };
        return Err(ApiError::new(req_id.0, ErrorCode::Conflict, message));
    }

    tracing::info!("sync cancellation requested via api");
    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse {
            data: CancelData { cancelling: true },
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

pub(super) async fn get_progress(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let shared = read_shared(&state).await;
    let coordinator = state.sync.coordinator();
    let now = Utc::now();

    Json(ApiResponse {
        data: ProgressData {
            running: coordinator.is_running() || shared_running(&state, shared.as_ref()),
            progress: freshest(
                coordinator.progress(),
                shared.as_ref().and_then(|s| s.progress_at(now)).cloned(),
            ),
        },
        meta: ResponseMeta::new(req_id.0),
    })
}

pub(super) async fn list_runs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<RunsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let runs = dekk_db::list_sync_runs(&state.pool, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: runs,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn list_run_errors(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(run_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let errors = dekk_db::list_sync_run_errors(&state.pool, run_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: errors,
        meta: ResponseMeta::new(req_id.0),
    }))
}
