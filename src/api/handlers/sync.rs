//! Run triggers: sync and init.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{InitRequest, SyncRequest};
use crate::app_state::AppState;
use crate::error::{ErrorResponse, SyncError};
use crate::service::{InitReport, RunRequest, RunSummary};

/// `POST /sync`: Run one incremental or backfill sync.
///
/// # Errors
///
/// Returns [`SyncError`] when the payload is invalid or the run fails.
#[utoipa::path(
    post,
    path = "/api/v1/sync",
    tag = "Sync",
    summary = "Run a sync",
    description = "Processes completed matches after the stored watermark. With `start-time` the run refolds the full history and rewrites every match after that time; repeating it is idempotent and the watermark never moves backward.",
    request_body = SyncRequest,
    responses(
        (status = 200, description = "Run finished", body = RunSummary),
        (status = 400, description = "Invalid payload", body = ErrorResponse),
        (status = 401, description = "Credentials rejected", body = ErrorResponse),
        (status = 409, description = "Another run advanced the checkpoint first", body = ErrorResponse),
        (status = 422, description = "Matches out of order or duplicated", body = ErrorResponse),
        (status = 503, description = "Transient failure after retries", body = ErrorResponse),
    )
)]
pub async fn run_sync(
    State(state): State<AppState>,
    body: Option<Json<SyncRequest>>,
) -> Result<impl IntoResponse, SyncError> {
    let request = match body {
        Some(Json(req)) => RunRequest::try_from(req)?,
        None => RunRequest::default(),
    };
    let summary = state.sync_service.run(&state.username, &request).await?;
    Ok(Json(summary))
}

/// `POST /init`: Create the player's series and extraction pipeline.
///
/// # Errors
///
/// Returns [`SyncError`] if the backend rejects a creation.
#[utoipa::path(
    post,
    path = "/api/v1/init",
    tag = "Sync",
    summary = "Initialize series",
    description = "Creates the six step series and the extraction pipeline. Objects that already exist are left alone.",
    request_body = InitRequest,
    responses(
        (status = 200, description = "Series and pipeline in place", body = InitReport),
        (status = 502, description = "Backend rejected a creation", body = ErrorResponse),
    )
)]
pub async fn init(
    State(state): State<AppState>,
    body: Option<Json<InitRequest>>,
) -> Result<impl IntoResponse, SyncError> {
    let pipeline_id = body
        .and_then(|Json(req)| req.extraction_pipeline)
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| state.sync_service.default_pipeline_id(&state.username));
    let report = state
        .initializer
        .initialize(&state.username, &pipeline_id)
        .await?;
    Ok(Json(report))
}

/// Run trigger routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sync", post(run_sync))
        .route("/init", post(init))
}
