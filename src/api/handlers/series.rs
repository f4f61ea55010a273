//! Series preview and cleanup.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::CleanupRequest;
use crate::app_state::AppState;
use crate::error::{ErrorResponse, SyncError};
use crate::service::{CleanupPlan, CleanupReport, RequestConfirmation};

/// `GET /series`: Preview what a cleanup would delete.
///
/// # Errors
///
/// Returns [`SyncError`] if the backend cannot list series.
#[utoipa::path(
    get,
    path = "/api/v1/series",
    tag = "Series",
    summary = "Preview cleanup",
    description = "Lists the player's six series and whether each currently exists. Nothing is modified.",
    responses(
        (status = 200, description = "Cleanup plan", body = CleanupPlan),
        (status = 503, description = "Backend unavailable", body = ErrorResponse),
    )
)]
pub async fn preview_cleanup(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, SyncError> {
    let plan = state.cleanup.preview(&state.username).await?;
    Ok(Json(plan))
}

/// `POST /series/cleanup`: Delete the player's series.
///
/// # Errors
///
/// Returns [`SyncError`] if the backend cannot list series.
#[utoipa::path(
    post,
    path = "/api/v1/series/cleanup",
    tag = "Series",
    summary = "Delete series",
    description = "Deletes the player's six series when `confirm` is true and `expected_series`, if given, matches the current plan. Checkpoints are not touched.",
    request_body = CleanupRequest,
    responses(
        (status = 200, description = "Cleanup executed", body = CleanupReport),
        (status = 412, description = "Cleanup declined; nothing deleted", body = CleanupReport),
        (status = 503, description = "Backend unavailable", body = ErrorResponse),
    )
)]
pub async fn cleanup(
    State(state): State<AppState>,
    Json(req): Json<CleanupRequest>,
) -> Result<impl IntoResponse, SyncError> {
    let plan = state.cleanup.preview(&state.username).await?;
    let confirmation = RequestConfirmation::from(req);
    let report = state.cleanup.execute(&plan, &confirmation).await;
    let status = if report.confirmed {
        StatusCode::OK
    } else {
        StatusCode::PRECONDITION_FAILED
    };
    Ok((status, Json(report)))
}

/// Series routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/series", get(preview_cleanup))
        .route("/series/cleanup", post(cleanup))
}
