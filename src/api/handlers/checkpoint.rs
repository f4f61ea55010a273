//! Checkpoint inspection and reset.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::ResetCheckpointResponse;
use crate::app_state::AppState;
use crate::domain::Checkpoint;
use crate::error::{ErrorResponse, SyncError};

/// `GET /checkpoint`: Current watermark and aggregates.
///
/// # Errors
///
/// Returns [`SyncError`] if the checkpoint store cannot be read.
#[utoipa::path(
    get,
    path = "/api/v1/checkpoint",
    tag = "Checkpoint",
    summary = "Get checkpoint",
    description = "Returns the stored checkpoint, or a zero checkpoint if the player has never been synced.",
    responses(
        (status = 200, description = "Stored checkpoint", body = Checkpoint),
        (status = 500, description = "Checkpoint store failure", body = ErrorResponse),
    )
)]
pub async fn get_checkpoint(State(state): State<AppState>) -> Result<impl IntoResponse, SyncError> {
    let checkpoint = state.sync_service.checkpoint(&state.username).await?;
    Ok(Json(checkpoint))
}

/// `DELETE /checkpoint`: Forget all sync progress.
///
/// # Errors
///
/// Returns [`SyncError`] if the checkpoint store cannot be written.
#[utoipa::path(
    delete,
    path = "/api/v1/checkpoint",
    tag = "Checkpoint",
    summary = "Reset checkpoint",
    description = "Deletes the stored checkpoint. The next run reprocesses the whole history; existing datapoints are overwritten in place.",
    responses(
        (status = 200, description = "Checkpoint reset", body = ResetCheckpointResponse),
        (status = 500, description = "Checkpoint store failure", body = ErrorResponse),
    )
)]
pub async fn reset_checkpoint(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, SyncError> {
    let removed = state.sync_service.reset_checkpoint(&state.username).await?;
    Ok(Json(ResetCheckpointResponse {
        username: state.username.to_string(),
        removed,
    }))
}

/// Checkpoint routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/checkpoint", get(get_checkpoint).delete(reset_checkpoint))
}
