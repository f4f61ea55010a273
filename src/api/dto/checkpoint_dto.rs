//! DTOs for the checkpoint endpoints.

use serde::Serialize;
use utoipa::ToSchema;

/// Response body for `DELETE /api/v1/checkpoint`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ResetCheckpointResponse {
    /// Player whose checkpoint was reset.
    pub username: String,
    /// `false` if no checkpoint was stored.
    pub removed: bool,
}
