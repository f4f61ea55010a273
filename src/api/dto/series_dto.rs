//! DTOs for the series endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::service::RequestConfirmation;

/// Request body for `POST /api/v1/series/cleanup`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CleanupRequest {
    /// Must be `true` for anything to be deleted.
    #[serde(default)]
    pub confirm: bool,
    /// Series ids from a previous `GET /api/v1/series`. When present, the
    /// cleanup is declined if the current plan differs.
    #[serde(default)]
    pub expected_series: Option<Vec<String>>,
}

impl From<CleanupRequest> for RequestConfirmation {
    fn from(req: CleanupRequest) -> Self {
        Self {
            confirm: req.confirm,
            expected_series: req.expected_series,
        }
    }
}
