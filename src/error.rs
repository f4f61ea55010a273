//! Sync error types with retry classification and HTTP status mapping.
//!
//! [`SyncError`] is the central error type. Every variant knows whether the
//! retry policy may retry it, how it is classified in run reports, and which
//! HTTP status and structured JSON body it maps to on the trigger API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2101,
///     "message": "checkpoint conflict for anne: stored watermark moved",
///     "classification": "checkpoint_conflict"
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Error class as reported to pipeline monitoring.
    pub classification: String,
}

/// Errors raised while syncing, initializing or cleaning up.
///
/// # Error Code Ranges
///
/// | Range     | Category             | HTTP Status               |
/// |-----------|----------------------|---------------------------|
/// | 1000–1999 | Validation / config  | 400 / 500                 |
/// | 2000–2999 | Data / state         | 409 / 422                 |
/// | 3000–3999 | Collaborators        | 401 / 502 / 503 / 500     |
#[derive(Debug, Clone, thiserror::Error)]
pub enum SyncError {
    /// Game platform or backend rejected our credentials. Never retried.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Network, rate-limit or server-side failure while fetching matches.
    #[error("transient fetch failure: {0}")]
    TransientFetch(String),

    /// Network, rate-limit or server-side failure while writing datapoints.
    #[error("transient write failure: {0}")]
    TransientWrite(String),

    /// Fetched matches were not strictly ordered or contained duplicates.
    #[error("ordering violation: {0}")]
    OrderingViolation(String),

    /// Another run advanced the checkpoint first.
    #[error("checkpoint conflict for {username}: {detail}")]
    CheckpointConflict {
        /// Player whose checkpoint was contended.
        username: String,
        /// What was found instead of the expected watermark.
        detail: String,
    },

    /// Caller supplied an invalid request payload.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Checkpoint store failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Backend rejected a request for a non-transient reason.
    #[error("backend error: {0}")]
    Backend(String),

    /// Missing or malformed configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SyncError {
    /// Returns `true` if the retry policy may retry this error.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientFetch(_) | Self::TransientWrite(_))
    }

    /// Short class name used in run reports and logs.
    #[must_use]
    pub const fn classification(&self) -> &'static str {
        match self {
            Self::Auth(_) => "auth",
            Self::TransientFetch(_) => "transient_fetch",
            Self::TransientWrite(_) => "transient_write",
            Self::OrderingViolation(_) => "ordering_violation",
            Self::CheckpointConflict { .. } => "checkpoint_conflict",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Persistence(_) => "persistence",
            Self::Backend(_) => "backend",
            Self::Config(_) => "config",
            Self::Internal(_) => "internal",
        }
    }

    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::Config(_) => 1002,
            Self::OrderingViolation(_) => 2001,
            Self::CheckpointConflict { .. } => 2101,
            Self::Auth(_) => 3001,
            Self::TransientFetch(_) => 3101,
            Self::TransientWrite(_) => 3102,
            Self::Backend(_) => 3201,
            Self::Persistence(_) => 3301,
            Self::Internal(_) => 3000,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::OrderingViolation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::CheckpointConflict { .. } => StatusCode::CONFLICT,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::TransientFetch(_) | Self::TransientWrite(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Backend(_) => StatusCode::BAD_GATEWAY,
            Self::Persistence(_) | Self::Config(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Which side of the pipeline an outbound HTTP call belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Reading matches from the game platform.
    Fetch,
    /// Writing to the time-series backend or monitoring service.
    Write,
}

impl SyncError {
    /// Transient error for `direction`.
    #[must_use]
    pub fn transient(direction: Direction, detail: String) -> Self {
        match direction {
            Direction::Fetch => Self::TransientFetch(detail),
            Direction::Write => Self::TransientWrite(detail),
        }
    }

    /// Classifies a non-success HTTP status.
    ///
    /// 401/403 are auth failures; 408, 429 and 5xx are transient; anything
    /// else is a permanent backend rejection.
    #[must_use]
    pub fn from_http_status(direction: Direction, status: u16, detail: String) -> Self {
        match status {
            401 | 403 => Self::Auth(format!("HTTP {status}: {detail}")),
            408 | 429 | 500..=599 => Self::transient(direction, format!("HTTP {status}: {detail}")),
            _ => Self::Backend(format!("HTTP {status}: {detail}")),
        }
    }

    /// Classifies a transport-level `reqwest` failure.
    #[must_use]
    pub fn from_reqwest(direction: Direction, err: &reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::from_http_status(direction, status.as_u16(), err.to_string());
        }
        if err.is_decode() {
            return Self::Backend(format!("malformed response: {err}"));
        }
        Self::transient(direction, err.to_string())
    }
}

impl From<sqlx::Error> for SyncError {
    fn from(err: sqlx::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl IntoResponse for SyncError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                classification: self.classification().to_string(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_errors_are_retryable() {
        assert!(SyncError::TransientFetch("429".to_string()).is_retryable());
        assert!(SyncError::TransientWrite("503".to_string()).is_retryable());
        assert!(!SyncError::Auth("401".to_string()).is_retryable());
        assert!(!SyncError::OrderingViolation("dup".to_string()).is_retryable());
        assert!(!SyncError::Backend("400".to_string()).is_retryable());
    }

    #[test]
    fn conflict_maps_to_409() {
        let err = SyncError::CheckpointConflict {
            username: "anne".to_string(),
            detail: "stored watermark moved".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.classification(), "checkpoint_conflict");
        assert_eq!(err.error_code(), 2101);
    }

    #[test]
    fn http_status_classification() {
        assert!(matches!(
            SyncError::from_http_status(Direction::Fetch, 401, String::new()),
            SyncError::Auth(_)
        ));
        assert!(matches!(
            SyncError::from_http_status(Direction::Fetch, 429, String::new()),
            SyncError::TransientFetch(_)
        ));
        assert!(matches!(
            SyncError::from_http_status(Direction::Write, 503, String::new()),
            SyncError::TransientWrite(_)
        ));
        assert!(matches!(
            SyncError::from_http_status(Direction::Write, 400, String::new()),
            SyncError::Backend(_)
        ));
    }

    #[test]
    fn into_response_uses_status_code() {
        let response = SyncError::Auth("bad token".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
