//! DTOs for the sync and init endpoints.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{BoardType, RuleSet};
use crate::error::SyncError;
use crate::service::RunRequest;

/// Request body for `POST /api/v1/sync`. Every field is optional; an empty
/// object triggers an incremental run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct SyncRequest {
    /// Backfill start in epoch milliseconds.
    #[serde(default, rename = "start-time")]
    pub start_time: Option<i64>,
    /// Upper bound on match finish time in epoch milliseconds.
    #[serde(default, rename = "end-time")]
    pub end_time: Option<i64>,
    /// Extraction pipeline to report the run to.
    #[serde(default, rename = "extraction-pipeline")]
    pub extraction_pipeline: Option<String>,
    /// Board layout filter, e.g. `"BoardNormal"` or `"random"`.
    #[serde(default, rename = "board-type")]
    pub board_type: Option<String>,
    /// Rule set filter, e.g. `"RuleSetNorwegian"` or `"english"`.
    #[serde(default, rename = "rule-set")]
    pub rule_set: Option<String>,
}

impl TryFrom<SyncRequest> for RunRequest {
    type Error = SyncError;

    fn try_from(req: SyncRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            start_time: req.start_time.map(|ms| millis("start-time", ms)).transpose()?,
            end_time: req.end_time.map(|ms| millis("end-time", ms)).transpose()?,
            pipeline_id: req.extraction_pipeline.filter(|p| !p.trim().is_empty()),
            board: req
                .board_type
                .map(|b| b.parse::<BoardType>().map_err(SyncError::InvalidRequest))
                .transpose()?,
            ruleset: req
                .rule_set
                .map(|r| r.parse::<RuleSet>().map_err(SyncError::InvalidRequest))
                .transpose()?,
        })
    }
}

fn millis(field: &str, ms: i64) -> Result<DateTime<Utc>, SyncError> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| SyncError::InvalidRequest(format!("{field} out of range: {ms}")))
}

/// Request body for `POST /api/v1/init`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct InitRequest {
    /// Extraction pipeline to create instead of the default one.
    #[serde(default, rename = "extraction-pipeline")]
    pub extraction_pipeline: Option<String>,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::service::RunMode;

    #[test]
    fn kebab_case_payload_becomes_backfill_request() {
        let body = r#"{"start-time": 500, "end-time": 2000, "board-type": "BoardRandom", "rule-set": "RuleSetNorwegian"}"#;
        let Ok(req) = serde_json::from_str::<SyncRequest>(body) else {
            panic!("payload should parse");
        };
        let Ok(run) = RunRequest::try_from(req) else {
            panic!("payload should convert");
        };
        assert_eq!(run.mode(), RunMode::Backfill);
        assert_eq!(run.start_time.map(|t| t.timestamp_millis()), Some(500));
        assert_eq!(run.board, Some(BoardType::Random));
        assert_eq!(run.ruleset, Some(RuleSet::Norwegian));
    }

    #[test]
    fn empty_payload_is_incremental() {
        let Ok(run) = RunRequest::try_from(SyncRequest::default()) else {
            panic!("empty payload should convert");
        };
        assert_eq!(run, RunRequest::default());
    }

    #[test]
    fn unknown_rule_set_is_rejected() {
        let req = SyncRequest {
            rule_set: Some("klingon".to_string()),
            ..SyncRequest::default()
        };
        let Err(SyncError::InvalidRequest(msg)) = RunRequest::try_from(req) else {
            panic!("expected invalid request");
        };
        assert!(msg.contains("klingon"));
    }
}
