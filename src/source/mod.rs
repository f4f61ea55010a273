//! Match source: the game platform's match history and the completed-match
//! fetcher built on top of it.
//!
//! [`MatchSource`] is the raw transport seam. [`CompletedMatchFetcher`]
//! turns its output into the ordered, filtered sequence the sync engine
//! folds.

pub mod fetcher;
pub mod http;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{BoardType, Match, MatchId, MatchResult, RuleSet};
use crate::error::SyncError;

pub use fetcher::{CompletedMatchFetcher, Cursor, FetchWindow};
pub use http::HttpMatchSource;
pub use memory::InMemoryMatchSource;

/// A match as reported by the game platform, finished or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMatch {
    /// Platform game id.
    pub id: i64,
    /// Finish time in epoch milliseconds; absent while the match is running.
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Opponent's display name.
    pub opponent: String,
    /// Outcome; absent while the match is running.
    #[serde(default)]
    pub result: Option<MatchResult>,
    /// Rating before the match.
    pub rating_before: f64,
    /// Rating after the match (equal to `rating_before` while running).
    pub rating_after: f64,
    /// Rule set.
    pub ruleset: RuleSet,
    /// Board layout.
    pub board: BoardType,
}

impl RawMatch {
    /// Converts into a [`Match`] if the match has finished.
    #[must_use]
    pub fn into_completed(self) -> Option<Match> {
        let finish_time = self.finished_at?;
        let result = self.result?;
        Some(Match {
            match_id: MatchId::new(self.id),
            finish_time,
            opponent: self.opponent,
            result,
            rating_before: self.rating_before,
            rating_after: self.rating_after,
            ruleset: self.ruleset,
            board: self.board,
        })
    }
}

/// Raw access to a player's match history.
#[async_trait]
pub trait MatchSource: Send + Sync + std::fmt::Debug {
    /// Lists every match the platform knows for `username`, in any order,
    /// including matches still in progress.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::TransientFetch`] on network or rate-limit
    /// failures and [`SyncError::Auth`] when the session is rejected.
    async fn list_matches(&self, username: &str) -> Result<Vec<RawMatch>, SyncError>;
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn running_match_is_not_completed() {
        let raw = RawMatch {
            id: 1,
            finished_at: None,
            opponent: "ola".to_string(),
            result: None,
            rating_before: 1500.0,
            rating_after: 1500.0,
            ruleset: RuleSet::Norwegian,
            board: BoardType::Normal,
        };
        assert!(raw.into_completed().is_none());
    }

    #[test]
    fn deserializes_platform_payload() {
        let json = r#"{
            "id": 991,
            "finished_at": 1700000000000,
            "opponent": "kari",
            "result": "won",
            "rating_before": 1500.0,
            "rating_after": 1512.3,
            "ruleset": "RuleSetNorwegian",
            "board": "BoardRandom"
        }"#;
        let Ok(raw) = serde_json::from_str::<RawMatch>(json) else {
            panic!("payload should deserialize");
        };
        let Some(m) = raw.into_completed() else {
            panic!("finished match expected");
        };
        assert_eq!(m.match_id, MatchId::new(991));
        assert_eq!(m.finish_time.timestamp_millis(), 1_700_000_000_000);
        assert_eq!(m.board, BoardType::Random);
    }

    #[test]
    fn missing_finish_time_deserializes_as_running() {
        let json = r#"{"id": 5, "opponent": "x", "rating_before": 1.0,
            "rating_after": 1.0, "ruleset": "english", "board": "normal"}"#;
        let Ok(raw) = serde_json::from_str::<RawMatch>(json) else {
            panic!("payload should deserialize");
        };
        assert!(raw.finished_at.is_none());
    }
}
