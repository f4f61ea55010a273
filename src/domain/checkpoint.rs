//! Sync progress for one player: the watermark plus running aggregates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{Match, MatchId};

/// Position of the last processed match.
///
/// Ordered by finish time, then by match id, so two matches finishing in
/// the same millisecond are still totally ordered.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
pub struct Watermark {
    /// Finish time of the last processed match.
    pub finish_time: DateTime<Utc>,
    /// Id of the last processed match.
    #[schema(value_type = i64)]
    pub match_id: MatchId,
}

impl Watermark {
    /// Watermark positioned exactly at `m`.
    #[must_use]
    pub fn of(m: &Match) -> Self {
        Self {
            finish_time: m.finish_time,
            match_id: m.match_id,
        }
    }

    /// Returns `true` if `m` lies strictly after this watermark.
    #[must_use]
    pub fn is_before(&self, m: &Match) -> bool {
        (self.finish_time, self.match_id) < m.sort_key()
    }
}

/// Running aggregates after the most recently folded match.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, ToSchema)]
pub struct PlayerStats {
    /// Current rating.
    pub rating: f64,
    /// Number of folded matches.
    pub games_played: u64,
    /// Number of folded matches that were won.
    pub games_won: u64,
    /// Positive for a win streak, negative for a loss streak, zero for none.
    pub current_streak: i64,
    /// Highest rating seen across all folded matches.
    pub best_rating: f64,
}

impl PlayerStats {
    /// Fraction of games won, `0.0` when nothing has been played.
    #[must_use]
    pub fn win_rate(&self) -> f64 {
        if self.games_played == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let rate = self.games_won as f64 / self.games_played as f64;
        rate
    }
}

/// Persisted sync state for a single player.
///
/// The checkpoint is the only source of truth for what has been processed.
/// The time-series backend is never read back to reconstruct it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Checkpoint {
    /// Player the checkpoint belongs to.
    pub username: String,
    /// Last processed match, `None` before the first match is processed.
    pub watermark: Option<Watermark>,
    /// Aggregates after the last processed match.
    pub stats: PlayerStats,
    /// When the checkpoint was last written.
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Zero-valued checkpoint used when a player has never been synced.
    #[must_use]
    pub fn zero(username: &str) -> Self {
        Self {
            username: username.to_string(),
            watermark: None,
            stats: PlayerStats::default(),
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::domain::{BoardType, MatchResult, RuleSet};

    fn at(ms: i64, id: i64) -> Match {
        let Some(finish_time) = Utc.timestamp_millis_opt(ms).single() else {
            panic!("valid timestamp");
        };
        Match {
            match_id: MatchId::new(id),
            finish_time,
            opponent: "kari".to_string(),
            result: MatchResult::Won,
            rating_before: 1500.0,
            rating_after: 1510.0,
            ruleset: RuleSet::Norwegian,
            board: BoardType::Normal,
        }
    }

    #[test]
    fn later_finish_time_is_after_watermark() {
        let wm = Watermark::of(&at(1_000, 5));
        assert!(wm.is_before(&at(1_001, 1)));
        assert!(!wm.is_before(&at(999, 9)));
    }

    #[test]
    fn equal_finish_time_breaks_tie_on_id() {
        let wm = Watermark::of(&at(1_000, 5));
        assert!(wm.is_before(&at(1_000, 6)));
        assert!(!wm.is_before(&at(1_000, 5)));
        assert!(!wm.is_before(&at(1_000, 4)));
    }

    #[test]
    fn win_rate_is_zero_without_games() {
        assert!(PlayerStats::default().win_rate().abs() < f64::EPSILON);
    }

    #[test]
    fn zero_checkpoint_has_no_watermark() {
        let cp = Checkpoint::zero("per");
        assert_eq!(cp.username, "per");
        assert!(cp.watermark.is_none());
        assert_eq!(cp.stats.games_played, 0);
    }
}
