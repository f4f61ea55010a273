//! Database row model for checkpoints.

use chrono::{DateTime, Utc};

use crate::domain::{Checkpoint, MatchId, PlayerStats, Watermark};
use crate::error::SyncError;

/// A row of the `sync_checkpoints` table.
///
/// Counters are stored as `BIGINT`; conversion to the domain's unsigned
/// counters is checked.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct CheckpointRow {
    /// Player the checkpoint belongs to (primary key).
    pub username: String,
    /// Id of the last processed match, `NULL` before the first one.
    pub last_match_id: Option<i64>,
    /// Finish time of the last processed match, `NULL` before the first one.
    pub last_finish_time: Option<DateTime<Utc>>,
    /// Current rating.
    pub rating: f64,
    /// Matches played.
    pub games_played: i64,
    /// Matches won.
    pub games_won: i64,
    /// Signed streak.
    pub current_streak: i64,
    /// Best rating.
    pub best_rating: f64,
    /// Last write time.
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<CheckpointRow> for Checkpoint {
    type Error = SyncError;

    fn try_from(row: CheckpointRow) -> Result<Self, Self::Error> {
        let watermark = match (row.last_finish_time, row.last_match_id) {
            (Some(finish_time), Some(id)) => Some(Watermark {
                finish_time,
                match_id: MatchId::new(id),
            }),
            (None, None) => None,
            _ => {
                return Err(SyncError::Persistence(format!(
                    "checkpoint for {} has a half-written watermark",
                    row.username
                )));
            }
        };
        let counter = |value: i64, column: &str| {
            u64::try_from(value).map_err(|_| {
                SyncError::Persistence(format!("negative {column} for {}", row.username))
            })
        };
        let stats = PlayerStats {
            rating: row.rating,
            games_played: counter(row.games_played, "games_played")?,
            games_won: counter(row.games_won, "games_won")?,
            current_streak: row.current_streak,
            best_rating: row.best_rating,
        };
        Ok(Self {
            username: row.username,
            watermark,
            stats,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<&Checkpoint> for CheckpointRow {
    type Error = SyncError;

    fn try_from(cp: &Checkpoint) -> Result<Self, Self::Error> {
        let counter = |value: u64, column: &str| {
            i64::try_from(value).map_err(|_| {
                SyncError::Persistence(format!("{column} overflows BIGINT for {}", cp.username))
            })
        };
        Ok(Self {
            username: cp.username.clone(),
            last_match_id: cp.watermark.map(|wm| wm.match_id.get()),
            last_finish_time: cp.watermark.map(|wm| wm.finish_time),
            rating: cp.stats.rating,
            games_played: counter(cp.stats.games_played, "games_played")?,
            games_won: counter(cp.stats.games_won, "games_won")?,
            current_streak: cp.stats.current_streak,
            best_rating: cp.stats.best_rating,
            updated_at: cp.updated_at,
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn row() -> CheckpointRow {
        CheckpointRow {
            username: "anne".to_string(),
            last_match_id: Some(17),
            last_finish_time: Some(Utc::now()),
            rating: 1612.5,
            games_played: 40,
            games_won: 22,
            current_streak: -3,
            best_rating: 1650.0,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn row_converts_to_checkpoint() {
        let Ok(cp) = Checkpoint::try_from(row()) else {
            panic!("conversion failed");
        };
        assert_eq!(cp.watermark.map(|wm| wm.match_id), Some(MatchId::new(17)));
        assert_eq!(cp.stats.games_won, 22);
        assert_eq!(cp.stats.current_streak, -3);
    }

    #[test]
    fn half_written_watermark_is_rejected() {
        let mut broken = row();
        broken.last_match_id = None;
        assert!(Checkpoint::try_from(broken).is_err());
    }

    #[test]
    fn negative_counter_is_rejected() {
        let mut broken = row();
        broken.games_played = -1;
        assert!(Checkpoint::try_from(broken).is_err());
    }

    #[test]
    fn zero_checkpoint_maps_to_null_watermark() {
        let Ok(row) = CheckpointRow::try_from(&Checkpoint::zero("bo")) else {
            panic!("conversion failed");
        };
        assert!(row.last_match_id.is_none());
        assert!(row.last_finish_time.is_none());
        assert_eq!(row.games_played, 0);
    }
}
