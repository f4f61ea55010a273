//! Metric accumulator: folds finished matches into running aggregates.
//!
//! Everything here is pure. The same ordered match sequence folded from the
//! same starting [`PlayerStats`] always produces the same result, which is
//! what makes replays and backfills reproducible.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{BoardType, Match, MatchId, MatchResult, Metric, PlayerStats, RuleSet};

/// Per-match context attached to every datapoint derived from a match.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventMetadata {
    /// Match the datapoints were derived from.
    pub match_id: MatchId,
    /// Outcome for the synced player.
    pub result: MatchResult,
    /// Opponent's display name.
    pub opponent: String,
    /// Rating change caused by the match.
    pub rating_delta: f64,
    /// Rule set of the match.
    pub ruleset: RuleSet,
    /// Board layout of the match.
    pub board: BoardType,
}

/// Aggregates after folding one match, plus the match context.
///
/// One event is produced per folded match and consumed immediately by the
/// emitter; the emitted datapoints are its only persisted form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedEvent {
    /// Event time: the finish time of the folded match.
    pub timestamp: DateTime<Utc>,
    /// Aggregates after the fold.
    pub stats: PlayerStats,
    /// Match context.
    pub metadata: EventMetadata,
}

impl DerivedEvent {
    /// Value of `metric` after this event.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Rating => self.stats.rating,
            Metric::GamesPlayed => self.stats.games_played as f64,
            Metric::GamesWon => self.stats.games_won as f64,
            Metric::WinRate => self.stats.win_rate(),
            Metric::CurrentStreak => self.stats.current_streak as f64,
            Metric::BestRating => self.stats.best_rating,
        }
    }
}

/// Folds one match into `state`, returning the new state and the event
/// describing it.
#[must_use]
pub fn fold(state: &PlayerStats, m: &Match) -> (PlayerStats, DerivedEvent) {
    let rating = m.rating_after;
    let games_played = state.games_played.saturating_add(1);
    let games_won = match m.result {
        MatchResult::Won => state.games_won.saturating_add(1),
        MatchResult::Lost | MatchResult::Tied => state.games_won,
    };
    let current_streak = match m.result {
        MatchResult::Won => state.current_streak.max(0).saturating_add(1),
        MatchResult::Lost => state.current_streak.min(0).saturating_sub(1),
        MatchResult::Tied => state.current_streak,
    };
    // A zero state carries no rating history, so the first match seeds best.
    let best_rating = if state.games_played == 0 {
        rating
    } else {
        state.best_rating.max(rating)
    };

    let next = PlayerStats {
        rating,
        games_played,
        games_won,
        current_streak,
        best_rating,
    };

    let event = DerivedEvent {
        timestamp: m.finish_time,
        stats: next,
        metadata: EventMetadata {
            match_id: m.match_id,
            result: m.result,
            opponent: m.opponent.clone(),
            rating_delta: m.rating_delta(),
            ruleset: m.ruleset,
            board: m.board,
        },
    };

    (next, event)
}

/// Folds an ordered sequence of matches, returning the final state and one
/// event per match, in input order.
#[must_use]
pub fn fold_all<'a, I>(state: &PlayerStats, matches: I) -> (PlayerStats, Vec<DerivedEvent>)
where
    I: IntoIterator<Item = &'a Match>,
{
    let mut current = *state;
    let events = matches
        .into_iter()
        .map(|m| {
            let (next, event) = fold(&current, m);
            current = next;
            event
        })
        .collect();
    (current, events)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn game(id: i64, result: MatchResult, before: f64, after: f64) -> Match {
        let Some(finish_time) = Utc.timestamp_millis_opt(id * 1_000).single() else {
            panic!("valid timestamp");
        };
        Match {
            match_id: MatchId::new(id),
            finish_time,
            opponent: format!("opponent-{id}"),
            result,
            rating_before: before,
            rating_after: after,
            ruleset: RuleSet::Norwegian,
            board: BoardType::Normal,
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn streak_follows_results() {
        let games = [
            game(1, MatchResult::Won, 1500.0, 1510.0),
            game(2, MatchResult::Won, 1510.0, 1520.0),
            game(3, MatchResult::Lost, 1520.0, 1505.0),
            game(4, MatchResult::Won, 1505.0, 1515.0),
        ];
        let (_, events) = fold_all(&PlayerStats::default(), &games);
        let streaks: Vec<i64> = events.iter().map(|e| e.stats.current_streak).collect();
        assert_eq!(streaks, vec![1, 2, -1, 1]);
    }

    #[test]
    fn tie_leaves_streak_unchanged() {
        let games = [
            game(1, MatchResult::Lost, 1500.0, 1490.0),
            game(2, MatchResult::Lost, 1490.0, 1480.0),
            game(3, MatchResult::Tied, 1480.0, 1481.0),
        ];
        let (state, _) = fold_all(&PlayerStats::default(), &games);
        assert_eq!(state.current_streak, -2);
        assert_eq!(state.games_played, 3);
        assert_eq!(state.games_won, 0);
    }

    #[test]
    fn win_rate_after_three_games_two_won() {
        let games = [
            game(1, MatchResult::Won, 1500.0, 1510.0),
            game(2, MatchResult::Lost, 1510.0, 1500.0),
            game(3, MatchResult::Won, 1500.0, 1512.0),
        ];
        let (state, events) = fold_all(&PlayerStats::default(), &games);
        assert!(approx(state.win_rate(), 2.0 / 3.0));
        let Some(last) = events.last() else {
            panic!("expected events");
        };
        assert!(approx(last.value(Metric::WinRate), 2.0 / 3.0));
        assert!(approx(last.value(Metric::GamesPlayed), 3.0));
    }

    #[test]
    fn best_rating_never_decreases() {
        let games = [
            game(1, MatchResult::Won, 1490.0, 1500.0),
            game(2, MatchResult::Lost, 1500.0, 1480.0),
            game(3, MatchResult::Won, 1480.0, 1550.0),
            game(4, MatchResult::Lost, 1550.0, 1530.0),
        ];
        let (_, events) = fold_all(&PlayerStats::default(), &games);
        let best: Vec<f64> = events.iter().map(|e| e.stats.best_rating).collect();
        assert_eq!(best, vec![1500.0, 1500.0, 1550.0, 1550.0]);
        let Some(last) = events.last() else {
            panic!("expected events");
        };
        assert!(approx(last.stats.rating, 1530.0));
    }

    #[test]
    fn first_fold_seeds_best_rating_from_zero_state() {
        let (state, _) = fold(
            &PlayerStats::default(),
            &game(1, MatchResult::Lost, 1200.0, 1180.0),
        );
        assert!(approx(state.best_rating, 1180.0));
    }

    #[test]
    fn folding_across_run_boundaries_matches_single_fold() {
        let games = [
            game(1, MatchResult::Won, 1500.0, 1510.0),
            game(2, MatchResult::Tied, 1510.0, 1511.0),
            game(3, MatchResult::Lost, 1511.0, 1495.0),
            game(4, MatchResult::Won, 1495.0, 1507.0),
            game(5, MatchResult::Won, 1507.0, 1519.0),
        ];
        let (whole, _) = fold_all(&PlayerStats::default(), &games);

        let (head, tail) = games.split_at(2);
        let (mid, _) = fold_all(&PlayerStats::default(), head);
        let (split, _) = fold_all(&mid, tail);

        assert_eq!(whole, split);
    }

    #[test]
    fn metadata_carries_match_context() {
        let m = game(7, MatchResult::Lost, 1600.0, 1588.0);
        let (_, event) = fold(&PlayerStats::default(), &m);
        assert_eq!(event.timestamp, m.finish_time);
        assert_eq!(event.metadata.match_id, MatchId::new(7));
        assert_eq!(event.metadata.opponent, "opponent-7");
        assert!(approx(event.metadata.rating_delta, -12.0));
    }
}
