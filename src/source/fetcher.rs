//! Completed-match fetcher.
//!
//! Wraps a [`MatchSource`] with the retry policy and reduces its output to
//! the finished matches inside a [`FetchWindow`], sorted ascending by
//! `(finish_time, match_id)`.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::MatchSource;
use crate::domain::{BoardType, Match, RuleSet, Watermark};
use crate::error::SyncError;
use crate::retry::RetryPolicy;

/// Lower bound of a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    /// Everything; used before the first match is processed.
    Beginning,
    /// Strictly after a stored watermark, ties broken by match id.
    After(Watermark),
    /// Strictly after a point in time (backfill start).
    Since(DateTime<Utc>),
}

impl Cursor {
    /// Returns `true` if `m` lies past this cursor.
    #[must_use]
    pub fn admits(&self, m: &Match) -> bool {
        match self {
            Self::Beginning => true,
            Self::After(wm) => wm.is_before(m),
            Self::Since(time) => m.finish_time > *time,
        }
    }
}

/// Which completed matches a fetch should return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchWindow {
    /// Exclusive lower bound.
    pub after: Cursor,
    /// Inclusive upper bound on finish time.
    pub until: Option<DateTime<Utc>>,
    /// Only matches on this board layout.
    pub board: Option<BoardType>,
    /// Only matches with this rule set.
    pub ruleset: Option<RuleSet>,
}

impl FetchWindow {
    /// Unbounded window starting at `after`.
    #[must_use]
    pub fn after(after: Cursor) -> Self {
        Self {
            after,
            until: None,
            board: None,
            ruleset: None,
        }
    }

    /// Returns `true` if `m` falls inside the window.
    #[must_use]
    pub fn contains(&self, m: &Match) -> bool {
        self.after.admits(m)
            && self.until.is_none_or(|until| m.finish_time <= until)
            && self.board.is_none_or(|board| m.board == board)
            && self.ruleset.is_none_or(|ruleset| m.ruleset == ruleset)
    }
}

/// Fetches a player's completed matches within a window.
#[derive(Debug, Clone)]
pub struct CompletedMatchFetcher {
    source: Arc<dyn MatchSource>,
    retry: RetryPolicy,
}

impl CompletedMatchFetcher {
    /// Creates a fetcher over `source`, retrying transient failures with
    /// `retry`.
    #[must_use]
    pub fn new(source: Arc<dyn MatchSource>, retry: RetryPolicy) -> Self {
        Self { source, retry }
    }

    /// Returns the finished matches of `username` inside `window`, sorted by
    /// `(finish_time, match_id)`. In-progress matches are dropped.
    ///
    /// Duplicate ids from the platform are passed through untouched; the
    /// orchestrator rejects them.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::TransientFetch`] once retries are exhausted, or
    /// [`SyncError::Auth`] immediately on credential failure.
    pub async fn fetch(
        &self,
        username: &str,
        window: &FetchWindow,
    ) -> Result<Vec<Match>, SyncError> {
        let raw = self
            .retry
            .run("list_matches", || self.source.list_matches(username))
            .await?;
        let listed = raw.len();

        let mut matches: Vec<Match> = raw
            .into_iter()
            .filter_map(super::RawMatch::into_completed)
            .filter(|m| window.contains(m))
            .collect();
        matches.sort_by_key(Match::sort_key);

        tracing::debug!(
            username,
            listed,
            selected = matches.len(),
            cursor = ?window.after,
            "fetched completed matches"
        );
        Ok(matches)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::time::Duration;

    use chrono::TimeZone;

    use super::*;
    use crate::domain::{MatchId, MatchResult};
    use crate::source::{InMemoryMatchSource, RawMatch};

    fn ts(ms: i64) -> DateTime<Utc> {
        let Some(t) = Utc.timestamp_millis_opt(ms).single() else {
            panic!("valid timestamp");
        };
        t
    }

    fn raw(id: i64, finished_ms: Option<i64>) -> RawMatch {
        RawMatch {
            id,
            finished_at: finished_ms.map(ts),
            opponent: format!("p{id}"),
            result: finished_ms.map(|_| MatchResult::Won),
            rating_before: 1500.0,
            rating_after: 1510.0,
            ruleset: RuleSet::Norwegian,
            board: BoardType::Normal,
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            multiplier: 2.0,
            jitter: 0.0,
        }
    }

    async fn fetcher_with(
        matches: Vec<RawMatch>,
    ) -> (Arc<InMemoryMatchSource>, CompletedMatchFetcher) {
        let source = Arc::new(InMemoryMatchSource::new());
        source.push("anne", matches).await;
        let dyn_source: Arc<dyn MatchSource> = Arc::clone(&source) as Arc<dyn MatchSource>;
        (source, CompletedMatchFetcher::new(dyn_source, policy()))
    }

    fn ids(matches: &[Match]) -> Vec<i64> {
        matches.iter().map(|m| m.match_id.get()).collect()
    }

    #[tokio::test]
    async fn sorts_and_drops_running_matches() {
        let (_, fetcher) = fetcher_with(vec![
            raw(3, Some(3_000)),
            raw(9, None),
            raw(1, Some(1_000)),
            raw(2, Some(1_000)),
        ])
        .await;
        let Ok(matches) = fetcher.fetch("anne", &FetchWindow::after(Cursor::Beginning)).await else {
            panic!("fetch failed");
        };
        assert_eq!(ids(&matches), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn watermark_cursor_breaks_ties_on_id() {
        let (_, fetcher) =
            fetcher_with(vec![raw(1, Some(1_000)), raw(2, Some(1_000)), raw(3, Some(2_000))]).await;
        let wm = Watermark {
            finish_time: ts(1_000),
            match_id: MatchId::new(1),
        };
        let Ok(matches) = fetcher.fetch("anne", &FetchWindow::after(Cursor::After(wm))).await else {
            panic!("fetch failed");
        };
        assert_eq!(ids(&matches), vec![2, 3]);
    }

    #[tokio::test]
    async fn since_cursor_is_strict_and_until_is_inclusive() {
        let (_, fetcher) = fetcher_with(vec![
            raw(1, Some(500)),
            raw(2, Some(600)),
            raw(3, Some(1_500)),
            raw(4, Some(2_000)),
        ])
        .await;
        let window = FetchWindow {
            until: Some(ts(1_500)),
            ..FetchWindow::after(Cursor::Since(ts(500)))
        };
        let Ok(matches) = fetcher.fetch("anne", &window).await else {
            panic!("fetch failed");
        };
        assert_eq!(ids(&matches), vec![2, 3]);
    }

    #[tokio::test]
    async fn board_and_ruleset_filters_apply() {
        let mut random = raw(2, Some(2_000));
        random.board = BoardType::Random;
        let mut english = raw(3, Some(3_000));
        english.ruleset = RuleSet::English;
        let (_, fetcher) = fetcher_with(vec![raw(1, Some(1_000)), random, english]).await;

        let window = FetchWindow {
            board: Some(BoardType::Normal),
            ruleset: Some(RuleSet::Norwegian),
            ..FetchWindow::after(Cursor::Beginning)
        };
        let Ok(matches) = fetcher.fetch("anne", &window).await else {
            panic!("fetch failed");
        };
        assert_eq!(ids(&matches), vec![1]);
    }

    #[tokio::test]
    async fn transient_failure_is_retried() {
        let (source, fetcher) = fetcher_with(vec![raw(1, Some(1_000))]).await;
        source
            .fail_next(SyncError::TransientFetch("rate limited".to_string()))
            .await;
        let result = fetcher.fetch("anne", &FetchWindow::after(Cursor::Beginning)).await;
        assert_eq!(result.map(|m| m.len()).ok(), Some(1));
    }

    #[tokio::test]
    async fn auth_failure_is_fatal() {
        let (source, fetcher) = fetcher_with(vec![raw(1, Some(1_000))]).await;
        source.fail_next(SyncError::Auth("expired".to_string())).await;
        let result = fetcher.fetch("anne", &FetchWindow::after(Cursor::Beginning)).await;
        assert!(matches!(result, Err(SyncError::Auth(_))));
    }
}
