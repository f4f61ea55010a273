//! Sync orchestrator: one incremental or backfill run for one player.
//!
//! A run walks `Init → LoadingCheckpoint → Fetching → Folding → Emitting →
//! AdvancingCheckpoint → Done`. Any error moves it to `Failed`. The
//! checkpoint is written with a single compare-and-swap save, either in
//! `AdvancingCheckpoint` or, after a failed write, for the matches emitted
//! before it. A run cancelled before that save leaves the stored state
//! untouched.
//!
//! A backfill replays history: it refolds every fetched match from a zero
//! state and re-emits the matches after its start time (and everything
//! past the watermark). Repeating a backfill therefore rewrites the same
//! values and leaves the checkpoint as it was.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::Instrument;
use utoipa::ToSchema;
use uuid::Uuid;

use super::emitter::DatapointEmitter;
use crate::config::SyncConfig;
use crate::domain::{
    BoardType, Checkpoint, Match, PlayerStats, RuleSet, SeriesCatalog, Watermark, fold_all,
};
use crate::error::SyncError;
use crate::persistence::CheckpointStore;
use crate::sink::{PipelineMonitor, RunReport, RunStatus};
use crate::source::{CompletedMatchFetcher, Cursor, FetchWindow};

/// Lifecycle phase of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    /// Resolving the run mode from the request.
    Init,
    /// Reading the stored checkpoint.
    LoadingCheckpoint,
    /// Listing completed matches past the cursor.
    Fetching,
    /// Validating order and folding matches into aggregates.
    Folding,
    /// Writing datapoints.
    Emitting,
    /// Saving the new checkpoint.
    AdvancingCheckpoint,
    /// Finished successfully.
    Done,
    /// Finished with an error.
    Failed,
}

impl RunPhase {
    /// Returns the phase as a static string slice.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::LoadingCheckpoint => "loading_checkpoint",
            Self::Fetching => "fetching",
            Self::Folding => "folding",
            Self::Emitting => "emitting",
            Self::AdvancingCheckpoint => "advancing_checkpoint",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a run selects matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Everything after the stored watermark.
    Incremental,
    /// Replay of everything after an explicit start time, possibly before
    /// the watermark.
    Backfill,
}

/// Parameters of one run. The default is a plain incremental run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunRequest {
    /// Backfill start. Matches finished strictly after it are re-emitted,
    /// along with any match past the stored watermark.
    pub start_time: Option<DateTime<Utc>>,
    /// Matches finished after this time are left for a later run.
    pub end_time: Option<DateTime<Utc>>,
    /// Extraction pipeline to report to, instead of the default one.
    pub pipeline_id: Option<String>,
    /// Only process matches on this board layout.
    pub board: Option<BoardType>,
    /// Only process matches with this rule set.
    pub ruleset: Option<RuleSet>,
}

impl RunRequest {
    /// Run mode implied by the request.
    #[must_use]
    pub const fn mode(&self) -> RunMode {
        if self.start_time.is_some() {
            RunMode::Backfill
        } else {
            RunMode::Incremental
        }
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RunSummary {
    /// Unique id of the run, also present in its log span.
    pub run_id: Uuid,
    /// Player that was synced.
    pub username: String,
    /// Incremental or backfill.
    pub mode: RunMode,
    /// Extraction pipeline the run was reported to.
    pub pipeline_id: String,
    /// Completed matches returned by the fetcher.
    pub matches_fetched: usize,
    /// Matches whose datapoints were written.
    pub matches_processed: usize,
    /// Watermark after the run.
    pub watermark: Option<Watermark>,
    /// Aggregates after the run.
    pub stats: PlayerStats,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
}

/// What a finished run produced, before it is wrapped into a summary.
#[derive(Debug)]
struct RunOutcome {
    mode: RunMode,
    fetched: usize,
    checkpoint: Checkpoint,
}

/// Mutable bookkeeping of a run in flight.
#[derive(Debug)]
struct RunProgress {
    phase: RunPhase,
    processed: usize,
}

impl RunProgress {
    fn enter(&mut self, phase: RunPhase) {
        tracing::debug!(from = %self.phase, to = %phase, "run phase");
        self.phase = phase;
    }
}

/// Runs syncs for individual players.
///
/// Holds no per-run state: concurrent runs for the same player are safe
/// because datapoint writes are idempotent and the checkpoint save is a
/// compare-and-swap. The loser of a race fails with
/// [`SyncError::CheckpointConflict`] and the next run picks up from the
/// winner's watermark.
#[derive(Debug, Clone)]
pub struct SyncService {
    store: Arc<dyn CheckpointStore>,
    fetcher: CompletedMatchFetcher,
    emitter: DatapointEmitter,
    monitor: Arc<dyn PipelineMonitor>,
    namespace: String,
    pipeline_prefix: String,
}

impl SyncService {
    /// Creates a new `SyncService`.
    #[must_use]
    pub fn new(
        store: Arc<dyn CheckpointStore>,
        fetcher: CompletedMatchFetcher,
        emitter: DatapointEmitter,
        monitor: Arc<dyn PipelineMonitor>,
        config: &SyncConfig,
    ) -> Self {
        Self {
            store,
            fetcher,
            emitter,
            monitor,
            namespace: config.series_namespace.clone(),
            pipeline_prefix: config.pipeline_prefix.clone(),
        }
    }

    /// Extraction pipeline a run for `username` reports to when the request
    /// names none.
    #[must_use]
    pub fn default_pipeline_id(&self, username: &str) -> String {
        format!("{}{username}", self.pipeline_prefix)
    }

    /// Stored checkpoint of `username`, or the zero checkpoint if the
    /// player has never been synced.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Persistence`] if the store cannot be read.
    pub async fn checkpoint(&self, username: &str) -> Result<Checkpoint, SyncError> {
        Ok(self
            .store
            .load(username)
            .await?
            .unwrap_or_else(|| Checkpoint::zero(username)))
    }

    /// Deletes the stored checkpoint so the next run starts from scratch.
    /// Returns `false` if there was nothing to delete.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Persistence`] if the store cannot be written.
    pub async fn reset_checkpoint(&self, username: &str) -> Result<bool, SyncError> {
        let removed = self.store.reset(username).await?;
        tracing::warn!(username, removed, "checkpoint reset");
        Ok(removed)
    }

    /// Performs one run and reports its outcome to pipeline monitoring.
    ///
    /// # Errors
    ///
    /// Returns the error that moved the run to `Failed`:
    /// [`SyncError::InvalidRequest`] for a start after the end,
    /// [`SyncError::OrderingViolation`] for out-of-order or duplicate
    /// matches, [`SyncError::CheckpointConflict`] if another run advanced
    /// the checkpoint first, or any fetch, write or persistence error that
    /// survived the retry policy.
    pub async fn run(&self, username: &str, request: &RunRequest) -> Result<RunSummary, SyncError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let pipeline_id = request
            .pipeline_id
            .clone()
            .unwrap_or_else(|| self.default_pipeline_id(username));
        let mut progress = RunProgress {
            phase: RunPhase::Init,
            processed: 0,
        };

        let span = tracing::info_span!("sync_run", %run_id, username, mode = ?request.mode());
        let outcome = self
            .execute(username, request, &mut progress)
            .instrument(span)
            .await;

        let report = match &outcome {
            Ok(done) => {
                tracing::info!(
                    %run_id,
                    username,
                    fetched = done.fetched,
                    processed = progress.processed,
                    "sync run done"
                );
                RunReport {
                    pipeline_id: pipeline_id.clone(),
                    status: RunStatus::Success,
                    message: format!(
                        "processed {} of {} matches",
                        progress.processed, done.fetched
                    ),
                    matches_processed: progress.processed,
                    reported_at: Utc::now(),
                }
            }
            Err(err) => {
                let failed_in = progress.phase;
                progress.enter(RunPhase::Failed);
                tracing::error!(
                    %run_id,
                    username,
                    phase = %failed_in,
                    processed = progress.processed,
                    classification = err.classification(),
                    error = %err,
                    "sync run failed"
                );
                RunReport {
                    pipeline_id: pipeline_id.clone(),
                    status: RunStatus::Failure,
                    message: format!("{} during {failed_in}: {err}", err.classification()),
                    matches_processed: progress.processed,
                    reported_at: Utc::now(),
                }
            }
        };

        if let Err(err) = self.monitor.report_run(&report).await {
            tracing::warn!(%run_id, pipeline = %pipeline_id, error = %err, "failed to report run");
        }

        let done = outcome?;
        Ok(RunSummary {
            run_id,
            username: username.to_string(),
            mode: done.mode,
            pipeline_id,
            matches_fetched: done.fetched,
            matches_processed: progress.processed,
            watermark: done.checkpoint.watermark,
            stats: done.checkpoint.stats,
            started_at,
            finished_at: Utc::now(),
        })
    }

    async fn execute(
        &self,
        username: &str,
        request: &RunRequest,
        progress: &mut RunProgress,
    ) -> Result<RunOutcome, SyncError> {
        if let (Some(start), Some(end)) = (request.start_time, request.end_time)
            && start > end
        {
            return Err(SyncError::InvalidRequest(format!(
                "start-time {start} is after end-time {end}"
            )));
        }
        let mode = request.mode();

        progress.enter(RunPhase::LoadingCheckpoint);
        let checkpoint = self
            .store
            .load(username)
            .await?
            .unwrap_or_else(|| Checkpoint::zero(username));
        let expected = checkpoint.watermark;

        progress.enter(RunPhase::Fetching);
        // A backfill refolds from the first match so that aggregates stay a
        // function of history no matter how often it is repeated.
        let after = match mode {
            RunMode::Backfill => Cursor::Beginning,
            RunMode::Incremental => expected.map_or(Cursor::Beginning, Cursor::After),
        };
        let window = FetchWindow {
            after,
            until: request.end_time,
            board: request.board,
            ruleset: request.ruleset,
        };
        let matches = self.fetcher.fetch(username, &window).await?;

        progress.enter(RunPhase::Folding);
        validate_order(&matches)?;
        let (seed, first) = match request.start_time {
            Some(start) => (
                PlayerStats::default(),
                replay_start(&matches, start, expected.as_ref()),
            ),
            None => (checkpoint.stats, 0),
        };
        let (_, events) = fold_all(&seed, &matches);

        progress.enter(RunPhase::Emitting);
        let catalog = SeriesCatalog::new(&self.namespace, username);
        let mut emit_error = None;
        for event in events.get(first..).unwrap_or(&[]) {
            if let Err(err) = self.emitter.emit(&catalog, event).await {
                emit_error = Some(err);
                break;
            }
            progress.processed += 1;
        }

        // Partial progress after a failed write is saved while the run is
        // still in the emitting phase.
        if emit_error.is_none() {
            progress.enter(RunPhase::AdvancingCheckpoint);
        }
        let processed = progress.processed;
        let last = processed.checked_sub(1).map(|i| first + i);
        let mut current = checkpoint;
        if let (Some(last_match), Some(last_event)) = (
            last.and_then(|i| matches.get(i)),
            last.and_then(|i| events.get(i)),
        ) {
            let reached = Watermark::of(last_match);
            if expected.is_none_or(|wm| reached > wm) {
                let next = Checkpoint {
                    username: username.to_string(),
                    watermark: Some(reached),
                    stats: last_event.stats,
                    updated_at: Utc::now(),
                };
                if let Some(err) = &emit_error {
                    tracing::warn!(
                        processed,
                        error = %err,
                        "emission stopped early, saving partial progress"
                    );
                }
                self.store.save(&next, expected.as_ref()).await?;
                current = next;
            } else {
                tracing::debug!(
                    processed,
                    "replay ended at or before the watermark, checkpoint unchanged"
                );
            }
        }

        if let Some(err) = emit_error {
            return Err(err);
        }

        progress.enter(RunPhase::Done);
        Ok(RunOutcome {
            mode,
            fetched: matches.len(),
            checkpoint: current,
        })
    }
}

/// Checks that `matches` are strictly increasing by `(finish_time,
/// match_id)` and that no match id appears twice.
fn validate_order(matches: &[Match]) -> Result<(), SyncError> {
    let mut seen = HashSet::with_capacity(matches.len());
    for m in matches {
        if !seen.insert(m.match_id) {
            return Err(SyncError::OrderingViolation(format!(
                "match {} returned more than once",
                m.match_id
            )));
        }
    }
    for pair in matches.windows(2) {
        if let [prev, next] = pair
            && prev.sort_key() >= next.sort_key()
        {
            return Err(SyncError::OrderingViolation(format!(
                "match {} at {} does not follow match {} at {}",
                next.match_id, next.finish_time, prev.match_id, prev.finish_time
            )));
        }
    }
    Ok(())
}

/// Index of the first match a backfill starting at `start` re-emits.
///
/// Matches finished after `start` are replayed, and so is everything past
/// the stored watermark, so a start later than the watermark never skips
/// matches no run has written yet.
fn replay_start(matches: &[Match], start: DateTime<Utc>, watermark: Option<&Watermark>) -> usize {
    matches.partition_point(|m| {
        m.finish_time <= start && watermark.is_some_and(|wm| Watermark::of(m) <= *wm)
    })
}
