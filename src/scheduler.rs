//! In-process scheduler for incremental runs.
//!
//! Ticks on a fixed period and runs one incremental sync per tick. Ticks
//! missed while a run is still going are skipped, so runs never stack up.
//! A failed run is logged and reported by the orchestrator; the scheduler
//! keeps going and the next tick retries from the stored watermark.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

use crate::service::{RunRequest, SyncService};

/// Spawns the scheduler loop. It stops when `shutdown` flips to `true` or
/// its sender is dropped.
pub fn spawn(
    service: Arc<SyncService>,
    username: Arc<str>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = interval(period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(username = %username, period_secs = period.as_secs(), "scheduler started");

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    // Outcome is already logged and reported by the service.
                    let _ = service.run(&username, &RunRequest::default()).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!(username = %username, "scheduler stopped");
    })
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use crate::persistence::{CheckpointStore, InMemoryCheckpointStore};
    use crate::retry::RetryPolicy;
    use crate::service::DatapointEmitter;
    use crate::sink::{InMemoryMonitor, InMemoryTimeSeries, PipelineMonitor, TimeSeriesBackend};
    use crate::source::{CompletedMatchFetcher, InMemoryMatchSource, MatchSource};

    #[tokio::test]
    async fn runs_on_every_tick_until_shutdown() {
        let monitor = Arc::new(InMemoryMonitor::new());
        let service = SyncService::new(
            Arc::new(InMemoryCheckpointStore::new()) as Arc<dyn CheckpointStore>,
            CompletedMatchFetcher::new(
                Arc::new(InMemoryMatchSource::new()) as Arc<dyn MatchSource>,
                RetryPolicy::no_retry(),
            ),
            DatapointEmitter::new(
                Arc::new(InMemoryTimeSeries::new()) as Arc<dyn TimeSeriesBackend>,
                RetryPolicy::no_retry(),
            ),
            Arc::clone(&monitor) as Arc<dyn PipelineMonitor>,
            &SyncConfig::default(),
        );
        let (stop, shutdown) = watch::channel(false);
        let handle = spawn(
            Arc::new(service),
            Arc::from("anne"),
            Duration::from_millis(10),
            shutdown,
        );

        tokio::time::sleep(Duration::from_millis(55)).await;
        let _ = stop.send(true);
        tokio_test::assert_ok!(handle.await);

        let runs = monitor.reports().await.len();
        assert!(runs >= 2, "expected several scheduled runs, got {runs}");
    }
}
