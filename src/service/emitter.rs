//! Datapoint emitter: writes one derived event to the six series.

use std::sync::Arc;

use crate::domain::{DerivedEvent, Metric, SeriesCatalog};
use crate::error::SyncError;
use crate::retry::RetryPolicy;
use crate::sink::{Datapoint, TimeSeriesBackend};

/// Turns derived events into datapoints on a player's series.
///
/// Every write is retried on its own, so a transient failure halfway
/// through an event only repeats the failed write. Repeating a whole event
/// is also safe because the backend keeps one value per timestamp.
#[derive(Debug, Clone)]
pub struct DatapointEmitter {
    backend: Arc<dyn TimeSeriesBackend>,
    retry: RetryPolicy,
}

impl DatapointEmitter {
    /// Creates an emitter writing to `backend`.
    #[must_use]
    pub fn new(backend: Arc<dyn TimeSeriesBackend>, retry: RetryPolicy) -> Self {
        Self { backend, retry }
    }

    /// Writes the six metric values of `event` at the event's finish time.
    ///
    /// # Errors
    ///
    /// Returns the first write error that survives the retry policy. Writes
    /// for metrics after the failing one are not attempted.
    pub async fn emit(
        &self,
        catalog: &SeriesCatalog,
        event: &DerivedEvent,
    ) -> Result<(), SyncError> {
        let timestamp = event.timestamp.timestamp_millis();
        for metric in Metric::ALL {
            let external_id = catalog.external_id(metric);
            let point = Datapoint {
                timestamp,
                value: event.value(metric),
                metadata: event.metadata.clone(),
            };
            self.retry
                .run("write_datapoint", || self.backend.write_datapoint(&external_id, &point))
                .await?;
        }
        tracing::debug!(
            username = catalog.username(),
            match_id = %event.metadata.match_id,
            timestamp,
            "emitted datapoints"
        );
        Ok(())
    }
}
