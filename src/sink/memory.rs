//! In-memory step-series backend.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CreateOutcome, Datapoint, DeleteOutcome, TimeSeriesBackend};
use crate::domain::SeriesDescriptor;
use crate::error::SyncError;

#[derive(Debug, Clone)]
struct StoredSeries {
    descriptor: SeriesDescriptor,
    points: BTreeMap<i64, Datapoint>,
}

/// Time-series backend held in memory.
///
/// Each series keeps at most one datapoint per timestamp, which gives the
/// step-series idempotency the emitter relies on. Writing to a series that
/// was never created creates it implicitly with a bare descriptor.
/// Write failures can be injected with [`InMemoryTimeSeries::fail_writes_after`].
#[derive(Debug, Default)]
pub struct InMemoryTimeSeries {
    series: RwLock<HashMap<String, StoredSeries>>,
    writes: RwLock<u64>,
    fail_after: RwLock<Option<(u64, SyncError)>>,
}

impl InMemoryTimeSeries {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every write after the first `successes` writes fail with `err`
    /// until [`InMemoryTimeSeries::heal`] is called.
    pub async fn fail_writes_after(&self, successes: u64, err: SyncError) {
        let done = *self.writes.read().await;
        *self.fail_after.write().await = Some((done.saturating_add(successes), err));
    }

    /// Clears any injected write failure.
    pub async fn heal(&self) {
        *self.fail_after.write().await = None;
    }

    /// All datapoints of a series, ordered by timestamp.
    pub async fn datapoints(&self, external_id: &str) -> Vec<Datapoint> {
        self.series
            .read()
            .await
            .get(external_id)
            .map(|s| s.points.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns `true` if a series with this external id exists.
    pub async fn contains(&self, external_id: &str) -> bool {
        self.series.read().await.contains_key(external_id)
    }

    /// Number of successful write calls so far.
    pub async fn write_count(&self) -> u64 {
        *self.writes.read().await
    }
}

#[async_trait]
impl TimeSeriesBackend for InMemoryTimeSeries {
    async fn create_series(&self, series: &SeriesDescriptor) -> Result<CreateOutcome, SyncError> {
        let mut map = self.series.write().await;
        if map.contains_key(&series.external_id) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        map.insert(
            series.external_id.clone(),
            StoredSeries {
                descriptor: series.clone(),
                points: BTreeMap::new(),
            },
        );
        Ok(CreateOutcome::Created)
    }

    async fn write_datapoint(&self, external_id: &str, point: &Datapoint) -> Result<(), SyncError> {
        let mut writes = self.writes.write().await;
        if let Some((limit, err)) = self.fail_after.read().await.as_ref()
            && *writes >= *limit
        {
            return Err(err.clone());
        }

        let mut map = self.series.write().await;
        let stored = map
            .entry(external_id.to_string())
            .or_insert_with(|| StoredSeries {
                descriptor: SeriesDescriptor {
                    external_id: external_id.to_string(),
                    name: external_id.to_string(),
                    unit: String::new(),
                    is_step: true,
                    data_set_id: None,
                },
                points: BTreeMap::new(),
            });
        stored.points.insert(point.timestamp, point.clone());
        *writes = writes.saturating_add(1);
        Ok(())
    }

    async fn delete_series(&self, external_id: &str) -> Result<DeleteOutcome, SyncError> {
        Ok(match self.series.write().await.remove(external_id) {
            Some(_) => DeleteOutcome::Deleted,
            None => DeleteOutcome::AlreadyAbsent,
        })
    }

    async fn list_series(&self, prefix: &str) -> Result<Vec<SeriesDescriptor>, SyncError> {
        let map = self.series.read().await;
        let mut listed: Vec<SeriesDescriptor> = map
            .values()
            .filter(|s| s.descriptor.external_id.starts_with(prefix))
            .map(|s| s.descriptor.clone())
            .collect();
        listed.sort_by(|a, b| a.external_id.cmp(&b.external_id));
        Ok(listed)
    }
}
