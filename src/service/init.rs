//! Initializer: creates a player's series and extraction pipeline.

use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::SeriesCatalog;
use crate::error::SyncError;
use crate::retry::RetryPolicy;
use crate::sink::{CreateOutcome, PipelineMonitor, PipelineSpec, TimeSeriesBackend};

/// Result of [`Initializer::initialize`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct InitReport {
    /// Player the objects were created for.
    pub username: String,
    /// External ids of series created by this call.
    pub created: Vec<String>,
    /// External ids of series that already existed.
    pub existing: Vec<String>,
    /// Extraction pipeline id.
    pub pipeline_id: String,
    /// Whether the pipeline was created by this call.
    pub pipeline_created: bool,
}

/// Creates the backend objects a player's sync writes to.
///
/// Safe to call repeatedly: objects that already exist are left alone.
#[derive(Debug, Clone)]
pub struct Initializer {
    backend: Arc<dyn TimeSeriesBackend>,
    monitor: Arc<dyn PipelineMonitor>,
    retry: RetryPolicy,
    namespace: String,
    data_set_id: Option<i64>,
}

impl Initializer {
    /// Creates an initializer writing to `backend` and `monitor`.
    #[must_use]
    pub fn new(
        backend: Arc<dyn TimeSeriesBackend>,
        monitor: Arc<dyn PipelineMonitor>,
        retry: RetryPolicy,
        namespace: &str,
        data_set_id: Option<i64>,
    ) -> Self {
        Self {
            backend,
            monitor,
            retry,
            namespace: namespace.to_string(),
            data_set_id,
        }
    }

    /// Creates the six series of `username` and the extraction pipeline
    /// `pipeline_id`.
    ///
    /// # Errors
    ///
    /// Returns the first creation error that survives the retry policy.
    pub async fn initialize(
        &self,
        username: &str,
        pipeline_id: &str,
    ) -> Result<InitReport, SyncError> {
        let catalog = SeriesCatalog::new(&self.namespace, username);
        let mut created = Vec::new();
        let mut existing = Vec::new();
        for descriptor in catalog.descriptors(self.data_set_id) {
            let outcome = self
                .retry
                .run("create_series", || self.backend.create_series(&descriptor))
                .await?;
            match outcome {
                CreateOutcome::Created => created.push(descriptor.external_id),
                CreateOutcome::AlreadyExists => existing.push(descriptor.external_id),
            }
        }

        let spec = PipelineSpec {
            external_id: pipeline_id.to_string(),
            name: format!("Wordfeud extractor - {username}"),
            description: format!(
                "Syncs finished Wordfeud matches of {username} into step time series"
            ),
            data_set_id: self.data_set_id,
        };
        let pipeline = self
            .retry
            .run("create_pipeline", || self.monitor.ensure_pipeline(&spec))
            .await?;

        tracing::info!(
            username,
            created = created.len(),
            existing = existing.len(),
            pipeline = pipeline_id,
            "initialized series and pipeline"
        );
        Ok(InitReport {
            username: username.to_string(),
            created,
            existing,
            pipeline_id: spec.external_id,
            pipeline_created: pipeline == CreateOutcome::Created,
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::sink::{InMemoryMonitor, InMemoryTimeSeries};

    #[tokio::test]
    async fn second_initialize_finds_everything_in_place() {
        let backend = Arc::new(InMemoryTimeSeries::new());
        let monitor = Arc::new(InMemoryMonitor::new());
        let init = Initializer::new(
            Arc::clone(&backend) as Arc<dyn TimeSeriesBackend>,
            Arc::clone(&monitor) as Arc<dyn PipelineMonitor>,
            RetryPolicy::no_retry(),
            "WORDFEUD",
            Some(42),
        );

        let Ok(first) = init.initialize("anne", "extractors/wordfeud-anne").await else {
            panic!("first initialize should succeed");
        };
        assert_eq!(first.created.len(), 6);
        assert!(first.pipeline_created);

        let Ok(second) = init.initialize("anne", "extractors/wordfeud-anne").await else {
            panic!("second initialize should succeed");
        };
        assert!(second.created.is_empty());
        assert_eq!(second.existing.len(), 6);
        assert!(!second.pipeline_created);

        let Ok(listed) = backend.list_series("WORDFEUD/anne/").await else {
            panic!("list should succeed");
        };
        assert!(listed.iter().all(|s| s.is_step && s.data_set_id == Some(42)));
        assert_eq!(monitor.pipelines().await.len(), 1);
    }
}
