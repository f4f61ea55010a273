//! Pipeline-monitoring collaborator: extraction pipelines and run reports.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use super::CreateOutcome;
use crate::error::SyncError;

/// Final status of a run as reported to monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Run reached `Done`.
    Success,
    /// Run reached `Failed`.
    Failure,
}

impl RunStatus {
    /// Returns the status as a static string slice.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

/// One run report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// Extraction pipeline the run belongs to.
    pub pipeline_id: String,
    /// Outcome.
    pub status: RunStatus,
    /// Human-readable summary or error message.
    pub message: String,
    /// Matches whose datapoints were written during the run.
    pub matches_processed: usize,
    /// When the run finished.
    pub reported_at: DateTime<Utc>,
}

/// Definition of an extraction pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineSpec {
    /// Stable external id.
    pub external_id: String,
    /// Display name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Optional data set.
    pub data_set_id: Option<i64>,
}

/// Reports run outcomes to the monitoring service.
#[async_trait]
pub trait PipelineMonitor: Send + Sync + std::fmt::Debug {
    /// Creates the extraction pipeline if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns a [`SyncError`] if the monitoring service rejects the call.
    async fn ensure_pipeline(&self, spec: &PipelineSpec) -> Result<CreateOutcome, SyncError>;

    /// Records one run.
    ///
    /// # Errors
    ///
    /// Returns a [`SyncError`] if the report cannot be delivered.
    async fn report_run(&self, report: &RunReport) -> Result<(), SyncError>;
}

/// Monitor that only logs, used when no monitoring backend is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMonitor;

#[async_trait]
impl PipelineMonitor for LogMonitor {
    async fn ensure_pipeline(&self, spec: &PipelineSpec) -> Result<CreateOutcome, SyncError> {
        tracing::info!(pipeline = %spec.external_id, "extraction pipeline registered (log only)");
        Ok(CreateOutcome::Created)
    }

    async fn report_run(&self, report: &RunReport) -> Result<(), SyncError> {
        match report.status {
            RunStatus::Success => tracing::info!(
                pipeline = %report.pipeline_id,
                processed = report.matches_processed,
                message = %report.message,
                "run report"
            ),
            RunStatus::Failure => tracing::warn!(
                pipeline = %report.pipeline_id,
                processed = report.matches_processed,
                message = %report.message,
                "run report"
            ),
        }
        Ok(())
    }
}

/// Monitor that keeps everything in memory, for tests.
#[derive(Debug, Default)]
pub struct InMemoryMonitor {
    pipelines: RwLock<Vec<PipelineSpec>>,
    reports: RwLock<Vec<RunReport>>,
}

impl InMemoryMonitor {
    /// Creates an empty monitor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All reports received so far, oldest first.
    pub async fn reports(&self) -> Vec<RunReport> {
        self.reports.read().await.clone()
    }

    /// All registered pipelines.
    pub async fn pipelines(&self) -> Vec<PipelineSpec> {
        self.pipelines.read().await.clone()
    }
}

#[async_trait]
impl PipelineMonitor for InMemoryMonitor {
    async fn ensure_pipeline(&self, spec: &PipelineSpec) -> Result<CreateOutcome, SyncError> {
        let mut pipelines = self.pipelines.write().await;
        if pipelines.iter().any(|p| p.external_id == spec.external_id) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        pipelines.push(spec.clone());
        Ok(CreateOutcome::Created)
    }

    async fn report_run(&self, report: &RunReport) -> Result<(), SyncError> {
        self.reports.write().await.push(report.clone());
        Ok(())
    }
}
