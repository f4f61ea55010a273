//! Sinks: the time-series backend and the pipeline-monitoring service.
//!
//! Both are external collaborators reached through traits so the sync
//! engine can run against the HTTP backend in production and in-memory
//! doubles in tests.

pub mod cdf;
pub mod memory;
pub mod monitor;

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::{EventMetadata, SeriesDescriptor};
use crate::error::SyncError;

pub use cdf::CdfClient;
pub use memory::InMemoryTimeSeries;
pub use monitor::{InMemoryMonitor, LogMonitor, PipelineMonitor, PipelineSpec, RunReport, RunStatus};

/// One value written to one series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Datapoint {
    /// Event time in epoch milliseconds.
    pub timestamp: i64,
    /// Metric value.
    pub value: f64,
    /// Context of the match the value was derived from.
    pub metadata: EventMetadata,
}

/// Result of creating a series or pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CreateOutcome {
    /// Newly created.
    Created,
    /// An object with the same external id already existed.
    AlreadyExists,
}

/// Result of deleting a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    /// The series existed and was deleted.
    Deleted,
    /// There was nothing to delete.
    AlreadyAbsent,
}

/// Time-series storage.
///
/// Writes are idempotent per `(external_id, timestamp)`: writing the same
/// value at the same timestamp again leaves the series unchanged, and a
/// different value replaces the old one instead of adding a second step.
#[async_trait]
pub trait TimeSeriesBackend: Send + Sync + std::fmt::Debug {
    /// Creates a step series.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::TransientWrite`] on retryable failures, or
    /// [`SyncError::Auth`] / [`SyncError::Backend`] otherwise.
    async fn create_series(&self, series: &SeriesDescriptor) -> Result<CreateOutcome, SyncError>;

    /// Writes one datapoint.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::TransientWrite`] on retryable failures, or
    /// [`SyncError::Auth`] / [`SyncError::Backend`] otherwise.
    async fn write_datapoint(&self, external_id: &str, point: &Datapoint) -> Result<(), SyncError>;

    /// Deletes a series and all its datapoints.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::TransientWrite`] on retryable failures, or
    /// [`SyncError::Auth`] / [`SyncError::Backend`] otherwise.
    async fn delete_series(&self, external_id: &str) -> Result<DeleteOutcome, SyncError>;

    /// Lists series whose external id starts with `prefix`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::TransientWrite`] on retryable failures, or
    /// [`SyncError::Auth`] / [`SyncError::Backend`] otherwise.
    async fn list_series(&self, prefix: &str) -> Result<Vec<SeriesDescriptor>, SyncError>;
}
