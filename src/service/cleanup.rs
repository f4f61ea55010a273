//! Cleanup workflow: delete a player's series after explicit confirmation.
//!
//! Cleanup is split in two steps. [`CleanupWorkflow::preview`] lists what
//! would be deleted without side effects, and [`CleanupWorkflow::execute`]
//! deletes it only if a [`Confirmer`] approves the plan. Checkpoints are
//! never touched here; resetting one is a separate operator action.

use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::SeriesCatalog;
use crate::error::SyncError;
use crate::retry::RetryPolicy;
use crate::sink::{DeleteOutcome, TimeSeriesBackend};

/// One series the plan would delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PlannedSeries {
    /// External id of the series.
    pub external_id: String,
    /// Whether the series existed when the plan was made.
    pub exists: bool,
}

/// Series that a cleanup would delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CleanupPlan {
    /// Player the series belong to.
    pub username: String,
    /// The player's catalog series, in catalog order.
    pub series: Vec<PlannedSeries>,
}

impl CleanupPlan {
    /// External ids in the plan, in plan order.
    #[must_use]
    pub fn external_ids(&self) -> Vec<&str> {
        self.series.iter().map(|s| s.external_id.as_str()).collect()
    }

    /// Number of planned series that currently exist.
    #[must_use]
    pub fn existing(&self) -> usize {
        self.series.iter().filter(|s| s.exists).count()
    }
}

/// Decides whether a cleanup plan may be executed.
pub trait Confirmer: Send + Sync + std::fmt::Debug {
    /// Returns `true` to go ahead with `plan`.
    fn confirm(&self, plan: &CleanupPlan) -> bool;
}

/// Fixed answer, for tests and unattended tooling.
#[derive(Debug, Clone, Copy)]
pub struct StaticConfirmation(pub bool);

impl Confirmer for StaticConfirmation {
    fn confirm(&self, _plan: &CleanupPlan) -> bool {
        self.0
    }
}

/// Confirmation sent with an HTTP cleanup request.
///
/// Approves only when `confirm` is set and, if the caller echoed the
/// series it previewed, that list still matches the plan exactly.
#[derive(Debug, Clone, Default)]
pub struct RequestConfirmation {
    /// Explicit go-ahead.
    pub confirm: bool,
    /// Series ids from the caller's preview.
    pub expected_series: Option<Vec<String>>,
}

impl Confirmer for RequestConfirmation {
    fn confirm(&self, plan: &CleanupPlan) -> bool {
        self.confirm
            && self
                .expected_series
                .as_ref()
                .is_none_or(|expected| expected.iter().map(String::as_str).eq(plan.external_ids()))
    }
}

/// What happened to one series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeletionStatus {
    /// The series was deleted.
    Deleted,
    /// The series did not exist.
    AlreadyAbsent,
    /// Deleting failed; see the error.
    Failed,
}

/// Per-series result of a cleanup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SeriesDeletion {
    /// External id of the series.
    pub external_id: String,
    /// Outcome.
    pub status: DeletionStatus,
    /// Error message when `status` is `failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of [`CleanupWorkflow::execute`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CleanupReport {
    /// Player the series belong to.
    pub username: String,
    /// Whether the plan was approved. Nothing is deleted otherwise.
    pub confirmed: bool,
    /// One entry per planned series; empty when not confirmed.
    pub series: Vec<SeriesDeletion>,
}

impl CleanupReport {
    /// Number of series with `status`.
    #[must_use]
    pub fn count(&self, status: DeletionStatus) -> usize {
        self.series.iter().filter(|s| s.status == status).count()
    }

    /// Returns `true` if the plan was approved and no deletion failed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.confirmed && self.count(DeletionStatus::Failed) == 0
    }
}

/// Previews and performs series deletion.
#[derive(Debug, Clone)]
pub struct CleanupWorkflow {
    backend: Arc<dyn TimeSeriesBackend>,
    retry: RetryPolicy,
    namespace: String,
}

impl CleanupWorkflow {
    /// Creates a workflow over `backend` for series under `namespace`.
    #[must_use]
    pub fn new(backend: Arc<dyn TimeSeriesBackend>, retry: RetryPolicy, namespace: &str) -> Self {
        Self {
            backend,
            retry,
            namespace: namespace.to_string(),
        }
    }

    /// Lists the series a cleanup of `username` would delete.
    ///
    /// # Errors
    ///
    /// Returns the backend error if listing fails after retries.
    pub async fn preview(&self, username: &str) -> Result<CleanupPlan, SyncError> {
        let catalog = SeriesCatalog::new(&self.namespace, username);
        let prefix = catalog.prefix();
        let listed = self
            .retry
            .run("list_series", || self.backend.list_series(&prefix))
            .await?;

        let series = catalog
            .descriptors(None)
            .into_iter()
            .map(|d| PlannedSeries {
                exists: listed.iter().any(|l| l.external_id == d.external_id),
                external_id: d.external_id,
            })
            .collect();
        Ok(CleanupPlan {
            username: username.to_string(),
            series,
        })
    }

    /// Deletes every series in `plan` if `confirmer` approves it.
    ///
    /// A series that is already gone counts as success. A failed deletion
    /// is recorded in the report and does not stop the others.
    pub async fn execute(&self, plan: &CleanupPlan, confirmer: &dyn Confirmer) -> CleanupReport {
        if !confirmer.confirm(plan) {
            tracing::info!(username = %plan.username, "cleanup declined, nothing deleted");
            return CleanupReport {
                username: plan.username.clone(),
                confirmed: false,
                series: Vec::new(),
            };
        }

        let mut series = Vec::with_capacity(plan.series.len());
        for planned in &plan.series {
            let external_id = planned.external_id.as_str();
            let result = self
                .retry
                .run("delete_series", || self.backend.delete_series(external_id))
                .await;
            let deletion = match result {
                Ok(DeleteOutcome::Deleted) => SeriesDeletion {
                    external_id: external_id.to_string(),
                    status: DeletionStatus::Deleted,
                    error: None,
                },
                Ok(DeleteOutcome::AlreadyAbsent) => SeriesDeletion {
                    external_id: external_id.to_string(),
                    status: DeletionStatus::AlreadyAbsent,
                    error: None,
                },
                Err(err) => {
                    tracing::error!(external_id, error = %err, "failed to delete series");
                    SeriesDeletion {
                        external_id: external_id.to_string(),
                        status: DeletionStatus::Failed,
                        error: Some(err.to_string()),
                    }
                }
            };
            series.push(deletion);
        }

        let report = CleanupReport {
            username: plan.username.clone(),
            confirmed: true,
            series,
        };
        tracing::warn!(
            username = %report.username,
            deleted = report.count(DeletionStatus::Deleted),
            absent = report.count(DeletionStatus::AlreadyAbsent),
            failed = report.count(DeletionStatus::Failed),
            "cleanup executed"
        );
        report
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{BoardType, EventMetadata, MatchId, MatchResult, Metric, RuleSet};
    use crate::sink::{Datapoint, InMemoryTimeSeries};

    async fn seeded_backend(metrics: &[Metric]) -> Arc<InMemoryTimeSeries> {
        let backend = Arc::new(InMemoryTimeSeries::new());
        let catalog = SeriesCatalog::new("WORDFEUD", "anne");
        for metric in metrics {
            let point = Datapoint {
                timestamp: 1_000,
                value: 1.0,
                metadata: EventMetadata {
                    match_id: MatchId::new(1),
                    result: MatchResult::Won,
                    opponent: "bo".to_string(),
                    rating_delta: 1.0,
                    ruleset: RuleSet::Norwegian,
                    board: BoardType::Normal,
                },
            };
            let external_id = catalog.external_id(*metric);
            tokio_test::assert_ok!(backend.write_datapoint(&external_id, &point).await);
        }
        backend
    }

    fn workflow(backend: &Arc<InMemoryTimeSeries>) -> CleanupWorkflow {
        CleanupWorkflow::new(
            Arc::clone(backend) as Arc<dyn TimeSeriesBackend>,
            RetryPolicy::no_retry(),
            "WORDFEUD",
        )
    }

    #[tokio::test]
    async fn preview_flags_existing_series() {
        let backend = seeded_backend(&[Metric::Rating, Metric::WinRate]).await;
        let Ok(plan) = workflow(&backend).preview("anne").await else {
            panic!("preview should succeed");
        };
        assert_eq!(plan.series.len(), 6);
        assert_eq!(plan.existing(), 2);
        assert_eq!(plan.external_ids().first().copied(), Some("WORDFEUD/anne/rating"));
    }

    #[tokio::test]
    async fn declined_plan_deletes_nothing() {
        let backend = seeded_backend(&Metric::ALL).await;
        let cleanup = workflow(&backend);
        let Ok(plan) = cleanup.preview("anne").await else {
            panic!("preview should succeed");
        };
        let report = cleanup.execute(&plan, &StaticConfirmation(false)).await;
        assert!(!report.confirmed);
        assert!(report.series.is_empty());
        assert!(backend.contains("WORDFEUD/anne/rating").await);
    }

    #[tokio::test]
    async fn confirmed_plan_tolerates_absent_series() {
        let backend = seeded_backend(&[Metric::Rating]).await;
        let cleanup = workflow(&backend);
        let Ok(plan) = cleanup.preview("anne").await else {
            panic!("preview should succeed");
        };
        let report = cleanup.execute(&plan, &StaticConfirmation(true)).await;
        assert!(report.is_complete());
        assert_eq!(report.count(DeletionStatus::Deleted), 1);
        assert_eq!(report.count(DeletionStatus::AlreadyAbsent), 5);
        assert!(!backend.contains("WORDFEUD/anne/rating").await);
    }

    #[tokio::test]
    async fn stale_expected_series_is_declined() {
        let backend = seeded_backend(&[Metric::Rating]).await;
        let cleanup = workflow(&backend);
        let Ok(plan) = cleanup.preview("anne").await else {
            panic!("preview should succeed");
        };
        let stale = RequestConfirmation {
            confirm: true,
            expected_series: Some(vec!["WORDFEUD/bo/rating".to_string()]),
        };
        let report = cleanup.execute(&plan, &stale).await;
        assert!(!report.confirmed);
        assert!(backend.contains("WORDFEUD/anne/rating").await);

        let fresh = RequestConfirmation {
            confirm: true,
            expected_series: Some(plan.external_ids().into_iter().map(str::to_string).collect()),
        };
        assert!(fresh.confirm(&plan));
        assert!(!RequestConfirmation::default().confirm(&plan));
    }
}
