//! Service layer: the sync engine and the operator workflows around it.
//!
//! [`SyncService`] runs incremental and backfill syncs, emitting through a
//! [`DatapointEmitter`]. [`Initializer`] and [`CleanupWorkflow`] create and
//! remove a player's backend objects.

pub mod cleanup;
pub mod emitter;
pub mod init;
pub mod sync_service;

pub use cleanup::{
    CleanupPlan, CleanupReport, CleanupWorkflow, Confirmer, DeletionStatus, PlannedSeries,
    RequestConfirmation, SeriesDeletion, StaticConfirmation,
};
pub use emitter::DatapointEmitter;
pub use init::{InitReport, Initializer};
pub use sync_service::{RunMode, RunPhase, RunRequest, RunSummary, SyncService};
