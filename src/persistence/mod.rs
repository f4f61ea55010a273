//! Persistence layer: the checkpoint store.
//!
//! Provides the [`CheckpointStore`] trait for durable per-player sync state
//! with an explicit load / compare-and-swap save contract. The production
//! implementation uses `sqlx::PgPool`; [`InMemoryCheckpointStore`] backs
//! tests and runs with persistence disabled.

pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;

use crate::domain::{Checkpoint, Watermark};
use crate::error::SyncError;

pub use memory::InMemoryCheckpointStore;
pub use postgres::PostgresCheckpointStore;

/// Durable storage for [`Checkpoint`]s, one per player.
#[async_trait]
pub trait CheckpointStore: Send + Sync + std::fmt::Debug {
    /// Loads the checkpoint for `username`, `None` if the player has never
    /// been synced (or was reset).
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Persistence`] on storage failure.
    async fn load(&self, username: &str) -> Result<Option<Checkpoint>, SyncError>;

    /// Writes `checkpoint` as one record, but only if the stored watermark
    /// still equals `expected` (a missing record counts as `None`).
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::CheckpointConflict`] when the stored watermark
    /// differs from `expected`, or [`SyncError::Persistence`] on storage
    /// failure.
    async fn save(
        &self,
        checkpoint: &Checkpoint,
        expected: Option<&Watermark>,
    ) -> Result<(), SyncError>;

    /// Deletes the checkpoint for `username`. Returns `true` if one existed.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Persistence`] on storage failure.
    async fn reset(&self, username: &str) -> Result<bool, SyncError>;
}

/// Describes a watermark for conflict messages.
pub(crate) fn describe(watermark: Option<&Watermark>) -> String {
    watermark.map_or_else(
        || "none".to_string(),
        |wm| format!("{} @ {}", wm.match_id, wm.finish_time.to_rfc3339()),
    )
}
