//! In-memory checkpoint store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{CheckpointStore, describe};
use crate::domain::{Checkpoint, Watermark};
use crate::error::SyncError;

/// Checkpoint store backed by a `RwLock<HashMap>`.
///
/// The compare-and-swap check and the write happen under a single write
/// lock, so concurrent saves for the same player serialize and the loser
/// observes a conflict.
#[derive(Debug, Default)]
pub struct InMemoryCheckpointStore {
    checkpoints: RwLock<HashMap<String, Checkpoint>>,
}

impl InMemoryCheckpointStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored checkpoints.
    pub async fn len(&self) -> usize {
        self.checkpoints.read().await.len()
    }

    /// Returns `true` if no checkpoint is stored.
    pub async fn is_empty(&self) -> bool {
        self.checkpoints.read().await.is_empty()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn load(&self, username: &str) -> Result<Option<Checkpoint>, SyncError> {
        Ok(self.checkpoints.read().await.get(username).cloned())
    }

    async fn save(
        &self,
        checkpoint: &Checkpoint,
        expected: Option<&Watermark>,
    ) -> Result<(), SyncError> {
        let mut map = self.checkpoints.write().await;
        let stored = map.get(&checkpoint.username).and_then(|cp| cp.watermark);
        if stored.as_ref() != expected {
            return Err(SyncError::CheckpointConflict {
                username: checkpoint.username.clone(),
                detail: format!(
                    "expected watermark {}, found {}",
                    describe(expected),
                    describe(stored.as_ref())
                ),
            });
        }
        let mut record = checkpoint.clone();
        record.updated_at = Utc::now();
        map.insert(record.username.clone(), record);
        Ok(())
    }

    async fn reset(&self, username: &str) -> Result<bool, SyncError> {
        Ok(self.checkpoints.write().await.remove(username).is_some())
    }
}
