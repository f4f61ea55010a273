//! In-memory match source for tests and local runs.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{MatchSource, RawMatch};
use crate::error::SyncError;

/// Match source serving a fixed, mutable set of matches per player.
///
/// Failures can be queued to exercise retry and error paths: each call to
/// [`MatchSource::list_matches`] pops the next queued failure, if any,
/// before answering.
#[derive(Debug, Default)]
pub struct InMemoryMatchSource {
    matches: RwLock<HashMap<String, Vec<RawMatch>>>,
    failures: RwLock<Vec<SyncError>>,
}

impl InMemoryMatchSource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends matches to `username`'s history.
    pub async fn push(&self, username: &str, matches: impl IntoIterator<Item = RawMatch>) {
        self.matches
            .write()
            .await
            .entry(username.to_string())
            .or_default()
            .extend(matches);
    }

    /// Queues a failure for the next call.
    pub async fn fail_next(&self, err: SyncError) {
        self.failures.write().await.insert(0, err);
    }
}

#[async_trait]
impl MatchSource for InMemoryMatchSource {
    async fn list_matches(&self, username: &str) -> Result<Vec<RawMatch>, SyncError> {
        if let Some(err) = self.failures.write().await.pop() {
            return Err(err);
        }
        Ok(self
            .matches
            .read()
            .await
            .get(username)
            .cloned()
            .unwrap_or_default())
    }
}
