//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::service::{CleanupWorkflow, Initializer, SyncService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Player this instance syncs.
    pub username: Arc<str>,
    /// Sync engine.
    pub sync_service: Arc<SyncService>,
    /// Series and pipeline creation.
    pub initializer: Arc<Initializer>,
    /// Series deletion.
    pub cleanup: Arc<CleanupWorkflow>,
}
