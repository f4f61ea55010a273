//! REST endpoint handlers organized by resource.

pub mod checkpoint;
pub mod series;
pub mod sync;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(sync::routes())
        .merge(checkpoint::routes())
        .merge(series::routes())
}
