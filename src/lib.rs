//! # wordfeud-sync
//!
//! Incremental, idempotent sync of a Wordfeud player's match history into
//! step time series.
//!
//! Each run loads the player's checkpoint, fetches the completed matches
//! past its watermark, folds them into running aggregates and writes one
//! datapoint per metric per match at the match's finish time. The
//! checkpoint only advances after the datapoints are written, with a
//! compare-and-swap save, so overlapping or repeated runs are harmless.
//!
//! ## Architecture
//!
//! ```text
//! Triggers (HTTP api/, scheduler)
//!     │
//!     ├── SyncService, Initializer, CleanupWorkflow (service/)
//!     │
//!     ├── CompletedMatchFetcher ── MatchSource (source/)
//!     ├── accumulator, series catalog (domain/)
//!     ├── DatapointEmitter ── TimeSeriesBackend, PipelineMonitor (sink/)
//!     │
//!     └── CheckpointStore: PostgreSQL or in-memory (persistence/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod credentials;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod retry;
pub mod scheduler;
pub mod service;
pub mod sink;
pub mod source;
