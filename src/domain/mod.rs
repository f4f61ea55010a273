//! Domain layer: matches, checkpoints, the metric accumulator and the
//! series catalog.
//!
//! Nothing in this module performs I/O.

pub mod accumulator;
pub mod checkpoint;
pub mod game_match;
pub mod match_id;
pub mod series;

pub use accumulator::{DerivedEvent, EventMetadata, fold, fold_all};
pub use checkpoint::{Checkpoint, PlayerStats, Watermark};
pub use game_match::{BoardType, Match, MatchResult, RuleSet};
pub use match_id::MatchId;
pub use series::{DEFAULT_NAMESPACE, Metric, SeriesCatalog, SeriesDescriptor};
