//! Data Transfer Objects for REST request/response serialization.
//!
//! Timestamps in requests are epoch milliseconds and request field names
//! are kebab-case, matching the scheduled-function payload format.

pub mod checkpoint_dto;
pub mod series_dto;
pub mod sync_dto;

pub use checkpoint_dto::*;
pub use series_dto::*;
pub use sync_dto::*;
