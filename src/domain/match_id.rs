//! Type-safe match identifier.
//!
//! [`MatchId`] wraps the numeric game id assigned by the game platform so
//! that match identifiers cannot be confused with other integers (ratings,
//! counters, timestamps).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a finished (or in-progress) match on the game platform.
///
/// Ids are assigned by the platform and are only used as a tie-breaker
/// when two matches share the same finish time, so ordering on the raw
/// integer is sufficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchId(i64);

impl MatchId {
    /// Creates a `MatchId` from the platform's numeric id.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw numeric id.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for MatchId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<MatchId> for i64 {
    fn from(id: MatchId) -> Self {
        id.0
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn orders_by_numeric_value() {
        assert!(MatchId::new(9) < MatchId::new(10));
        assert_eq!(MatchId::from(7).get(), 7);
    }

    #[test]
    fn serializes_as_plain_number() {
        let json = serde_json::to_string(&MatchId::new(4242)).ok();
        assert_eq!(json.as_deref(), Some("4242"));

        let Ok(back) = serde_json::from_str::<MatchId>("4242") else {
            panic!("deserialization failed");
        };
        assert_eq!(back, MatchId::new(4242));
    }

    #[test]
    fn display_is_numeric() {
        assert_eq!(MatchId::new(-3).to_string(), "-3");
    }
}
