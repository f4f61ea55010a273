//! Finished matches as seen by the sync engine.
//!
//! A [`Match`] is read-only input: it is sourced from the game platform,
//! folded into the running aggregates exactly once, and never modified.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::MatchId;

/// Outcome of a match from the synced player's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MatchResult {
    /// The player won.
    Won,
    /// The player lost.
    Lost,
    /// The match ended in a tie.
    Tied,
}

impl MatchResult {
    /// Returns the result as a static string slice.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Won => "won",
            Self::Lost => "lost",
            Self::Tied => "tied",
        }
    }
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Board layout a match was played on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BoardType {
    /// The standard premium-square layout.
    #[serde(alias = "BoardNormal")]
    Normal,
    /// A randomized premium-square layout.
    #[serde(alias = "BoardRandom")]
    Random,
}

impl BoardType {
    /// Returns the board type as a static string slice.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Random => "random",
        }
    }
}

impl fmt::Display for BoardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BoardType {
    type Err = String;

    /// Accepts `normal` / `random` case-insensitively, and the platform's
    /// `BoardNormal` / `BoardRandom` spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        match lower.strip_prefix("board").unwrap_or(&lower) {
            "normal" => Ok(Self::Normal),
            "random" => Ok(Self::Random),
            _ => Err(format!("unknown board type: {s}")),
        }
    }
}

/// Dictionary / tile distribution a match was played with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RuleSet {
    /// American English.
    #[serde(alias = "RuleSetAmerican")]
    American,
    /// Danish.
    #[serde(alias = "RuleSetDanish")]
    Danish,
    /// Dutch.
    #[serde(alias = "RuleSetDutch")]
    Dutch,
    /// British English.
    #[serde(alias = "RuleSetEnglish")]
    English,
    /// French.
    #[serde(alias = "RuleSetFrench")]
    French,
    /// Norwegian.
    #[serde(alias = "RuleSetNorwegian")]
    Norwegian,
    /// Spanish.
    #[serde(alias = "RuleSetSpanish")]
    Spanish,
    /// Swedish.
    #[serde(alias = "RuleSetSwedish")]
    Swedish,
}

impl RuleSet {
    /// Every supported rule set.
    pub const ALL: [Self; 8] = [
        Self::American,
        Self::Danish,
        Self::Dutch,
        Self::English,
        Self::French,
        Self::Norwegian,
        Self::Spanish,
        Self::Swedish,
    ];

    /// Returns the rule set as a static string slice.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::American => "american",
            Self::Danish => "danish",
            Self::Dutch => "dutch",
            Self::English => "english",
            Self::French => "french",
            Self::Norwegian => "norwegian",
            Self::Spanish => "spanish",
            Self::Swedish => "swedish",
        }
    }
}

impl fmt::Display for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleSet {
    type Err = String;

    /// Accepts the lowercase names and the platform's `RuleSet<Name>`
    /// spellings, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        let name = lower.strip_prefix("ruleset").unwrap_or(&lower);
        Self::ALL
            .into_iter()
            .find(|rs| rs.as_str() == name)
            .ok_or_else(|| format!("unknown rule set: {s}"))
    }
}

/// A completed match, ready to be folded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Match {
    /// Platform game id.
    #[schema(value_type = i64)]
    pub match_id: MatchId,
    /// When the match finished. This is the event time of every datapoint
    /// derived from the match.
    pub finish_time: DateTime<Utc>,
    /// Opponent's display name.
    pub opponent: String,
    /// Outcome for the synced player.
    pub result: MatchResult,
    /// Player rating before the match.
    pub rating_before: f64,
    /// Player rating after the match.
    pub rating_after: f64,
    /// Rule set the match was played with.
    pub ruleset: RuleSet,
    /// Board layout the match was played on.
    pub board: BoardType,
}

impl Match {
    /// Sort key used everywhere matches are ordered: finish time first,
    /// match id as the tie-breaker.
    #[must_use]
    pub fn sort_key(&self) -> (DateTime<Utc>, MatchId) {
        (self.finish_time, self.match_id)
    }

    /// Rating change caused by this match.
    #[must_use]
    pub fn rating_delta(&self) -> f64 {
        self.rating_after - self.rating_before
    }
}
