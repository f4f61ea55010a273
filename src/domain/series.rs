//! Series catalog: the six step series kept per player.
//!
//! External ids are derived deterministically from the namespace and the
//! username (`<NAMESPACE>/<username>/<metric>`), so every component can
//! address a player's series without a lookup.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Default namespace prefix for external ids.
pub const DEFAULT_NAMESPACE: &str = "WORDFEUD";

/// One of the six tracked metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Current rating.
    Rating,
    /// Total matches played.
    GamesPlayed,
    /// Total matches won.
    GamesWon,
    /// Fraction of matches won.
    WinRate,
    /// Signed win/loss streak.
    CurrentStreak,
    /// Highest rating reached.
    BestRating,
}

impl Metric {
    /// All metrics in catalog order.
    pub const ALL: [Self; 6] = [
        Self::Rating,
        Self::GamesPlayed,
        Self::GamesWon,
        Self::WinRate,
        Self::CurrentStreak,
        Self::BestRating,
    ];

    /// Suffix used in the external id.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rating => "rating",
            Self::GamesPlayed => "games_played",
            Self::GamesWon => "games_won",
            Self::WinRate => "win_rate",
            Self::CurrentStreak => "current_streak",
            Self::BestRating => "best_rating",
        }
    }

    /// Human-readable metric name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Rating => "Rating",
            Self::GamesPlayed => "Games Played",
            Self::GamesWon => "Games Won",
            Self::WinRate => "Win Rate",
            Self::CurrentStreak => "Current Streak",
            Self::BestRating => "Best Rating",
        }
    }

    /// Unit recorded on the series.
    #[must_use]
    pub const fn unit(self) -> &'static str {
        match self {
            Self::Rating | Self::BestRating => "rating",
            Self::GamesPlayed | Self::GamesWon | Self::CurrentStreak => "count",
            Self::WinRate => "ratio",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Definition of a single series as it is created in the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SeriesDescriptor {
    /// Stable external id.
    pub external_id: String,
    /// Display name.
    pub name: String,
    /// Unit of the values.
    pub unit: String,
    /// Always `true`: values hold until the next write.
    pub is_step: bool,
    /// Optional data set the series belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_set_id: Option<i64>,
}

/// The six series of one player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesCatalog {
    namespace: String,
    username: String,
}

impl SeriesCatalog {
    /// Catalog for `username` under `namespace`.
    #[must_use]
    pub fn new(namespace: &str, username: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            username: username.to_string(),
        }
    }

    /// Player the catalog belongs to.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Prefix shared by every external id in the catalog, including the
    /// trailing slash.
    #[must_use]
    pub fn prefix(&self) -> String {
        format!("{}/{}/", self.namespace, self.username)
    }

    /// External id of `metric`'s series.
    #[must_use]
    pub fn external_id(&self, metric: Metric) -> String {
        format!("{}{}", self.prefix(), metric.as_str())
    }

    /// Descriptor for `metric`'s series.
    #[must_use]
    pub fn descriptor(&self, metric: Metric, data_set_id: Option<i64>) -> SeriesDescriptor {
        SeriesDescriptor {
            external_id: self.external_id(metric),
            name: format!("Wordfeud {} - {}", metric.label(), self.username),
            unit: metric.unit().to_string(),
            is_step: true,
            data_set_id,
        }
    }

    /// Descriptors for all six series, in catalog order.
    #[must_use]
    pub fn descriptors(&self, data_set_id: Option<i64>) -> Vec<SeriesDescriptor> {
        Metric::ALL
            .into_iter()
            .map(|metric| self.descriptor(metric, data_set_id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_ids_follow_namespace_user_metric() {
        let catalog = SeriesCatalog::new(DEFAULT_NAMESPACE, "anne");
        assert_eq!(catalog.external_id(Metric::Rating), "WORDFEUD/anne/rating");
        assert_eq!(
            catalog.external_id(Metric::CurrentStreak),
            "WORDFEUD/anne/current_streak"
        );
        assert_eq!(catalog.prefix(), "WORDFEUD/anne/");
    }

    #[test]
    fn descriptors_cover_all_six_metrics() {
        let catalog = SeriesCatalog::new(DEFAULT_NAMESPACE, "anne");
        let descriptors = catalog.descriptors(Some(42));
        assert_eq!(descriptors.len(), 6);
        assert!(descriptors.iter().all(|d| d.is_step));
        assert!(descriptors.iter().all(|d| d.data_set_id == Some(42)));
        assert!(
            descriptors
                .iter()
                .any(|d| d.name == "Wordfeud Best Rating - anne" && d.unit == "rating")
        );
    }

    #[test]
    fn ids_are_deterministic() {
        let a = SeriesCatalog::new("NS", "bo");
        let b = SeriesCatalog::new("NS", "bo");
        assert_eq!(a.descriptors(None), b.descriptors(None));
    }
}
