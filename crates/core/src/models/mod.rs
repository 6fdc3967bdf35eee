//! Shared domain models.

use std::{collections::BTreeMap, fmt, sync::Arc};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder shown for a missing completion date.
pub const UNKNOWN: &str = "Unknown";
/// Placeholder shown for any other missing field.
pub const NOT_AVAILABLE: &str = "N/A";

/// Opaque token identifying the current state of the backend data source.
///
/// Tokens carry no ordering; any value different from the last one seen
/// means the data changed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionToken(String);

impl VersionToken {
    /// Wrap a raw token string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Body of `GET /version`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionResponse {
    /// Current token.
    pub version: VersionToken,
}

/// One completed game from the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    /// Stable 0-based position in the log.
    pub idx: u32,
    /// Game title.
    pub title: String,
    /// Platform as written in the log (e.g. `Sony PlayStation 5`).
    #[serde(default)]
    pub platform: Option<String>,
    /// Completion date.
    #[serde(default)]
    pub completed_on: Option<NaiveDate>,
    /// Hours played.
    #[serde(default)]
    pub hours: Option<f64>,
    /// Personal rating or category.
    #[serde(default)]
    pub rating: Option<String>,
    /// Developer credit.
    #[serde(default)]
    pub developer: Option<String>,
    /// Critic score, 0-100.
    #[serde(default)]
    pub metascore: Option<u8>,
    /// Platform-specific critic score when the backend enriched one.
    #[serde(default)]
    pub metascore_platform: Option<u8>,
    /// Link to the review page.
    #[serde(default)]
    pub metacritic_url: Option<String>,
    /// Number of critic reviews behind the score.
    #[serde(default)]
    pub metacritic_count: Option<u32>,
}

impl GameRecord {
    /// Minimal record with only the required fields set.
    pub fn new(idx: u32, title: impl Into<String>) -> Self {
        Self {
            idx,
            title: title.into(),
            platform: None,
            completed_on: None,
            hours: None,
            rating: None,
            developer: None,
            metascore: None,
            metascore_platform: None,
            metacritic_url: None,
            metacritic_count: None,
        }
    }

    /// 1-based row number for display.
    pub fn position(&self) -> u32 {
        self.idx + 1
    }

    /// Completion date formatted as `YYYY-MM-DD`, or `Unknown`.
    pub fn completed_label(&self) -> String {
        self.completed_on
            .map(|date| date.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| UNKNOWN.to_string())
    }

    /// Platform name, or `N/A`.
    pub fn platform_label(&self) -> &str {
        text_or_placeholder(self.platform.as_deref())
    }

    /// Hours with at most one decimal, or `N/A`.
    pub fn hours_label(&self) -> String {
        match self.hours {
            Some(hours) if hours.fract() == 0.0 => format!("{hours:.0}"),
            Some(hours) => format!("{hours:.1}"),
            None => NOT_AVAILABLE.to_string(),
        }
    }

    /// Rating/category, or `N/A`.
    pub fn category_label(&self) -> &str {
        text_or_placeholder(self.rating.as_deref())
    }

    /// Developer, or `N/A`.
    pub fn developer_label(&self) -> &str {
        text_or_placeholder(self.developer.as_deref())
    }
}

fn text_or_placeholder(value: Option<&str>) -> &str {
    match value.map(str::trim) {
        Some(value) if !value.is_empty() => value,
        _ => NOT_AVAILABLE,
    }
}

/// Developer entry in the backend's ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeveloperScore {
    /// Developer name.
    pub developer: String,
    /// Average critic score across their logged games.
    pub avg_metascore: f64,
    /// Number of logged games contributing to the average.
    #[serde(default)]
    pub count: u32,
}

/// Aggregate statistics returned by `GET /stats`.
///
/// Every field defaults to empty so a backend that only reports a subset
/// still parses. Ordering for display is imposed by [`crate::stats`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsAggregate {
    /// Completions per platform.
    #[serde(default)]
    pub platform_counts: BTreeMap<String, u64>,
    /// Completions per year (`YYYY`).
    #[serde(default)]
    pub year_counts: BTreeMap<String, u64>,
    /// Completions per rating/category.
    #[serde(default)]
    pub category_counts: BTreeMap<String, u64>,
    /// Completions per month (`YYYY-MM`).
    #[serde(default)]
    pub month_counts: BTreeMap<String, u64>,
    /// Games per metascore bucket (e.g. `80-89`).
    #[serde(default)]
    pub metascore_histogram: BTreeMap<String, u64>,
    /// Average metascore per platform.
    #[serde(default)]
    pub avg_metascore_by_platform: BTreeMap<String, f64>,
    /// Percentage of games scoring 90+ per platform.
    #[serde(default)]
    pub must_play_pct_by_platform: BTreeMap<String, f64>,
    /// Developers ranked by average metascore, best first.
    #[serde(default)]
    pub top_devs_by_metascore: Vec<DeveloperScore>,
}

/// Games and stats drawn from one fetch cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Game rows in backend order.
    pub games: Vec<GameRecord>,
    /// Aggregates from the same cycle.
    pub stats: StatsAggregate,
    /// When the cycle completed.
    pub fetched_at: DateTime<Utc>,
}

impl Snapshot {
    /// Build a snapshot stamped with the current time.
    pub fn new(games: Vec<GameRecord>, stats: StatsAggregate) -> Arc<Self> {
        Arc::new(Self {
            games,
            stats,
            fetched_at: Utc::now(),
        })
    }
}
