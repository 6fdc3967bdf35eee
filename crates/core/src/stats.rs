//! Pure derivations from [`StatsAggregate`] to chart-ready series.
//!
//! Nothing here performs I/O or keeps state. Every helper accepts an absent
//! aggregate and returns an empty series for it.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{DeveloperScore, StatsAggregate, NOT_AVAILABLE};

/// One labelled value of a chart series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint<V = u64> {
    /// Axis or slice label.
    pub label: String,
    /// Plotted value.
    pub value: V,
}

impl<V> SeriesPoint<V> {
    /// Build a point.
    pub fn new(label: impl Into<String>, value: V) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

/// Turn a `key -> count` map into a series in the map's iteration order.
pub fn frequency_series<'a, I>(counts: I) -> Vec<SeriesPoint>
where
    I: IntoIterator<Item = (&'a String, &'a u64)>,
{
    counts
        .into_iter()
        .map(|(label, value)| SeriesPoint::new(label.as_str(), *value))
        .collect()
}

/// Turn a `key -> average` map into a series, relabelling each key.
pub fn average_series<'a, I, L>(averages: I, relabel: L) -> Vec<SeriesPoint<f64>>
where
    I: IntoIterator<Item = (&'a String, &'a f64)>,
    L: Fn(&str) -> &str,
{
    averages
        .into_iter()
        .map(|(label, value)| SeriesPoint::new(relabel(label.as_str()), *value))
        .collect()
}

/// Month counts sorted chronologically. Keys are `YYYY-MM`, so a
/// lexicographic sort is chronological.
pub fn month_series<'a, I>(counts: I) -> Vec<SeriesPoint>
where
    I: IntoIterator<Item = (&'a String, &'a u64)>,
{
    let mut series = frequency_series(counts);
    series.sort_by(|a, b| a.label.cmp(&b.label));
    series
}

fn counts_of(
    stats: Option<&StatsAggregate>,
    pick: impl Fn(&StatsAggregate) -> &BTreeMap<String, u64>,
) -> Vec<SeriesPoint> {
    stats.map(|stats| frequency_series(pick(stats))).unwrap_or_default()
}

/// Completions per platform, raw platform names.
pub fn platform_series(stats: Option<&StatsAggregate>) -> Vec<SeriesPoint> {
    counts_of(stats, |stats| &stats.platform_counts)
}

/// Completions per year.
pub fn year_series(stats: Option<&StatsAggregate>) -> Vec<SeriesPoint> {
    counts_of(stats, |stats| &stats.year_counts)
}

/// Completions per rating/category.
pub fn category_series(stats: Option<&StatsAggregate>) -> Vec<SeriesPoint> {
    counts_of(stats, |stats| &stats.category_counts)
}

/// Completions per month, oldest first.
pub fn completion_months(stats: Option<&StatsAggregate>) -> Vec<SeriesPoint> {
    stats
        .map(|stats| month_series(&stats.month_counts))
        .unwrap_or_default()
}

/// Games per metascore bucket, lowest bucket first.
pub fn metascore_histogram(stats: Option<&StatsAggregate>) -> Vec<SeriesPoint> {
    let mut series = counts_of(stats, |stats| &stats.metascore_histogram);
    series.sort_by_key(|point| bucket_order(&point.label));
    series
}

/// Sort key for bucket labels such as `<50`, `50-59` or `90-100`: the first
/// number in the label, with `<N` placed just before `N`. Labels without a
/// number go last, in their existing order.
fn bucket_order(label: &str) -> (u32, bool) {
    let trimmed = label.trim();
    let digits: String = trimmed
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    match digits.parse::<u32>() {
        Ok(bound) => (bound, !trimmed.starts_with('<')),
        Err(_) => (u32::MAX, true),
    }
}

/// Average metascore per platform, with short platform labels.
pub fn avg_metascore_by_platform(stats: Option<&StatsAggregate>) -> Vec<SeriesPoint<f64>> {
    stats
        .map(|stats| average_series(&stats.avg_metascore_by_platform, shorten_platform))
        .unwrap_or_default()
}

/// Share of 90+ games per platform, with short platform labels.
pub fn must_play_by_platform(stats: Option<&StatsAggregate>) -> Vec<SeriesPoint<f64>> {
    stats
        .map(|stats| average_series(&stats.must_play_pct_by_platform, shorten_platform))
        .unwrap_or_default()
}

/// Developer ranking exactly as the backend ordered it.
pub fn top_developers(stats: Option<&StatsAggregate>) -> &[DeveloperScore] {
    stats
        .map(|stats| stats.top_devs_by_metascore.as_slice())
        .unwrap_or(&[])
}

/// Every chart the dashboard draws, derived in one pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSeries {
    /// Completions per platform.
    pub platforms: Vec<SeriesPoint>,
    /// Completions per year.
    pub years: Vec<SeriesPoint>,
    /// Completions per category.
    pub categories: Vec<SeriesPoint>,
    /// Completions per month, oldest first.
    pub months: Vec<SeriesPoint>,
    /// Games per metascore bucket.
    pub metascore_histogram: Vec<SeriesPoint>,
    /// Average metascore per platform.
    pub avg_metascore_by_platform: Vec<SeriesPoint<f64>>,
    /// Must-play share per platform.
    pub must_play_by_platform: Vec<SeriesPoint<f64>>,
    /// Backend developer ranking.
    pub top_developers: Vec<DeveloperScore>,
}

impl ChartSeries {
    /// Derive all series; `None` yields empty series everywhere.
    pub fn derive(stats: Option<&StatsAggregate>) -> Self {
        Self {
            platforms: platform_series(stats),
            years: year_series(stats),
            categories: category_series(stats),
            months: completion_months(stats),
            metascore_histogram: metascore_histogram(stats),
            avg_metascore_by_platform: avg_metascore_by_platform(stats),
            must_play_by_platform: must_play_by_platform(stats),
            top_developers: top_developers(stats).to_vec(),
        }
    }

    /// Whether there is nothing to plot.
    pub fn is_empty(&self) -> bool {
        self.platforms.is_empty()
            && self.years.is_empty()
            && self.categories.is_empty()
            && self.months.is_empty()
            && self.metascore_histogram.is_empty()
            && self.avg_metascore_by_platform.is_empty()
            && self.must_play_by_platform.is_empty()
            && self.top_developers.is_empty()
    }
}

/// Short display label for a platform name. Rules are checked in order,
/// case-insensitively, and the first substring match wins.
pub fn shorten_platform(name: &str) -> &str {
    const RULES: &[(&[&str], &str)] = &[
        (&["nintendo"], "Switch"),
        (&["playstation 5", "ps5"], "PS5"),
        (&["playstation 4", "ps4"], "PS4"),
        (&["xbox"], "Xbox"),
        (&["pc"], "PC"),
    ];

    let lower = name.to_lowercase();
    RULES
        .iter()
        .find(|(needles, _)| needles.iter().any(|needle| lower.contains(needle)))
        .map(|(_, short)| *short)
        .unwrap_or(name)
}

/// Critic-score severity tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MetascoreTier {
    /// 90 and above.
    MustPlay,
    /// 80-89.
    Great,
    /// 70-79.
    Good,
    /// Below 70.
    Average,
}

impl MetascoreTier {
    /// Tier for a 0-100 score; lower bounds are inclusive.
    pub fn classify(score: u8) -> Self {
        match score {
            90..=u8::MAX => Self::MustPlay,
            80..=89 => Self::Great,
            70..=79 => Self::Good,
            _ => Self::Average,
        }
    }

    /// Stable tier name.
    pub fn label(self) -> &'static str {
        match self {
            Self::MustPlay => "must-play",
            Self::Great => "great",
            Self::Good => "good",
            Self::Average => "unrated/average",
        }
    }

    /// Badge colour as `#RRGGBB`.
    pub fn color(self) -> &'static str {
        match self {
            Self::MustPlay => "#00C853",
            Self::Great => "#2196F3",
            Self::Good => "#FB8C00",
            Self::Average => "#9E9E9E",
        }
    }
}

/// What to show in a game row's score column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetascoreBadge {
    /// Score digits or `N/A`.
    pub text: String,
    /// Tier when a score exists.
    pub tier: Option<MetascoreTier>,
}

impl MetascoreBadge {
    /// Badge for an optional score. A zero score means "not scored" and
    /// renders like a missing one.
    pub fn from_score(score: Option<u8>) -> Self {
        match score.filter(|score| *score > 0) {
            Some(score) => Self {
                text: score.to_string(),
                tier: Some(MetascoreTier::classify(score)),
            },
            None => Self {
                text: NOT_AVAILABLE.to_string(),
                tier: None,
            },
        }
    }
}
