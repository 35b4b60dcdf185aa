//! # Data Model
//! Caller-supplied item records, the per-item derived metrics, and the
//! per-field population statistics table.
//!
//! Shape validation of upstream records is the caller's responsibility;
//! everything arriving here is assumed well-formed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::stats;

/// Aggregate totals for the item's artist, used for artist-relative
/// performance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistStats {
    pub total_play_count: u64,
    pub track_count: u64,
}

/// One raw engagement record, immutable for the duration of a pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub plays: u64,
    pub favorites: u64,
    pub reposts: u64,
    pub release_date: DateTime<Utc>,
    /// Artist aggregates; absent aggregates fall back to a neutral
    /// per-track average of 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist_stats: Option<ArtistStats>,
    /// Reference ordering from the upstream platform (1-based), used only
    /// for offline rank-correlation diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_rank: Option<usize>,
}

/// Derived metrics for one item, filled in over the course of a pass:
/// velocities at derivation time, z-score-based factors at scoring time,
/// `computed_rank` after the final sort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingMetrics {
    pub id: String,
    pub title: String,
    pub artist: String,

    // Raw counters, echoed for explainability.
    pub plays: u64,
    pub favorites: u64,
    pub reposts: u64,
    pub release_date: DateTime<Utc>,
    pub days_old: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_rank: Option<usize>,

    // Velocity metrics.
    pub plays_per_day: f64,
    pub favorites_per_day: f64,
    pub reposts_per_day: f64,
    pub recent_plays_velocity: f64,
    pub recent_favorites_velocity: f64,
    pub recent_reposts_velocity: f64,

    // Growth and context.
    pub relative_performance: f64,
    pub momentum: f64,
    pub viral_coefficient: f64,

    // Scores.
    pub normalized_score: f64,
    pub time_decay_factor: f64,
    pub trending_score: f64,
    /// 1-based position after the final descending sort; 0 until ranked.
    pub computed_rank: usize,
}

/// The derived fields that get population statistics. Five of them feed
/// z-scores; the two extra recent velocities appear only in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricField {
    PlaysPerDay,
    FavoritesPerDay,
    RepostsPerDay,
    RecentPlaysVelocity,
    RecentFavoritesVelocity,
    RecentRepostsVelocity,
    RelativePerformance,
}

impl MetricField {
    pub const ALL: [MetricField; 7] = [
        MetricField::PlaysPerDay,
        MetricField::FavoritesPerDay,
        MetricField::RepostsPerDay,
        MetricField::RecentPlaysVelocity,
        MetricField::RecentFavoritesVelocity,
        MetricField::RecentRepostsVelocity,
        MetricField::RelativePerformance,
    ];

    /// Stable field name used as the cache key and in diagnostics output.
    pub fn name(self) -> &'static str {
        match self {
            MetricField::PlaysPerDay => "plays_per_day",
            MetricField::FavoritesPerDay => "favorites_per_day",
            MetricField::RepostsPerDay => "reposts_per_day",
            MetricField::RecentPlaysVelocity => "recent_plays_velocity",
            MetricField::RecentFavoritesVelocity => "recent_favorites_velocity",
            MetricField::RecentRepostsVelocity => "recent_reposts_velocity",
            MetricField::RelativePerformance => "relative_performance",
        }
    }

    /// Extract this field's value from a derived metric.
    pub fn value(self, m: &TrendingMetrics) -> f64 {
        match self {
            MetricField::PlaysPerDay => m.plays_per_day,
            MetricField::FavoritesPerDay => m.favorites_per_day,
            MetricField::RepostsPerDay => m.reposts_per_day,
            MetricField::RecentPlaysVelocity => m.recent_plays_velocity,
            MetricField::RecentFavoritesVelocity => m.recent_favorites_velocity,
            MetricField::RecentRepostsVelocity => m.recent_reposts_velocity,
            MetricField::RelativePerformance => m.relative_performance,
        }
    }
}

/// Robust population statistics for one derived field across a batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricStats {
    /// Batch median.
    pub median: f64,
    /// Robust standard deviation: MAD rescaled by [`stats::MAD_TO_STD`].
    pub std_dev: f64,
    /// 10% two-sided trimmed mean.
    pub mean: f64,
    pub skewness: f64,
    pub kurtosis: f64,
    pub min: f64,
    pub max: f64,
}

impl MetricStats {
    /// Compute the full statistics table for one field's batch values.
    pub fn from_values(values: &[f64]) -> Result<Self> {
        let median = stats::median(values);
        let mad = stats::mad(values, Some(median));
        let std_dev = mad * stats::MAD_TO_STD;
        let mean = stats::trimmed_mean(values, stats::DEFAULT_TRIM_PERCENT)?;

        Ok(Self {
            median,
            std_dev,
            mean,
            skewness: stats::skewness(values, mean, std_dev),
            kurtosis: stats::kurtosis(values, mean, std_dev),
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
    }

    /// Recover the raw MAD from the rescaled spread.
    pub fn mad(&self) -> f64 {
        self.std_dev / stats::MAD_TO_STD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_table_uses_robust_spread() {
        let values = [1.0, 2.0, 3.0, 4.0, 1000.0];
        let s = MetricStats::from_values(&values).unwrap();

        assert_eq!(s.median, 3.0);
        // MAD of the spiked batch is 1.0; the outlier barely registers.
        assert!((s.std_dev - stats::MAD_TO_STD).abs() < 1e-12);
        assert!((s.mad() - 1.0).abs() < 1e-12);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 1000.0);
        assert!(s.skewness > 0.0, "right-skewed batch");
    }

    #[test]
    fn field_names_are_unique() {
        let mut names: Vec<_> = MetricField::ALL.iter().map(|f| f.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), MetricField::ALL.len());
    }

    #[test]
    fn track_record_deserializes_without_optionals() {
        let json = r#"{
            "id": "t1",
            "title": "Song",
            "artist": "Artist",
            "plays": 100,
            "favorites": 5,
            "reposts": 1,
            "release_date": "2026-08-20T00:00:00Z"
        }"#;
        let r: TrackRecord = serde_json::from_str(json).unwrap();
        assert_eq!(r.artist_stats, None);
        assert_eq!(r.external_rank, None);
    }
}
