//! # Scoring Configuration
//!
//! All weights and thresholds the engine reads at call time. Nothing here
//! is compiled into the scoring path, so profiles can be swapped without
//! redeploying logic.
//!
//! - Defaults for every field, calibrated on the source platform's
//!   observed viral growth patterns.
//! - Partial updates: a patch supplies only the changed fields; weights
//!   merge key-by-key, everything else field-by-field. The merge is an
//!   explicit, tested function rather than implicit struct-spread rules.
//! - Loads from a JSON file with fallback to defaults on any error.

use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Weights over the seven scoring terms.
///
/// This is a free-form linear model: the terms are not required to sum
/// to 1 and no normalization is applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    /// Base play velocity (lifetime plays per day).
    pub plays_per_day: f64,
    /// Short-term play velocity over the recent window.
    pub recent_velocity: f64,
    /// Performance relative to the artist's own per-track average.
    pub relative_performance: f64,
    /// Direct user engagement (favorites per day).
    pub favorites: f64,
    /// Network propagation signal (reposts per day).
    pub reposts: f64,
    /// Growth acceleration multiplier.
    pub momentum: f64,
    /// Viral spread multiplier.
    pub viral_coefficient: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            // Core metrics (60% total)
            plays_per_day: 0.25,
            recent_velocity: 0.20,
            relative_performance: 0.15,
            // Engagement signals (25% total)
            favorites: 0.15,
            reposts: 0.10,
            // Growth patterns (15% total)
            momentum: 0.10,
            viral_coefficient: 0.05,
        }
    }
}

/// Full engine configuration. Construct via [`Default`], a JSON file, or
/// by merging a [`TrendingConfigPatch`] over an existing value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingConfig {
    /// Days considered "recent" for short-term velocity.
    pub recent_window: f64,
    /// Age in days at which the decay base reaches 50%.
    pub decay_midpoint: f64,
    /// Steepness of the decay curve.
    pub decay_steepness: f64,
    /// Window for momentum calculation, in hours.
    pub momentum_window: f64,
    /// Z-score threshold the repost/favorite blend must clear for a
    /// viral boost.
    pub burst_threshold: f64,
    /// Hard exclusion floor: items below this play count are dropped
    /// before any population statistics are computed.
    pub min_plays: u64,
    /// Numeric floor for a field's spread; below it the field's z-scores
    /// resolve to 0.
    pub min_std_dev: f64,
    /// Cap on the viral boost multiplier.
    pub viral_multiplier: f64,
    /// Weights for the multi-factor score.
    pub weights: ScoreWeights,
}

impl Default for TrendingConfig {
    fn default() -> Self {
        Self {
            recent_window: 7.0,
            decay_midpoint: 7.0,
            decay_steepness: 0.5,
            momentum_window: 24.0,
            burst_threshold: 2.0,
            min_plays: 100,
            min_std_dev: 0.0001,
            viral_multiplier: 1.5,
            weights: ScoreWeights::default(),
        }
    }
}

impl TrendingConfig {
    /// Load configuration from a JSON file holding a (possibly partial)
    /// config; missing fields keep their defaults.
    /// Falls back to plain defaults on any read or parse error.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(path) {
            Ok(s) => match serde_json::from_str::<TrendingConfigPatch>(&s) {
                Ok(patch) => Self::default().merged(&patch),
                Err(_) => Self::default(),
            },
            Err(_) => Self::default(),
        }
    }

    /// Return a new config with the patch's supplied fields replacing the
    /// current ones. Weights merge key-by-key; unspecified fields are left
    /// untouched.
    pub fn merged(&self, patch: &TrendingConfigPatch) -> Self {
        Self {
            recent_window: patch.recent_window.unwrap_or(self.recent_window),
            decay_midpoint: patch.decay_midpoint.unwrap_or(self.decay_midpoint),
            decay_steepness: patch.decay_steepness.unwrap_or(self.decay_steepness),
            momentum_window: patch.momentum_window.unwrap_or(self.momentum_window),
            burst_threshold: patch.burst_threshold.unwrap_or(self.burst_threshold),
            min_plays: patch.min_plays.unwrap_or(self.min_plays),
            min_std_dev: patch.min_std_dev.unwrap_or(self.min_std_dev),
            viral_multiplier: patch.viral_multiplier.unwrap_or(self.viral_multiplier),
            weights: match &patch.weights {
                Some(w) => self.weights.merged(w),
                None => self.weights,
            },
        }
    }
}

impl ScoreWeights {
    /// Key-by-key merge: only the supplied weights change.
    pub fn merged(&self, patch: &ScoreWeightsPatch) -> Self {
        Self {
            plays_per_day: patch.plays_per_day.unwrap_or(self.plays_per_day),
            recent_velocity: patch.recent_velocity.unwrap_or(self.recent_velocity),
            relative_performance: patch
                .relative_performance
                .unwrap_or(self.relative_performance),
            favorites: patch.favorites.unwrap_or(self.favorites),
            reposts: patch.reposts.unwrap_or(self.reposts),
            momentum: patch.momentum.unwrap_or(self.momentum),
            viral_coefficient: patch.viral_coefficient.unwrap_or(self.viral_coefficient),
        }
    }
}

/// Partial configuration: only the fields to change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendingConfigPatch {
    pub recent_window: Option<f64>,
    pub decay_midpoint: Option<f64>,
    pub decay_steepness: Option<f64>,
    pub momentum_window: Option<f64>,
    pub burst_threshold: Option<f64>,
    pub min_plays: Option<u64>,
    pub min_std_dev: Option<f64>,
    pub viral_multiplier: Option<f64>,
    pub weights: Option<ScoreWeightsPatch>,
}

/// Partial weights map: only the keys to change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeightsPatch {
    pub plays_per_day: Option<f64>,
    pub recent_velocity: Option<f64>,
    pub relative_performance: Option<f64>,
    pub favorites: Option<f64>,
    pub reposts: Option<f64>,
    pub momentum: Option<f64>,
    pub viral_coefficient: Option<f64>,
}
