//! # Robust Statistics
//! Pure numeric helpers for heavy-tailed engagement distributions.
//!
//! Play/favorite/repost counts are heavily right-skewed (a viral track can
//! sit 100-1000x above the median), so ordinary mean/std-dev statistics
//! collapse: one outlier drags the mean past most of the batch. Everything
//! here is built around median/MAD instead, which keep a 50% breakdown
//! point. No state, no I/O; suitable for unit tests and offline evaluation.

use crate::error::{Error, Result};

/// Rescales MAD into an estimator consistent with the standard deviation
/// under a normal distribution, so familiar z-score thresholds still apply.
pub const MAD_TO_STD: f64 = 1.4826;

/// Spread below this is treated as numerically zero (near-constant batch).
pub const NEAR_ZERO_STD: f64 = 1e-10;

/// Kurtosis of the normal distribution; the neutral fallback value.
pub const NORMAL_KURTOSIS: f64 = 3.0;

/// Share trimmed from each tail by the default trimmed mean.
pub const DEFAULT_TRIM_PERCENT: f64 = 10.0;

/// Sub-1 exponent applied to the sigmoid base; flattens the curve so items
/// that keep earning engagement decay slower than the raw sigmoid.
pub const SUSTAINED_ENGAGEMENT_FACTOR: f64 = 0.8;

/// Velocity floor used by [`momentum`] to avoid dividing by zero.
pub const MIN_VELOCITY: f64 = 0.001;

/// Repost share of the viral blend. Reposts are weighted higher than
/// favorites as a second-order network-propagation signal.
pub const REPOST_BLEND_WEIGHT: f64 = 0.7;

/// Favorite share of the viral blend.
pub const FAVORITE_BLEND_WEIGHT: f64 = 0.3;

/// Slope converting an above-threshold viral blend into a boost.
pub const VIRAL_BOOST_RATE: f64 = 0.1;

/// Median of a sample: middle element, or the average of the two middle
/// elements for even-length input. Returns 0 for an empty slice.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

/// Median Absolute Deviation around `center` (or the computed median when
/// `None`). Dispersion with a 50% breakdown point, versus 0% for std dev.
pub fn mad(values: &[f64], center: Option<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let med = center.unwrap_or_else(|| median(values));
    let deviations: Vec<f64> = values.iter().map(|v| (v - med).abs()).collect();
    median(&deviations)
}

/// Mean after discarding `trim_percent`% of the sample from each tail.
///
/// Returns 0 for an empty slice; fails with
/// [`Error::InvalidTrimPercent`] when `trim_percent` is outside `[0, 50]`.
pub fn trimmed_mean(values: &[f64], trim_percent: f64) -> Result<f64> {
    if values.is_empty() {
        return Ok(0.0);
    }
    if !(0.0..=50.0).contains(&trim_percent) {
        return Err(Error::InvalidTrimPercent(trim_percent));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let trim = (sorted.len() as f64 * (trim_percent / 100.0)).floor() as usize;
    let kept = &sorted[trim..sorted.len() - trim];
    if kept.is_empty() {
        return Ok(0.0);
    }

    Ok(kept.iter().sum::<f64>() / kept.len() as f64)
}

/// Third standardized moment (asymmetry / heavy-tail detection).
///
/// Returns the neutral 0 when the spread is numerically zero or the sample
/// has fewer than 3 elements, so near-constant batches don't blow up.
pub fn skewness(values: &[f64], mean: f64, std_dev: f64) -> f64 {
    if std_dev.abs() < NEAR_ZERO_STD {
        return 0.0;
    }

    let n = values.len();
    if n < 3 {
        return 0.0;
    }

    let m3 = values.iter().map(|x| (x - mean).powi(3)).sum::<f64>() / n as f64;
    m3 / std_dev.powi(3)
}

/// Fourth standardized moment (distribution shape).
///
/// Returns [`NORMAL_KURTOSIS`] when the spread is numerically zero or the
/// sample has fewer than 4 elements.
pub fn kurtosis(values: &[f64], mean: f64, std_dev: f64) -> f64 {
    if std_dev.abs() < NEAR_ZERO_STD {
        return NORMAL_KURTOSIS;
    }

    let n = values.len();
    if n < 4 {
        return NORMAL_KURTOSIS;
    }

    let m4 = values.iter().map(|x| (x - mean).powi(4)).sum::<f64>() / n as f64;
    m4 / std_dev.powi(4)
}

/// Robust z-score: `(value - median) / (mad * MAD_TO_STD)`.
///
/// Resolves to 0 when `mad < min_mad`, so one degenerate field never
/// aborts scoring for the whole batch.
pub fn robust_z_score(value: f64, median: f64, mad: f64, min_mad: f64) -> f64 {
    if mad < min_mad {
        return 0.0;
    }
    (value - median) / (mad * MAD_TO_STD)
}

/// Spearman rank correlation between two equal-length rank sequences:
/// `1 - 6 * sum(d_i^2) / (n * (n^2 - 1))`.
///
/// Returns 0 for fewer than two pairs; fails with
/// [`Error::RankLengthMismatch`] when the sequences differ in length.
pub fn rank_correlation(ranks_a: &[f64], ranks_b: &[f64]) -> Result<f64> {
    if ranks_a.len() != ranks_b.len() {
        return Err(Error::RankLengthMismatch {
            left: ranks_a.len(),
            right: ranks_b.len(),
        });
    }

    let n = ranks_a.len();
    if n < 2 {
        return Ok(0.0);
    }

    let diff_sum: f64 = ranks_a
        .iter()
        .zip(ranks_b)
        .map(|(a, b)| (a - b).powi(2))
        .sum();

    let n = n as f64;
    Ok(1.0 - (6.0 * diff_sum) / (n * (n * n - 1.0)))
}

/// Sigmoid age decay in `[0, 1]`.
///
/// The base `1 / (1 + e^(steepness * (age - midpoint)))` decreases
/// monotonically in `age` and equals exactly 0.5 at `age == midpoint`;
/// the [`SUSTAINED_ENGAGEMENT_FACTOR`] exponent then flattens the curve.
pub fn sigmoid_decay(age: f64, midpoint: f64, steepness: f64) -> f64 {
    let base = 1.0 / (1.0 + (steepness * (age - midpoint)).exp());
    base.powf(SUSTAINED_ENGAGEMENT_FACTOR)
}

/// Momentum factor from short-window velocity versus lifetime velocity.
///
/// Floored at 1.0: acceleration is rewarded, deceleration is never
/// penalized, and the reward shrinks with `time_decay_factor` as the item
/// ages.
pub fn momentum(recent_velocity: f64, average_velocity: f64, time_decay_factor: f64) -> f64 {
    let safe_avg = average_velocity.max(MIN_VELOCITY);
    let acceleration = (recent_velocity - safe_avg) / safe_avg;

    (1.0 + acceleration * time_decay_factor).max(1.0)
}

/// Viral boost from repost/favorite z-scores.
///
/// The blend `0.7 * reposts_z + 0.3 * favorites_z` must clear `threshold`
/// for any boost at all; below it the coefficient is exactly 1.0. Above
/// it, the boost is capped at `max_multiplier` and scaled by the decay
/// factor.
pub fn viral_coefficient(
    reposts_z: f64,
    favorites_z: f64,
    time_decay_factor: f64,
    threshold: f64,
    max_multiplier: f64,
) -> f64 {
    let viral_spread = reposts_z * REPOST_BLEND_WEIGHT + favorites_z * FAVORITE_BLEND_WEIGHT;
    if viral_spread <= threshold {
        return 1.0;
    }

    (1.0 + viral_spread * VIRAL_BOOST_RATE).min(max_multiplier) * time_decay_factor
}
