//! # Metrics Deriver
//! Turns raw records into per-item derived features: age, lifetime and
//! recent-window velocities, artist-relative performance, and the time
//! decay factor. Scoring fields are left at their neutral placeholders
//! for the engine to fill in.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::TrendingConfig;
use crate::model::{TrackRecord, TrendingMetrics};
use crate::stats;

/// Age floor in days; avoids division by zero for items released at (or
/// after) the pass timestamp.
pub const MIN_DAYS_OLD: f64 = 0.001;

const MILLIS_PER_DAY: f64 = 1000.0 * 60.0 * 60.0 * 24.0;

/// Derive per-item metrics for a batch.
///
/// Items with `plays < min_plays` are excluded entirely before any
/// population statistics are computed — exclusion, not down-weighting —
/// and the batch is truncated to `limit` afterwards. Survivors keep their
/// input order.
pub fn derive_metrics(
    records: &[TrackRecord],
    now: DateTime<Utc>,
    config: &TrendingConfig,
    limit: usize,
) -> Vec<TrendingMetrics> {
    let metrics: Vec<TrendingMetrics> = records
        .iter()
        .filter(|r| r.plays >= config.min_plays)
        .take(limit)
        .map(|r| derive_one(r, now, config))
        .collect();

    debug!(
        input = records.len(),
        derived = metrics.len(),
        min_plays = config.min_plays,
        "derived batch metrics"
    );
    metrics
}

fn derive_one(record: &TrackRecord, now: DateTime<Utc>, config: &TrendingConfig) -> TrendingMetrics {
    let age_ms = (now - record.release_date).num_milliseconds() as f64;
    let days_old = (age_ms / MILLIS_PER_DAY).max(MIN_DAYS_OLD);

    let plays = record.plays as f64;
    let favorites = record.favorites as f64;
    let reposts = record.reposts as f64;

    let plays_per_day = plays / days_old;
    let favorites_per_day = favorites / days_old;
    let reposts_per_day = reposts / days_old;

    // An item younger than the recent window has its entire lifetime
    // counted as "recent".
    let recent_days = days_old.min(config.recent_window);
    let recent_plays_velocity = plays / recent_days;
    let recent_favorites_velocity = favorites / recent_days;
    let recent_reposts_velocity = reposts / recent_days;

    let relative_performance = plays / artist_avg_plays(record).max(1.0);

    let time_decay_factor =
        stats::sigmoid_decay(days_old, config.decay_midpoint, config.decay_steepness);

    TrendingMetrics {
        id: record.id.clone(),
        title: record.title.clone(),
        artist: record.artist.clone(),
        plays: record.plays,
        favorites: record.favorites,
        reposts: record.reposts,
        release_date: record.release_date,
        days_old,
        external_rank: record.external_rank,
        plays_per_day,
        favorites_per_day,
        reposts_per_day,
        recent_plays_velocity,
        recent_favorites_velocity,
        recent_reposts_velocity,
        relative_performance,
        momentum: 1.0,
        viral_coefficient: 1.0,
        normalized_score: 0.0,
        time_decay_factor,
        trending_score: 0.0,
        computed_rank: 0,
    }
}

/// Artist's average plays per track. Zero or missing aggregates fall back
/// to a neutral average of 1.
fn artist_avg_plays(record: &TrackRecord) -> f64 {
    match record.artist_stats {
        Some(s) => s.total_play_count.max(1) as f64 / s.track_count.max(1) as f64,
        None => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ArtistStats;
    use chrono::Duration;

    fn record(id: &str, plays: u64, released_days_ago: i64, now: DateTime<Utc>) -> TrackRecord {
        TrackRecord {
            id: id.to_string(),
            title: format!("title-{id}"),
            artist: "artist".to_string(),
            plays,
            favorites: 10,
            reposts: 2,
            release_date: now - Duration::days(released_days_ago),
            artist_stats: Some(ArtistStats {
                total_play_count: 1000,
                track_count: 10,
            }),
            external_rank: None,
        }
    }

    fn now() -> DateTime<Utc> {
        "2026-08-27T00:00:00Z".parse().unwrap()
    }

    #[test]
    fn velocities_divide_by_age() {
        let cfg = TrendingConfig::default();
        let m = derive_metrics(&[record("a", 1000, 10, now())], now(), &cfg, 100);
        let m = &m[0];

        assert!((m.days_old - 10.0).abs() < 1e-9);
        assert!((m.plays_per_day - 100.0).abs() < 1e-6);
        assert!((m.favorites_per_day - 1.0).abs() < 1e-6);
        // 10 days old, 7-day window: recent velocity over 7 days.
        assert!((m.recent_plays_velocity - 1000.0 / 7.0).abs() < 1e-6);
    }

    #[test]
    fn young_items_count_whole_lifetime_as_recent() {
        let cfg = TrendingConfig::default();
        let m = derive_metrics(&[record("a", 700, 2, now())], now(), &cfg, 100);
        assert_eq!(m[0].recent_plays_velocity, m[0].plays_per_day);
    }

    #[test]
    fn age_is_floored_for_brand_new_items() {
        let cfg = TrendingConfig::default();
        let mut r = record("a", 500, 0, now());
        r.release_date = now(); // released this instant
        let m = derive_metrics(&[r], now(), &cfg, 100);
        assert_eq!(m[0].days_old, MIN_DAYS_OLD);
        assert!(m[0].plays_per_day.is_finite());
    }

    #[test]
    fn relative_performance_uses_artist_average() {
        let cfg = TrendingConfig::default();
        // Artist averages 100 plays/track; this track has 500.
        let m = derive_metrics(&[record("a", 500, 5, now())], now(), &cfg, 100);
        assert!((m[0].relative_performance - 5.0).abs() < 1e-9);
    }

    #[test]
    fn missing_artist_stats_fall_back_to_neutral_average() {
        let cfg = TrendingConfig::default();
        let mut r = record("a", 500, 5, now());
        r.artist_stats = None;
        let m = derive_metrics(&[r], now(), &cfg, 100);
        assert!((m[0].relative_performance - 500.0).abs() < 1e-9);
    }

    #[test]
    fn min_plays_is_a_hard_exclusion_boundary() {
        let cfg = TrendingConfig::default(); // min_plays = 100
        let records = vec![
            record("below", cfg.min_plays - 1, 5, now()),
            record("at", cfg.min_plays, 5, now()),
            record("above", cfg.min_plays + 1, 5, now()),
        ];
        let m = derive_metrics(&records, now(), &cfg, 100);
        let ids: Vec<&str> = m.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["at", "above"]);
    }

    #[test]
    fn limit_truncates_after_exclusion() {
        let cfg = TrendingConfig::default();
        let records = vec![
            record("skip", 1, 5, now()),
            record("a", 200, 5, now()),
            record("b", 300, 5, now()),
            record("c", 400, 5, now()),
        ];
        let m = derive_metrics(&records, now(), &cfg, 2);
        let ids: Vec<&str> = m.iter().map(|m| m.id.as_str()).collect();
        // The excluded record does not consume a slot.
        assert_eq!(ids, vec!["a", "b"]);
    }
}
