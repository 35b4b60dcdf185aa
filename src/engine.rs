//! # Trending Engine
//! The primary entry point: ingest → derive → population statistics →
//! score → rank → optional validation. A pass is a single synchronous,
//! CPU-only computation over a bounded batch; the only state that
//! survives a call is the statistics cache.
//!
//! Configuration updates replace the whole config value atomically and
//! invalidate the cache, never mutating fields in place, so a concurrent
//! pass can never score against a partially-updated weight map.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cache::StatsCache;
use crate::config::{TrendingConfig, TrendingConfigPatch};
use crate::derive::derive_metrics;
use crate::error::Result;
use crate::instrument;
use crate::model::{MetricField, MetricStats, TrackRecord, TrendingMetrics};
use crate::rank::{self, RankCorrelations};
use crate::stats;

/// Default cap on the number of items considered per pass.
pub const DEFAULT_LIMIT: usize = 100;

/// Per-call options.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzeOptions {
    /// Maximum items to consider (applied after the `min_plays` filter).
    pub limit: usize,
    /// Whether to return population statistics, rank correlations, and
    /// the effective configuration alongside the ranked metrics.
    pub include_stats: bool,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            include_stats: false,
        }
    }
}

/// Result of one scoring pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingReport {
    /// Scored items, sorted by descending trending score, ranks assigned.
    pub metrics: Vec<TrendingMetrics>,
    /// Diagnostics, present only when requested via
    /// [`AnalyzeOptions::include_stats`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<TrendingDiagnostics>,
}

/// Offline-evaluation diagnostics for one pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingDiagnostics {
    pub correlations: RankCorrelations,
    /// Population statistics per derived field.
    pub metric_stats: BTreeMap<String, MetricStats>,
    /// The effective configuration the pass was scored under.
    pub config: TrendingConfig,
}

/// Thread-safe scoring engine. Owns the configuration and the population
/// statistics cache; safe to share across callers.
#[derive(Debug)]
pub struct TrendingEngine {
    config: RwLock<TrendingConfig>,
    cache: StatsCache,
    /// Bumped on every configuration update; cache entries from an older
    /// generation never hit.
    generation: AtomicU64,
}

impl TrendingEngine {
    pub fn new(config: TrendingConfig) -> Self {
        Self {
            config: RwLock::new(config),
            cache: StatsCache::new(),
            generation: AtomicU64::new(0),
        }
    }

    /// Engine with a custom statistics-cache TTL (tests, offline reruns).
    pub fn with_cache_ttl(config: TrendingConfig, ttl: Duration) -> Self {
        Self {
            config: RwLock::new(config),
            cache: StatsCache::with_ttl(ttl),
            generation: AtomicU64::new(0),
        }
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> TrendingConfig {
        self.config
            .read()
            .expect("config rwlock poisoned")
            .clone()
    }

    /// Merge a partial configuration over the current one (weights merge
    /// key-by-key), replace it atomically, and invalidate the statistics
    /// cache wholesale. Returns the new effective configuration.
    pub fn update_config(&self, patch: &TrendingConfigPatch) -> TrendingConfig {
        let next = {
            let mut guard = self.config.write().expect("config rwlock poisoned");
            let next = guard.merged(patch);
            *guard = next.clone();
            next
        };

        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cache.invalidate();
        instrument::config_update();
        info!("configuration updated; statistics cache invalidated");
        next
    }

    /// Score and rank a batch of records as of now.
    pub fn analyze(
        &self,
        records: &[TrackRecord],
        options: &AnalyzeOptions,
    ) -> Result<TrendingReport> {
        self.analyze_at(records, Utc::now(), options)
    }

    /// Score and rank a batch of records as of an explicit timestamp.
    ///
    /// Deterministic: identical records, timestamp, and configuration
    /// produce bit-identical trending scores (population statistics may
    /// come from the cache within its TTL, which computes the same
    /// values).
    pub fn analyze_at(
        &self,
        records: &[TrackRecord],
        now: DateTime<Utc>,
        options: &AnalyzeOptions,
    ) -> Result<TrendingReport> {
        let config = self.config();

        let excluded = records
            .iter()
            .filter(|r| r.plays < config.min_plays)
            .count();
        instrument::tracks_excluded(excluded);

        let mut metrics = derive_metrics(records, now, &config, options.limit);
        if metrics.is_empty() {
            debug!(excluded, "no items survived the min_plays floor");
            return Ok(TrendingReport {
                metrics,
                stats: None,
            });
        }

        let population = self.population_stats(&metrics)?;
        for m in &mut metrics {
            score_one(m, &population, &config);
        }

        rank::assign_ranks(&mut metrics);

        let stats = if options.include_stats {
            let correlations = rank::correlations(&metrics)?;
            let metric_stats = population
                .iter()
                .map(|(field, s)| (field.name().to_string(), *s))
                .collect();
            Some(TrendingDiagnostics {
                correlations,
                metric_stats,
                config: config.clone(),
            })
        } else {
            None
        };

        instrument::scoring_pass(metrics.len());
        debug!(
            scored = metrics.len(),
            excluded,
            include_stats = options.include_stats,
            "scoring pass complete"
        );

        Ok(TrendingReport { metrics, stats })
    }

    /// Population statistics for every derived field, via the cache.
    fn population_stats(
        &self,
        metrics: &[TrendingMetrics],
    ) -> Result<HashMap<MetricField, MetricStats>> {
        let generation = self.generation.load(Ordering::SeqCst);

        let mut population = HashMap::with_capacity(MetricField::ALL.len());
        for field in MetricField::ALL {
            let values: Vec<f64> = metrics.iter().map(|m| field.value(m)).collect();
            let stats = self
                .cache
                .get_or_try_insert(field, generation, || MetricStats::from_values(&values))?;
            population.insert(field, stats);
        }
        Ok(population)
    }
}

impl Default for TrendingEngine {
    fn default() -> Self {
        Self::new(TrendingConfig::default())
    }
}

/// Fill in the z-score-derived factors and the final scores for one item.
fn score_one(
    m: &mut TrendingMetrics,
    population: &HashMap<MetricField, MetricStats>,
    config: &TrendingConfig,
) {
    let z = |field: MetricField, value: f64| {
        let s = &population[&field];
        stats::robust_z_score(value, s.median, s.mad(), config.min_std_dev)
    };

    let plays_z = z(MetricField::PlaysPerDay, m.plays_per_day);
    let favorites_z = z(MetricField::FavoritesPerDay, m.favorites_per_day);
    let reposts_z = z(MetricField::RepostsPerDay, m.reposts_per_day);
    let velocity_z = z(MetricField::RecentPlaysVelocity, m.recent_plays_velocity);
    let performance_z = z(MetricField::RelativePerformance, m.relative_performance);

    m.momentum = stats::momentum(m.recent_plays_velocity, m.plays_per_day, m.time_decay_factor);
    m.viral_coefficient = stats::viral_coefficient(
        reposts_z,
        favorites_z,
        m.time_decay_factor,
        config.burst_threshold,
        config.viral_multiplier,
    );

    let w = &config.weights;
    m.normalized_score = plays_z * w.plays_per_day
        + velocity_z * w.recent_velocity
        + performance_z * w.relative_performance
        + favorites_z * w.favorites
        + reposts_z * w.reposts
        + m.momentum * w.momentum
        + m.viral_coefficient * w.viral_coefficient;

    m.trending_score = m.normalized_score * m.time_decay_factor * m.viral_coefficient;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ArtistStats;
    use chrono::Duration as ChronoDuration;

    fn now() -> DateTime<Utc> {
        "2026-08-27T12:00:00Z".parse().unwrap()
    }

    fn record(id: &str, plays: u64, favorites: u64, reposts: u64, days_ago: i64) -> TrackRecord {
        TrackRecord {
            id: id.to_string(),
            title: format!("title-{id}"),
            artist: format!("artist-{id}"),
            plays,
            favorites,
            reposts,
            release_date: now() - ChronoDuration::days(days_ago),
            artist_stats: Some(ArtistStats {
                total_play_count: 10_000,
                track_count: 100,
            }),
            external_rank: None,
        }
    }

    #[test]
    fn empty_batch_yields_empty_report() {
        let engine = TrendingEngine::default();
        let report = engine
            .analyze_at(&[], now(), &AnalyzeOptions::default())
            .unwrap();
        assert!(report.metrics.is_empty());
        assert!(report.stats.is_none());
    }

    #[test]
    fn near_constant_batch_scores_on_neutral_factors_only() {
        // All items identical: every z-score degenerates to 0, momentum
        // and viral coefficient stay at their identity values.
        let engine = TrendingEngine::default();
        let records: Vec<TrackRecord> =
            (0..5).map(|i| record(&format!("t{i}"), 500, 20, 5, 3)).collect();

        let report = engine
            .analyze_at(&records, now(), &AnalyzeOptions::default())
            .unwrap();

        let config = engine.config();
        for m in &report.metrics {
            assert_eq!(m.momentum, 1.0);
            assert_eq!(m.viral_coefficient, 1.0);
            let expected =
                config.weights.momentum + config.weights.viral_coefficient;
            assert!((m.normalized_score - expected).abs() < 1e-12);
        }
        // Ties resolve by batch order.
        let ids: Vec<&str> = report.metrics.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["t0", "t1", "t2", "t3", "t4"]);
    }

    #[test]
    fn diagnostics_carry_the_effective_config() {
        let engine = TrendingEngine::default();
        let records = vec![
            record("a", 200, 10, 1, 2),
            record("b", 400, 30, 4, 3),
            record("c", 800, 90, 9, 4),
        ];

        let report = engine
            .analyze_at(
                &records,
                now(),
                &AnalyzeOptions {
                    include_stats: true,
                    ..Default::default()
                },
            )
            .unwrap();

        let stats = report.stats.expect("diagnostics requested");
        assert_eq!(stats.config, engine.config());
        assert_eq!(stats.metric_stats.len(), MetricField::ALL.len());
        assert!(stats.metric_stats.contains_key("plays_per_day"));
    }

    #[test]
    fn update_config_is_an_atomic_merge() {
        let engine = TrendingEngine::default();
        let before = engine.config();

        let effective = engine.update_config(&TrendingConfigPatch {
            min_plays: Some(10),
            ..Default::default()
        });

        assert_eq!(effective.min_plays, 10);
        assert_eq!(effective.weights, before.weights);
        assert_eq!(engine.config(), effective);
    }

    #[test]
    fn updated_config_applies_to_the_next_pass() {
        let engine = TrendingEngine::default();
        let records = vec![record("small", 50, 5, 1, 2), record("big", 500, 50, 5, 2)];

        let first = engine
            .analyze_at(&records, now(), &AnalyzeOptions::default())
            .unwrap();
        assert_eq!(first.metrics.len(), 1, "min_plays=100 drops the small item");

        engine.update_config(&TrendingConfigPatch {
            min_plays: Some(10),
            ..Default::default()
        });

        let second = engine
            .analyze_at(&records, now(), &AnalyzeOptions::default())
            .unwrap();
        assert_eq!(second.metrics.len(), 2, "lowered floor admits both");
    }
}
