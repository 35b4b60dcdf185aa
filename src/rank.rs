//! # Ranker & Validator
//! Final ordering of a scored batch, plus optional Spearman diagnostics
//! quantifying how much each individual factor explains an external
//! reference ordering. Diagnostics never affect the returned scores.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::TrendingMetrics;
use crate::stats;

/// The single-factor orderings evaluated by the validator.
const FACTORS: [(&str, fn(&TrendingMetrics) -> f64); 4] = [
    ("plays_per_day", |m| m.plays_per_day),
    ("recent_velocity", |m| m.recent_plays_velocity),
    ("momentum", |m| m.momentum),
    ("viral_coefficient", |m| m.viral_coefficient),
];

/// Sort descending by trending score and assign 1-based ranks.
///
/// Ties are broken explicitly by original batch position rather than by
/// relying on sort stability, so the ordering is deterministic across
/// runs and implementations.
pub fn assign_ranks(metrics: &mut Vec<TrendingMetrics>) {
    let mut indexed: Vec<(usize, TrendingMetrics)> = metrics.drain(..).enumerate().collect();
    indexed.sort_by(|(ia, a), (ib, b)| {
        b.trending_score
            .partial_cmp(&a.trending_score)
            .unwrap_or(Ordering::Equal)
            .then(ia.cmp(ib))
    });

    *metrics = indexed
        .into_iter()
        .enumerate()
        .map(|(pos, (_, mut m))| {
            m.computed_rank = pos + 1;
            m
        })
        .collect();
}

/// Spearman correlations between the computed ranking, the single-factor
/// orderings, and (when available) the caller-supplied external ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankCorrelations {
    /// External reference ordering vs the computed ranking. `None` when
    /// any scored item lacks an external rank.
    pub external_vs_computed: Option<f64>,
    /// External reference ordering vs each single-factor ordering.
    pub external_vs_factors: Option<BTreeMap<String, f64>>,
    /// Computed ranking vs each single-factor ordering; always present.
    pub computed_vs_factors: BTreeMap<String, f64>,
}

/// Compute rank correlations over an already-ranked batch.
pub fn correlations(metrics: &[TrendingMetrics]) -> Result<RankCorrelations> {
    let computed: Vec<f64> = metrics.iter().map(|m| m.computed_rank as f64).collect();

    let mut computed_vs_factors = BTreeMap::new();
    let mut factor_rank_seqs = BTreeMap::new();
    for (name, extract) in FACTORS {
        let ranks = factor_ranks(metrics, extract);
        computed_vs_factors.insert(
            name.to_string(),
            stats::rank_correlation(&computed, &ranks)?,
        );
        factor_rank_seqs.insert(name, ranks);
    }

    // External correlations need a reference rank on every scored item.
    let external: Option<Vec<f64>> = metrics
        .iter()
        .map(|m| m.external_rank.map(|r| r as f64))
        .collect();

    let (external_vs_computed, external_vs_factors) = match external {
        Some(ext) => {
            let vs_computed = stats::rank_correlation(&ext, &computed)?;
            let mut vs_factors = BTreeMap::new();
            for (name, ranks) in &factor_rank_seqs {
                vs_factors.insert(name.to_string(), stats::rank_correlation(&ext, ranks)?);
            }
            (Some(vs_computed), Some(vs_factors))
        }
        None => (None, None),
    };

    Ok(RankCorrelations {
        external_vs_computed,
        external_vs_factors,
        computed_vs_factors,
    })
}

/// Per-item ranks under a descending sort of one factor, with the same
/// explicit positional tie-break as the final ranking.
fn factor_ranks(metrics: &[TrendingMetrics], extract: fn(&TrendingMetrics) -> f64) -> Vec<f64> {
    let mut order: Vec<usize> = (0..metrics.len()).collect();
    order.sort_by(|&a, &b| {
        extract(&metrics[b])
            .partial_cmp(&extract(&metrics[a]))
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(&b))
    });

    let mut ranks = vec![0.0; metrics.len()];
    for (pos, &idx) in order.iter().enumerate() {
        ranks[idx] = (pos + 1) as f64;
    }
    ranks
}
