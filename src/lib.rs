// src/lib.rs
// Public library surface for the trending-score engine.
//
// The crate is a pure in-process analytical core: callers fetch catalog
// records upstream, hand them in as a batch, and get back a ranked,
// explainable result. No I/O, no protocol surface of its own.

pub mod cache;
pub mod config;
pub mod derive;
pub mod engine;
pub mod error;
pub mod model;
pub mod rank;
pub mod stats;

mod instrument;

// ---- Re-exports for stable public API ----
pub use crate::config::{ScoreWeights, ScoreWeightsPatch, TrendingConfig, TrendingConfigPatch};
pub use crate::engine::{
    AnalyzeOptions, TrendingDiagnostics, TrendingEngine, TrendingReport, DEFAULT_LIMIT,
};
pub use crate::error::{Error, Result};
pub use crate::model::{ArtistStats, MetricField, MetricStats, TrackRecord, TrendingMetrics};
pub use crate::rank::RankCorrelations;
