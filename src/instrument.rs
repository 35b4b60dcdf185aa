//! Instrumentation counters via the `metrics` facade.
//!
//! The library only records; installing a recorder/exporter is the
//! embedding application's job. Without one these calls are no-ops.

use metrics::counter;

/// One completed scoring pass.
pub(crate) fn scoring_pass(batch_len: usize) {
    counter!("trending_passes_total").increment(1);
    counter!("trending_tracks_scored_total").increment(batch_len as u64);
}

/// Items dropped by the `min_plays` floor before statistics.
pub(crate) fn tracks_excluded(count: usize) {
    if count > 0 {
        counter!("trending_tracks_excluded_total").increment(count as u64);
    }
}

pub(crate) fn cache_hit() {
    counter!("trending_stats_cache_hits_total").increment(1);
}

pub(crate) fn cache_miss() {
    counter!("trending_stats_cache_misses_total").increment(1);
}

/// Configuration updates (each one invalidates the stats cache).
pub(crate) fn config_update() {
    counter!("trending_config_updates_total").increment(1);
}
