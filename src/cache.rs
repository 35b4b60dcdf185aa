//! # Population Statistics Cache
//! Per-field robust statistics for the current batch, cached for a
//! bounded time. A lookup hits only while the TTL is unexpired *and* the
//! entry was computed under the current configuration generation; any
//! configuration update invalidates the whole cache, never per-field.
//!
//! Read-check-compute-write is serialized through one internal lock so a
//! concurrent reader can never observe a half-updated statistics table.

use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, Instant},
};

use tracing::debug;

use crate::error::Result;
use crate::instrument;
use crate::model::{MetricField, MetricStats};

/// Default time-to-live for cached statistics.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Thread-safe per-field statistics cache.
#[derive(Debug)]
pub struct StatsCache {
    inner: Mutex<Inner>,
    ttl: Duration,
}

#[derive(Debug)]
struct Inner {
    entries: HashMap<MetricField, MetricStats>,
    /// Instant of the first write after the last reset; all entries share
    /// one timestamp, mirroring the coarse invalidation model.
    written_at: Option<Instant>,
    /// Config generation the entries were computed under.
    generation: u64,
}

impl StatsCache {
    /// Cache with the production 5-minute TTL.
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    /// Cache with a custom TTL (tests, offline evaluation).
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                written_at: None,
                generation: 0,
            }),
            ttl,
        }
    }

    /// Return the cached statistics for `field`, or compute and store them.
    ///
    /// Entries from an expired TTL window or a different configuration
    /// generation are discarded wholesale before the lookup. The compute
    /// closure runs under the cache lock.
    pub fn get_or_try_insert<F>(
        &self,
        field: MetricField,
        generation: u64,
        compute: F,
    ) -> Result<MetricStats>
    where
        F: FnOnce() -> Result<MetricStats>,
    {
        let mut inner = self.inner.lock().expect("stats cache mutex poisoned");

        let expired = match inner.written_at {
            Some(at) => at.elapsed() >= self.ttl,
            None => false,
        };
        if expired || inner.generation != generation {
            if !inner.entries.is_empty() {
                debug!(
                    expired,
                    stale_generation = inner.generation != generation,
                    "discarding cached population statistics"
                );
            }
            inner.entries.clear();
            inner.written_at = None;
            inner.generation = generation;
        }

        if let Some(stats) = inner.entries.get(&field) {
            instrument::cache_hit();
            return Ok(*stats);
        }

        instrument::cache_miss();
        let stats = compute()?;
        if inner.written_at.is_none() {
            inner.written_at = Some(Instant::now());
        }
        inner.entries.insert(field, stats);
        Ok(stats)
    }

    /// Drop every entry unconditionally (configuration updates).
    pub fn invalidate(&self) {
        let mut inner = self.inner.lock().expect("stats cache mutex poisoned");
        inner.entries.clear();
        inner.written_at = None;
    }

    /// Number of cached field tables (diagnostics/tests).
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .expect("stats cache mutex poisoned")
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// TTL in seconds (diagnostics/telemetry).
    pub fn ttl_secs(&self) -> u64 {
        self.ttl.as_secs()
    }
}

impl Default for StatsCache {
    fn default() -> Self {
        Self::new()
    }
}
