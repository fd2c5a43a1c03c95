//! Cache statistics and metrics tracking

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Statistics for cache performance monitoring
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Current number of entries
    pub size: usize,

    /// Maximum allowed entries (None = unlimited)
    pub max_size: Option<usize>,

    /// Total number of successful get operations
    pub hits: u64,

    /// Total number of failed get operations (key not found or expired)
    pub misses: u64,

    /// Total number of insert operations
    pub inserts: u64,

    /// Total number of entries evicted for capacity
    pub evictions: u64,

    /// Total number of expired entries removed
    pub expirations: u64,

    /// Total number of entries removed by tag invalidation
    pub invalidations: u64,
}

impl CacheStats {
    /// Calculate hit rate (hits / total accesses)
    #[allow(clippy::cast_precision_loss)] // a ratio; low-bit loss is invisible
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_accesses();
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Total number of access operations (hits + misses)
    pub fn total_accesses(&self) -> u64 {
        self.hits + self.misses
    }
}

/// Lock-free counters behind [`CacheStats`]
#[derive(Debug, Default)]
pub(crate) struct MetricsCollector {
    enabled: bool,
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
    invalidations: AtomicU64,
}

impl MetricsCollector {
    pub(crate) fn new(enabled: bool) -> Self {
        Self { enabled, ..Self::default() }
    }

    fn bump(&self, counter: &AtomicU64, by: u64) {
        if self.enabled {
            counter.fetch_add(by, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_hit(&self) {
        self.bump(&self.hits, 1);
    }

    pub(crate) fn record_miss(&self) {
        self.bump(&self.misses, 1);
    }

    pub(crate) fn record_insert(&self) {
        self.bump(&self.inserts, 1);
    }

    pub(crate) fn record_eviction(&self) {
        self.bump(&self.evictions, 1);
    }

    pub(crate) fn record_expirations(&self, count: usize) {
        self.bump(&self.expirations, u64::try_from(count).unwrap_or(u64::MAX));
    }

    pub(crate) fn record_invalidations(&self, count: usize) {
        self.bump(&self.invalidations, u64::try_from(count).unwrap_or(u64::MAX));
    }

    /// Get current statistics snapshot
    pub(crate) fn snapshot(&self, size: usize, max_size: Option<usize>) -> CacheStats {
        CacheStats {
            size,
            max_size,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }

    /// Reset all metrics to zero
    pub(crate) fn reset(&self) {
        for counter in [
            &self.hits,
            &self.misses,
            &self.inserts,
            &self.evictions,
            &self.expirations,
            &self.invalidations,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for cache::stats.
    use super::*;

    /// Validates `CacheStats::hit_rate` behavior for empty and mixed access
    /// counts.
    ///
    /// Assertions:
    /// - Confirms an untouched cache reports a 0.0 hit rate.
    /// - Confirms 3 hits and 1 miss yield 0.75.
    #[test]
    fn test_hit_rate() {
        assert_eq!(CacheStats::default().hit_rate(), 0.0);

        let stats = CacheStats { hits: 3, misses: 1, ..Default::default() };
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
        assert_eq!(stats.total_accesses(), 4);
    }

    #[test]
    fn test_collector_snapshot_and_reset() {
        let metrics = MetricsCollector::new(true);
        metrics.record_hit();
        metrics.record_miss();
        metrics.record_insert();
        metrics.record_invalidations(3);
        metrics.record_expirations(2);

        let stats = metrics.snapshot(4, Some(10));
        assert_eq!(stats.size, 4);
        assert_eq!(stats.invalidations, 3);
        assert_eq!(stats.expirations, 2);

        metrics.reset();
        assert_eq!(metrics.snapshot(0, None), CacheStats::default());
    }

    #[test]
    fn test_disabled_collector_counts_nothing() {
        let metrics = MetricsCollector::new(false);
        metrics.record_hit();
        metrics.record_eviction();
        assert_eq!(metrics.snapshot(1, None).hits, 0);
    }
}
