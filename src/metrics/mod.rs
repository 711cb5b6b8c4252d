//! Cache Metrics System
//!
//! Metrics for the read cache, reported as a `BTreeMap` so keys always come
//! out in the same order. That keeps shutdown logs and test assertions stable
//! between runs.

use std::collections::BTreeMap;

pub mod fifo;

pub use fifo::FifoCacheMetrics;

/// Counters shared by every cache policy.
#[derive(Debug, Default, Clone)]
pub struct CoreCacheMetrics {
    /// Total number of lookups made against the cache
    pub requests: u64,

    /// Lookups answered from the cache
    pub cache_hits: u64,

    /// New entries added to the cache
    pub insertions: u64,

    /// Existing entries whose value was refreshed in place
    pub updates: u64,

    /// Entries pushed out to make room for new ones
    pub evictions: u64,

    /// Entries dropped by an explicit remove
    pub removals: u64,

    /// Entries currently held
    pub entries: u64,

    /// Configured maximum number of entries
    pub capacity: u64,
}

impl CoreCacheMetrics {
    /// Creates an empty set of counters for a cache of the given capacity.
    pub fn new(capacity: u64) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    /// Records a lookup that was answered from the cache.
    pub fn record_hit(&mut self) {
        self.requests += 1;
        self.cache_hits += 1;
    }

    /// Records a lookup that had to go to the backing store.
    ///
    /// Misses are derived as `requests - cache_hits`.
    pub fn record_miss(&mut self) {
        self.requests += 1;
    }

    /// Records a new entry.
    pub fn record_insertion(&mut self) {
        self.insertions += 1;
        self.entries += 1;
    }

    /// Records an in-place refresh of an existing entry.
    pub fn record_update(&mut self) {
        self.updates += 1;
    }

    /// Records an entry pushed out by an insertion into a full cache.
    pub fn record_eviction(&mut self) {
        self.evictions += 1;
        self.entries = self.entries.saturating_sub(1);
    }

    /// Records an entry dropped on request.
    pub fn record_removal(&mut self) {
        self.removals += 1;
        self.entries = self.entries.saturating_sub(1);
    }

    /// Fraction of lookups answered from the cache, `0.0` before any lookup.
    pub fn hit_rate(&self) -> f64 {
        if self.requests > 0 {
            self.cache_hits as f64 / self.requests as f64
        } else {
            0.0
        }
    }

    /// Fraction of lookups that missed, `0.0` before any lookup.
    pub fn miss_rate(&self) -> f64 {
        if self.requests > 0 {
            (self.requests - self.cache_hits) as f64 / self.requests as f64
        } else {
            0.0
        }
    }

    /// How full the cache is relative to its capacity.
    pub fn utilization(&self) -> f64 {
        if self.capacity > 0 {
            self.entries as f64 / self.capacity as f64
        } else {
            0.0
        }
    }

    /// Converts the counters into a deterministic key/value report.
    pub fn to_btreemap(&self) -> BTreeMap<String, f64> {
        let mut metrics = BTreeMap::new();

        metrics.insert("cache_hits".to_string(), self.cache_hits as f64);
        metrics.insert(
            "cache_misses".to_string(),
            (self.requests - self.cache_hits) as f64,
        );
        metrics.insert("requests".to_string(), self.requests as f64);
        metrics.insert("insertions".to_string(), self.insertions as f64);
        metrics.insert("updates".to_string(), self.updates as f64);
        metrics.insert("evictions".to_string(), self.evictions as f64);
        metrics.insert("removals".to_string(), self.removals as f64);

        metrics.insert("hit_rate".to_string(), self.hit_rate());
        metrics.insert("miss_rate".to_string(), self.miss_rate());

        metrics.insert("entries".to_string(), self.entries as f64);
        metrics.insert("capacity".to_string(), self.capacity as f64);
        metrics.insert("utilization".to_string(), self.utilization());

        metrics
    }
}

/// Uniform metrics access for cache implementations.
pub trait CacheMetrics {
    /// Returns all metrics as key-value pairs in deterministic order.
    fn metrics(&self) -> BTreeMap<String, f64>;

    /// Short name of the eviction policy (e.g. `"FIFO"`).
    fn algorithm_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates_without_requests() {
        let metrics = CoreCacheMetrics::new(4);
        assert_eq!(metrics.hit_rate(), 0.0);
        assert_eq!(metrics.miss_rate(), 0.0);
        assert_eq!(metrics.utilization(), 0.0);
    }

    #[test]
    fn test_counters_and_report() {
        let mut metrics = CoreCacheMetrics::new(4);
        metrics.record_miss();
        metrics.record_insertion();
        metrics.record_hit();
        metrics.record_hit();
        metrics.record_update();
        metrics.record_insertion();
        metrics.record_removal();

        assert_eq!(metrics.requests, 3);
        assert_eq!((metrics.evictions, metrics.removals), (0, 1));
        assert_eq!(metrics.cache_hits, 2);
        assert!((metrics.hit_rate() - 2.0 / 3.0).abs() < f64::EPSILON);

        let report = metrics.to_btreemap();
        assert_eq!(report["cache_misses"], 1.0);
        assert_eq!(report["removals"], 1.0);
        assert_eq!(report["entries"], 1.0);
        assert_eq!(report["utilization"], 0.25);
        let keys: Vec<_> = report.keys().cloned().collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }
}
