//! FIFO Cache Metrics

use super::{CacheMetrics, CoreCacheMetrics};
use std::collections::BTreeMap;

/// FIFO-specific metrics (extends CoreCacheMetrics)
///
/// FIFO ignores access order, so the only extra figure is how many hits landed
/// on an entry that had already been refreshed by a write.
#[derive(Debug, Clone)]
pub struct FifoCacheMetrics {
    /// Core metrics common to all cache policies
    pub core: CoreCacheMetrics,
    /// Hits on entries that had been refreshed in place at least once
    pub refreshed_hits: u64,
}

impl FifoCacheMetrics {
    /// Creates empty metrics for a cache of the given capacity.
    pub fn new(capacity: u64) -> Self {
        Self {
            core: CoreCacheMetrics::new(capacity),
            refreshed_hits: 0,
        }
    }

    /// Converts FIFO metrics to a BTreeMap for reporting.
    pub fn to_btreemap(&self) -> BTreeMap<String, f64> {
        let mut metrics = self.core.to_btreemap();
        metrics.insert("refreshed_hits".to_string(), self.refreshed_hits as f64);
        metrics
    }
}

impl CacheMetrics for FifoCacheMetrics {
    fn metrics(&self) -> BTreeMap<String, f64> {
        self.to_btreemap()
    }

    fn algorithm_name(&self) -> &'static str {
        "FIFO"
    }
}
