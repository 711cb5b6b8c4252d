//! Read-through cache layer
//!
//! Sits between sessions and a slower backing read path. Reads consult the
//! [`FifoCache`] first and only fall through to the [`Backend`] on a miss;
//! successful writes refresh the cached value for their index. The cache never
//! decides whether a write happens.
//!
//! ```text
//!   READ i ──▶ FifoCache ──hit──▶ value
//!                 │
//!                miss
//!                 ▼
//!              Backend ──▶ insert (evict oldest if full) ──▶ value
//!
//!   WRITE i ──▶ Controller::increment ──▶ write_through(i, new value)
//! ```
//!
//! # Ordering between a miss and a write
//!
//! Backend reads happen with the cache lock held, on a miss and on a refresh.
//! Increments themselves do not take the cache lock. For backends that return
//! live cell values ([`Backend::monotonic`]) a refresh stores the larger of the
//! written value and a fresh read of the cell, so an entry re-inserted after an
//! eviction can never fall behind a write that already completed.

use core::fmt;
use std::collections::BTreeMap;

use parking_lot::Mutex;

use crate::config::{BackendKind, CacheConfig, FifoCacheConfig};
use crate::controller::SharedController;
use crate::error::{StoreError, StoreResult};
use crate::fifo::FifoCache;
use crate::metrics::{CacheMetrics, FifoCacheMetrics};

/// The slow read path behind the cache.
pub trait Backend: Send + Sync + fmt::Debug {
    /// Fetches the value for `index`.
    fn fetch(&self, index: i64) -> StoreResult<i64>;

    /// Returns `true` if successive values for an index never decrease.
    fn monotonic(&self) -> bool {
        false
    }
}

/// Backend that reads the live cell through the controller.
#[derive(Debug)]
pub struct ControllerBackend {
    controller: SharedController,
}

impl ControllerBackend {
    /// Wraps a controller.
    pub fn new(controller: SharedController) -> Self {
        Self { controller }
    }
}

impl Backend for ControllerBackend {
    fn fetch(&self, index: i64) -> StoreResult<i64> {
        self.controller.read(index)
    }

    fn monotonic(&self) -> bool {
        true
    }
}

/// Placeholder for an external store: answers `index * multiplier`.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedBackend {
    multiplier: i64,
    len: usize,
}

impl SimulatedBackend {
    /// Creates a simulated backend covering `len` indices.
    pub fn new(multiplier: i64, len: usize) -> Self {
        Self { multiplier, len }
    }
}

impl Backend for SimulatedBackend {
    fn fetch(&self, index: i64) -> StoreResult<i64> {
        match usize::try_from(index) {
            Ok(slot) if slot < self.len => Ok(index.saturating_mul(self.multiplier)),
            _ => Err(StoreError::IndexOutOfRange {
                index,
                len: self.len,
            }),
        }
    }
}

/// Shared FIFO cache in front of a [`Backend`].
pub struct ReadThroughCache {
    cache: Mutex<FifoCache<i64, i64>>,
    backend: Box<dyn Backend>,
    len: usize,
}

impl ReadThroughCache {
    /// Creates a cache in front of `backend`, covering indices `[0, len)`.
    pub fn new(capacity: FifoCacheConfig, backend: Box<dyn Backend>, len: usize) -> Self {
        Self {
            cache: Mutex::new(FifoCache::init(capacity, None)),
            backend,
            len,
        }
    }

    /// Builds the cache and backend described by `config` for `controller`.
    pub fn from_config(config: &CacheConfig, controller: &SharedController) -> Self {
        let len = controller.len();
        let backend: Box<dyn Backend> = match config.backend {
            BackendKind::Controller => Box::new(ControllerBackend::new(controller.clone())),
            BackendKind::Simulated { multiplier } => {
                Box::new(SimulatedBackend::new(multiplier, len))
            }
        };
        Self::new(
            FifoCacheConfig {
                capacity: config.capacity,
            },
            backend,
            len,
        )
    }

    /// Returns the cached value for `index`, fetching and caching it on a miss.
    pub fn read_through(&self, index: i64) -> StoreResult<i64> {
        self.check(index)?;

        let mut cache = self.cache.lock();
        if let Some(value) = cache.get(&index).copied() {
            return Ok(value);
        }

        let fetched = self.backend.fetch(index)?;
        cache.put(index, fetched);
        Ok(fetched)
    }

    /// Refreshes the entry for `index` after a successful write.
    pub fn write_through(&self, index: i64, value: i64) {
        let mut cache = self.cache.lock();
        let value = if self.backend.monotonic() {
            self.backend
                .fetch(index)
                .map_or(value, |live| live.max(value))
        } else {
            value
        };
        cache.put(index, value);
    }

    /// Returns `true` if `index` is currently cached.
    pub fn contains(&self, index: i64) -> bool {
        self.cache.lock().contains(&index)
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }

    /// Snapshot of the cache counters.
    pub fn snapshot(&self) -> FifoCacheMetrics {
        self.cache.lock().metrics().clone()
    }

    fn check(&self, index: i64) -> StoreResult<()> {
        match usize::try_from(index) {
            Ok(slot) if slot < self.len => Ok(()),
            _ => Err(StoreError::IndexOutOfRange {
                index,
                len: self.len,
            }),
        }
    }
}

impl CacheMetrics for ReadThroughCache {
    fn metrics(&self) -> BTreeMap<String, f64> {
        self.cache.lock().metrics().to_btreemap()
    }

    fn algorithm_name(&self) -> &'static str {
        "FIFO"
    }
}

impl fmt::Debug for ReadThroughCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadThroughCache")
            .field("cache", &*self.cache.lock())
            .field("backend", &self.backend)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{self, Strategy};
    use core::num::NonZeroUsize;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug, Default)]
    struct CountingBackend {
        fetches: AtomicUsize,
    }

    impl Backend for Arc<CountingBackend> {
        fn fetch(&self, index: i64) -> StoreResult<i64> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(index + 1000)
        }
    }

    fn capacity(cap: usize) -> FifoCacheConfig {
        FifoCacheConfig {
            capacity: NonZeroUsize::new(cap).unwrap(),
        }
    }

    #[test]
    fn test_hit_skips_backend() {
        let backend = Arc::new(CountingBackend::default());
        let cache = ReadThroughCache::new(capacity(4), Box::new(backend.clone()), 10);

        assert_eq!(cache.read_through(3).unwrap(), 1003);
        assert_eq!(cache.read_through(3).unwrap(), 1003);
        assert_eq!(backend.fetches.load(Ordering::SeqCst), 1);

        let metrics = cache.snapshot();
        assert_eq!(metrics.core.requests, 2);
        assert_eq!(metrics.core.cache_hits, 1);
    }

    #[test]
    fn test_first_read_evicted_after_capacity_plus_one() {
        let backend = Arc::new(CountingBackend::default());
        let cache = ReadThroughCache::new(capacity(3), Box::new(backend.clone()), 10);

        for index in 0..4 {
            cache.read_through(index).unwrap();
        }
        assert!(!cache.contains(0));
        assert_eq!(cache.len(), 3);
        assert_eq!(backend.fetches.load(Ordering::SeqCst), 4);

        // Re-reading the evicted index goes back to the backend.
        assert_eq!(cache.read_through(0).unwrap(), 1000);
        assert_eq!(backend.fetches.load(Ordering::SeqCst), 5);
        assert!(!cache.contains(1));
    }

    #[test]
    fn test_out_of_range_is_not_cached() {
        let backend = Arc::new(CountingBackend::default());
        let cache = ReadThroughCache::new(capacity(3), Box::new(backend.clone()), 10);

        assert!(matches!(
            cache.read_through(10),
            Err(StoreError::IndexOutOfRange { index: 10, len: 10 })
        ));
        assert!(cache.read_through(-1).is_err());
        assert!(cache.is_empty());
        assert_eq!(backend.fetches.load(Ordering::SeqCst), 0);
        assert_eq!(cache.snapshot().core.requests, 0);
    }

    #[test]
    fn test_write_through_with_controller_backend() {
        let store = controller::build(Strategy::PerIndex, 5).unwrap();
        let config = CacheConfig {
            capacity: NonZeroUsize::new(2).unwrap(),
            backend: BackendKind::Controller,
        };
        let cache = ReadThroughCache::from_config(&config, &store);

        assert_eq!(cache.read_through(1).unwrap(), 0);
        let value = store.increment(1).unwrap();
        cache.write_through(1, value);
        assert_eq!(cache.read_through(1).unwrap(), 1);

        // A stale value offered later never wins over a newer one.
        cache.write_through(1, 0);
        assert_eq!(cache.read_through(1).unwrap(), 1);
    }

    #[test]
    fn test_simulated_backend() {
        let config = CacheConfig {
            capacity: NonZeroUsize::new(2).unwrap(),
            backend: BackendKind::Simulated { multiplier: 7 },
        };
        let store = controller::build(Strategy::Global, 10).unwrap();
        let cache = ReadThroughCache::from_config(&config, &store);

        assert_eq!(cache.read_through(3).unwrap(), 21);
        cache.write_through(3, 1);
        assert_eq!(cache.read_through(3).unwrap(), 1);
        assert!(cache.read_through(10).is_err());
    }
}
