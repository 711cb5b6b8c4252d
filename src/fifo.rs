//! First-In First-Out (FIFO) Cache Implementation
//!
//! A bounded map that evicts entries in the order they were first inserted.
//! Reading an entry or refreshing its value does not move it in the queue, so
//! the oldest surviving insertion is always the next one to go.
//!
//! # Layout
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  queue (insertion order)        map                          │
//! │                                                              │
//! │  front ─▶ (seq 1, k=7)          7 ─▶ { value, seq 1 }        │
//! │           (seq 2, k=3)          3 ─▶ { value, seq 2 }        │
//! │           (seq 4, k=9)          9 ─▶ { value, seq 4 }        │
//! │  back  ─▶ ...                                                │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each insertion gets a sequence number. [`FifoCache::remove`] only drops the
//! map entry; the queue slot left behind is recognised as stale because its
//! sequence number no longer matches, and is skipped on eviction. The queue is
//! compacted once stale slots outnumber the capacity.
//!
//! # Performance Characteristics
//!
//! - Get / Put / Remove: O(1) average
//! - Eviction: O(1) amortized
//!
//! # Thread Safety
//!
//! Not thread-safe. [`ReadThroughCache`](crate::read_through::ReadThroughCache)
//! wraps it in a `parking_lot::Mutex` for shared use.

use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use core::num::NonZeroUsize;
use std::collections::{BTreeMap, VecDeque};

use crate::config::FifoCacheConfig;
use crate::metrics::{CacheMetrics, FifoCacheMetrics};

#[cfg(feature = "hashbrown")]
use hashbrown::DefaultHashBuilder;
#[cfg(feature = "hashbrown")]
use hashbrown::HashMap;

#[cfg(not(feature = "hashbrown"))]
use std::collections::hash_map::RandomState as DefaultHashBuilder;
#[cfg(not(feature = "hashbrown"))]
use std::collections::HashMap;

struct Slot<V> {
    value: V,
    seq: u64,
    refreshed: bool,
}

/// Bounded cache with FIFO eviction.
///
/// # Examples
///
/// ```
/// use counter_store::FifoCache;
/// use core::num::NonZeroUsize;
///
/// let mut cache = FifoCache::new(NonZeroUsize::new(2).unwrap());
/// cache.put(1, "one");
/// cache.put(2, "two");
/// cache.get(&1);          // reads do not protect an entry
/// cache.put(3, "three");  // 1 was inserted first, so it goes
/// assert!(cache.get(&1).is_none());
/// assert_eq!(cache.get(&2), Some(&"two"));
/// ```
pub struct FifoCache<K, V, S = DefaultHashBuilder> {
    config: FifoCacheConfig,
    map: HashMap<K, Slot<V>, S>,
    queue: VecDeque<(u64, K)>,
    next_seq: u64,
    metrics: FifoCacheMetrics,
}

impl<K: Hash + Eq + Clone, V> FifoCache<K, V, DefaultHashBuilder> {
    /// Creates a cache holding at most `cap` entries.
    pub fn new(cap: NonZeroUsize) -> Self {
        Self::init(FifoCacheConfig { capacity: cap }, None)
    }

    /// Creates a cache from a configuration with an optional hasher.
    pub fn init(config: FifoCacheConfig, hasher: Option<DefaultHashBuilder>) -> Self {
        Self::with_hasher(config, hasher.unwrap_or_default())
    }
}

impl<K: Hash + Eq + Clone, V, S: BuildHasher> FifoCache<K, V, S> {
    /// Creates a cache with a custom hash builder.
    pub fn with_hasher(config: FifoCacheConfig, hash_builder: S) -> Self {
        let cap = config.capacity.get();
        Self {
            config,
            map: HashMap::with_capacity_and_hasher(cap, hash_builder),
            queue: VecDeque::with_capacity(cap),
            next_seq: 0,
            metrics: FifoCacheMetrics::new(cap as u64),
        }
    }

    /// Maximum number of entries.
    #[inline]
    pub fn cap(&self) -> NonZeroUsize {
        self.config.capacity
    }

    /// Number of entries currently held.
    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if the cache holds no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Hit/miss/eviction counters.
    #[inline]
    pub fn metrics(&self) -> &FifoCacheMetrics {
        &self.metrics
    }

    /// Looks up a key, recording a hit or a miss.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        match self.map.get(key) {
            Some(slot) => {
                self.metrics.core.record_hit();
                if slot.refreshed {
                    self.metrics.refreshed_hits += 1;
                }
                Some(&slot.value)
            }
            None => {
                self.metrics.core.record_miss();
                None
            }
        }
    }

    /// Looks up a key without touching the metrics.
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.map.get(key).map(|slot| &slot.value)
    }

    /// Returns `true` if the key is cached.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.map.contains_key(key)
    }

    /// Inserts or refreshes an entry.
    ///
    /// A refresh keeps the entry's place in the eviction queue. Inserting a new
    /// key into a full cache first evicts the oldest entry, which is returned.
    pub fn put(&mut self, key: K, value: V) -> Option<(K, V)> {
        self.merge(key, value, |current, new| *current = new)
    }

    /// Inserts `value`, or combines it with the existing value using `combine`.
    ///
    /// Same queue and eviction rules as [`put`](Self::put).
    pub fn merge<F>(&mut self, key: K, value: V, combine: F) -> Option<(K, V)>
    where
        F: FnOnce(&mut V, V),
    {
        if let Some(slot) = self.map.get_mut(&key) {
            combine(&mut slot.value, value);
            slot.refreshed = true;
            self.metrics.core.record_update();
            return None;
        }

        let evicted = if self.map.len() >= self.config.capacity.get() {
            self.evict_oldest()
        } else {
            None
        };

        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push_back((seq, key.clone()));
        self.map.insert(
            key,
            Slot {
                value,
                seq,
                refreshed: false,
            },
        );
        self.metrics.core.record_insertion();

        evicted
    }

    /// Removes an entry, returning its value.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let slot = self.map.remove(key)?;
        self.metrics.core.record_removal();
        if self.queue.len() > 2 * self.config.capacity.get() {
            self.compact();
        }
        Some(slot.value)
    }

    /// Drops every entry. Metrics counters are kept.
    pub fn clear(&mut self) {
        self.map.clear();
        self.queue.clear();
        self.metrics.core.entries = 0;
    }

    /// Keys in eviction order, oldest first.
    pub fn keys_in_order(&self) -> impl Iterator<Item = &K> + '_ {
        self.queue
            .iter()
            .filter(|(seq, key)| self.is_live(*seq, key))
            .map(|(_, key)| key)
    }

    fn is_live(&self, seq: u64, key: &K) -> bool {
        self.map.get(key).is_some_and(|slot| slot.seq == seq)
    }

    fn evict_oldest(&mut self) -> Option<(K, V)> {
        while let Some((seq, key)) = self.queue.pop_front() {
            if self.is_live(seq, &key) {
                let slot = self.map.remove(&key)?;
                self.metrics.core.record_eviction();
                return Some((key, slot.value));
            }
        }
        None
    }

    fn compact(&mut self) {
        let map = &self.map;
        self.queue
            .retain(|(seq, key)| map.get(key).is_some_and(|slot| slot.seq == *seq));
    }
}

impl<K, V, S> CacheMetrics for FifoCache<K, V, S> {
    fn metrics(&self) -> BTreeMap<String, f64> {
        self.metrics.to_btreemap()
    }

    fn algorithm_name(&self) -> &'static str {
        self.metrics.algorithm_name()
    }
}

impl<K, V, S> core::fmt::Debug for FifoCache<K, V, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FifoCache")
            .field("capacity", &self.config.capacity)
            .field("len", &self.map.len())
            .finish()
    }
}
