//! Vector Store
//!
//! The shared array of integer cells and the global write counter. This is the
//! leaf of the store: it knows how to read, bump and sum cells, but it does not
//! synchronize anything on its own. Choosing *how* concurrent callers are kept
//! apart is the job of the [`controller`](crate::controller) module.
//!
//! # Layout
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                       VectorStore                        │
//! │                                                          │
//! │  cells:   [ AtomicI64 | AtomicI64 | ... | AtomicI64 ]    │
//! │              index 0     index 1         index N-1       │
//! │                                                          │
//! │  writes:  AtomicU64   (successful WRITEs, never reset)   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Cells are atomics so that unsynchronized access is a *logical* race rather
//! than undefined behaviour. [`VectorStore::raw_increment`] is deliberately a
//! separate load and store: two callers that interleave between the load and
//! the store will both write the same value and one increment is lost.

use core::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use crate::error::{StoreError, StoreResult};

/// Fixed-size vector of integer counters.
pub struct VectorStore {
    cells: Box<[AtomicI64]>,
    writes: AtomicU64,
}

impl VectorStore {
    /// Creates a store with `size` cells, all set to zero.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidSize`] if `size` is zero or negative.
    pub fn create(size: i64) -> StoreResult<Self> {
        if size <= 0 {
            return Err(StoreError::InvalidSize { size });
        }
        let len = usize::try_from(size).map_err(|_| StoreError::InvalidSize { size })?;
        let cells: Vec<AtomicI64> = (0..len).map(|_| AtomicI64::new(0)).collect();
        Ok(Self {
            cells: cells.into_boxed_slice(),
            writes: AtomicU64::new(0),
        })
    }

    /// Number of cells.
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Always `false`: a store has at least one cell.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Maps a client-supplied index to a slot, rejecting anything outside `[0, len)`.
    pub fn slot(&self, index: i64) -> StoreResult<usize> {
        usize::try_from(index)
            .ok()
            .filter(|&slot| slot < self.cells.len())
            .ok_or(StoreError::IndexOutOfRange {
                index,
                len: self.cells.len(),
            })
    }

    /// Current value of a cell. No synchronization beyond the atomic load.
    #[inline]
    pub fn raw_read(&self, slot: usize) -> i64 {
        self.cells[slot].load(Ordering::Relaxed)
    }

    /// Adds one to a cell and returns the new value.
    ///
    /// Not atomic as a whole; callers that need every increment to land must
    /// hold a lock that covers `slot`.
    #[inline]
    pub(crate) fn raw_increment(&self, slot: usize) -> i64 {
        let next = self.load(slot) + 1;
        self.store(slot, next);
        next
    }

    /// Bumps the global write counter and returns the new count.
    #[inline]
    pub(crate) fn record_write(&self) -> u64 {
        self.writes.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Number of successful WRITEs since creation.
    #[inline]
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Acquire)
    }

    /// Sum of all cells by full scan.
    ///
    /// The scan is not atomic with respect to concurrent increments; callers
    /// that want a value matching a single instant must exclude writers.
    pub fn total_sum(&self) -> i64 {
        self.cells
            .iter()
            .map(|cell| cell.load(Ordering::Relaxed))
            .sum()
    }

    #[inline]
    fn load(&self, slot: usize) -> i64 {
        self.cells[slot].load(Ordering::Acquire)
    }

    #[inline]
    fn store(&self, slot: usize, value: i64) {
        self.cells[slot].store(value, Ordering::Release);
    }
}

impl core::fmt::Debug for VectorStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VectorStore")
            .field("len", &self.cells.len())
            .field("writes", &self.write_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_rejects_non_positive_sizes() {
        assert!(matches!(
            VectorStore::create(0),
            Err(StoreError::InvalidSize { size: 0 })
        ));
        assert!(matches!(
            VectorStore::create(-3),
            Err(StoreError::InvalidSize { size: -3 })
        ));
    }

    #[test]
    fn test_new_store_is_zeroed() {
        let store = VectorStore::create(8).unwrap();
        assert_eq!(store.len(), 8);
        assert!((0..8).all(|slot| store.raw_read(slot) == 0));
        assert_eq!(store.total_sum(), 0);
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_slot_bounds() {
        let store = VectorStore::create(10).unwrap();
        assert_eq!(store.slot(0).unwrap(), 0);
        assert_eq!(store.slot(9).unwrap(), 9);
        assert!(matches!(
            store.slot(10),
            Err(StoreError::IndexOutOfRange { index: 10, len: 10 })
        ));
        assert!(matches!(
            store.slot(-1),
            Err(StoreError::IndexOutOfRange { index: -1, len: 10 })
        ));
    }

    #[test]
    fn test_increment_and_sum() {
        let store = VectorStore::create(4).unwrap();
        assert_eq!(store.raw_increment(1), 1);
        assert_eq!(store.raw_increment(1), 2);
        assert_eq!(store.raw_increment(3), 1);
        assert_eq!(store.total_sum(), 3);
        assert_eq!(store.record_write(), 1);
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn test_interleaved_increment_loses_an_update() {
        // Two unsynchronized writers both load before either stores.
        let store = VectorStore::create(1).unwrap();
        let first = store.load(0);
        let second = store.load(0);
        store.store(0, first + 1);
        store.record_write();
        store.store(0, second + 1);
        store.record_write();

        assert_eq!(store.write_count(), 2);
        assert_eq!(store.raw_read(0), 1);
        assert!(store.total_sum() < store.write_count() as i64);
    }
}
