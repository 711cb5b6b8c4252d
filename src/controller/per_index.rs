//! The `per-index` strategy: lock striping with one stripe per cell.
//!
//! The lock table is a boxed slice sized at creation, so there is no lazily
//! grown map and no second lock protecting it. A cell's mutex covers both the
//! cell and the write-counter bump for that increment.

use parking_lot::Mutex;

use crate::controller::{Controller, Strategy};
use crate::error::StoreResult;
use crate::vector::VectorStore;

/// Controller with one mutex per cell.
///
/// Operations on different cells proceed in parallel; operations on the same
/// cell serialize. [`total_sum`](Controller::total_sum) takes no lock and may
/// mix pre- and post-increment values of concurrently written cells.
#[derive(Debug)]
pub struct PerIndexLock {
    vector: VectorStore,
    locks: Box<[Mutex<()>]>,
}

impl PerIndexLock {
    /// Creates the controller and its lock table over `size` zeroed cells.
    pub fn create(size: i64) -> StoreResult<Self> {
        let vector = VectorStore::create(size)?;
        let locks: Vec<Mutex<()>> = (0..vector.len()).map(|_| Mutex::new(())).collect();
        Ok(Self {
            vector,
            locks: locks.into_boxed_slice(),
        })
    }
}

impl Controller for PerIndexLock {
    fn read(&self, index: i64) -> StoreResult<i64> {
        let slot = self.vector.slot(index)?;
        let _guard = self.locks[slot].lock();
        Ok(self.vector.raw_read(slot))
    }

    fn increment(&self, index: i64) -> StoreResult<i64> {
        let slot = self.vector.slot(index)?;
        let _guard = self.locks[slot].lock();
        let value = self.vector.raw_increment(slot);
        self.vector.record_write();
        Ok(value)
    }

    fn total_sum(&self) -> i64 {
        self.vector.total_sum()
    }

    fn write_count(&self) -> u64 {
        self.vector.write_count()
    }

    fn len(&self) -> usize {
        self.vector.len()
    }

    fn strategy(&self) -> Strategy {
        Strategy::PerIndex
    }
}
