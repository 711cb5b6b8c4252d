//! The `none` strategy: straight calls into the vector.

use crate::controller::{Controller, Strategy};
use crate::error::StoreResult;
use crate::vector::VectorStore;

/// Controller without any synchronization.
///
/// Concurrent increments to the same cell can lose updates. The write counter
/// is atomic, so after a race `write_count()` exceeds `total_sum()`.
#[derive(Debug)]
pub struct Unsynchronized {
    vector: VectorStore,
}

impl Unsynchronized {
    /// Creates the controller over `size` zeroed cells.
    pub fn create(size: i64) -> StoreResult<Self> {
        Ok(Self {
            vector: VectorStore::create(size)?,
        })
    }
}

impl Controller for Unsynchronized {
    fn read(&self, index: i64) -> StoreResult<i64> {
        let slot = self.vector.slot(index)?;
        Ok(self.vector.raw_read(slot))
    }

    fn increment(&self, index: i64) -> StoreResult<i64> {
        let slot = self.vector.slot(index)?;
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
        Strategy::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_sequential_increments_are_exact() {
        let store = Unsynchronized::create(2).unwrap();
        for expected in 1..=50 {
            assert_eq!(store.increment(1).unwrap(), expected);
        }
        assert_eq!(store.total_sum(), 50);
        assert_eq!(store.write_count(), 50);
    }

    #[test]
    fn test_concurrent_increments_never_overcount() {
        let store = Arc::new(Unsynchronized::create(1).unwrap());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        store.increment(0).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("Thread panicked");
        }

        // Lost updates may or may not have happened; the cell can never hold
        // more increments than were issued.
        assert_eq!(store.write_count(), 8000);
        assert!(store.total_sum() <= 8000);
        assert!(store.total_sum() >= 1);
    }
}
