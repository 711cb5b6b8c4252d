//! The `global` strategy: one mutex serializes every access.

use parking_lot::Mutex;

use crate::controller::{Controller, Strategy};
use crate::error::StoreResult;
use crate::vector::VectorStore;

/// Controller that runs every read, increment and sum under a single mutex.
///
/// Simplest correct strategy and the slowest under contention: sessions
/// touching unrelated cells still wait for each other.
#[derive(Debug)]
pub struct GlobalLock {
    vector: VectorStore,
    lock: Mutex<()>,
}

impl GlobalLock {
    /// Creates the controller over `size` zeroed cells.
    pub fn create(size: i64) -> StoreResult<Self> {
        Ok(Self {
            vector: VectorStore::create(size)?,
            lock: Mutex::new(()),
        })
    }
}

impl Controller for GlobalLock {
    fn read(&self, index: i64) -> StoreResult<i64> {
        let slot = self.vector.slot(index)?;
        let _guard = self.lock.lock();
        Ok(self.vector.raw_read(slot))
    }

    fn increment(&self, index: i64) -> StoreResult<i64> {
        let slot = self.vector.slot(index)?;
        let _guard = self.lock.lock();
        let value = self.vector.raw_increment(slot);
        self.vector.record_write();
        Ok(value)
    }

    fn total_sum(&self) -> i64 {
        let _guard = self.lock.lock();
        self.vector.total_sum()
    }

    fn write_count(&self) -> u64 {
        self.vector.write_count()
    }

    fn len(&self) -> usize {
        self.vector.len()
    }

    fn strategy(&self) -> Strategy {
        Strategy::Global
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_no_lost_updates_on_one_cell() {
        let store = Arc::new(GlobalLock::create(4).unwrap());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        store.increment(3).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("Thread panicked");
        }

        assert_eq!(store.read(3).unwrap(), 8000);
        assert_eq!(store.write_count(), 8000);
        assert_eq!(store.total_sum(), 8000);
    }
}
