//! The `reader-writer` strategy.

use parking_lot::RwLock;

use crate::controller::{Controller, Strategy};
use crate::error::StoreResult;
use crate::vector::VectorStore;

/// Controller with one reader/writer lock.
///
/// Reads and sums share the lock, increments take it exclusively, so a sum
/// always reflects some serialization of the writers (not necessarily the
/// latest one by the time the caller sees it).
#[derive(Debug)]
pub struct ReaderWriterLock {
    vector: VectorStore,
    lock: RwLock<()>,
}

impl ReaderWriterLock {
    /// Creates the controller over `size` zeroed cells.
    pub fn create(size: i64) -> StoreResult<Self> {
        Ok(Self {
            vector: VectorStore::create(size)?,
            lock: RwLock::new(()),
        })
    }
}

impl Controller for ReaderWriterLock {
    fn read(&self, index: i64) -> StoreResult<i64> {
        let slot = self.vector.slot(index)?;
        let _guard = self.lock.read();
        Ok(self.vector.raw_read(slot))
    }

    fn increment(&self, index: i64) -> StoreResult<i64> {
        let slot = self.vector.slot(index)?;
        let _guard = self.lock.write();
        let value = self.vector.raw_increment(slot);
        self.vector.record_write();
        Ok(value)
    }

    fn total_sum(&self) -> i64 {
        let _guard = self.lock.read();
        self.vector.total_sum()
    }

    fn write_count(&self) -> u64 {
        self.vector.write_count()
    }

    fn len(&self) -> usize {
        self.vector.len()
    }

    fn strategy(&self) -> Strategy {
        Strategy::ReaderWriter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_sums_never_run_ahead_of_writes() {
        let store = Arc::new(ReaderWriterLock::create(16).unwrap());
        let done = Arc::new(AtomicBool::new(false));

        let writers: Vec<_> = (0..4)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..1000 {
                        store.increment((t * 4 + i % 4) as i64).unwrap();
                    }
                })
            })
            .collect();

        let reader = {
            let store = Arc::clone(&store);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                while !done.load(Ordering::Acquire) {
                    let before = store.write_count();
                    let sum = store.total_sum();
                    let after = store.write_count();
                    assert!(sum as u64 >= before);
                    assert!(sum as u64 <= after);
                }
            })
        };

        for writer in writers {
            writer.join().expect("Thread panicked");
        }
        done.store(true, Ordering::Release);
        reader.join().expect("Thread panicked");

        assert_eq!(store.total_sum(), 4000);
        assert_eq!(store.write_count(), 4000);
    }
}
