//! Concurrency Controller
//!
//! Wraps the [`VectorStore`](crate::vector::VectorStore) with one of four
//! concurrency-control strategies. The strategy is picked once when the store
//! is built and stays fixed for the store's lifetime.
//!
//! # Strategies
//!
//! | Strategy | Type | `read` | `increment` | `total_sum` |
//! |----------|------|--------|-------------|-------------|
//! | `none` | [`Unsynchronized`] | no lock | no lock (updates can be lost) | no lock |
//! | `global` | [`GlobalLock`] | global mutex | global mutex | global mutex |
//! | `per-index` | [`PerIndexLock`] | cell mutex | cell mutex | no lock (mixed snapshot) |
//! | `reader-writer` | [`ReaderWriterLock`] | shared | exclusive | shared |
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │  Global                    PerIndex                  ReaderWriter     │
//! │                                                                      │
//! │  ┌───────┐           ┌─────┐┌─────┐     ┌─────┐        ┌────────┐    │
//! │  │ Mutex │           │Mutex││Mutex│ ... │Mutex│        │ RwLock │    │
//! │  └───┬───┘           └──┬──┘└──┬──┘     └──┬──┘        └───┬────┘    │
//! │      ▼                  ▼      ▼           ▼               ▼         │
//! │  [c0 c1 ... cN-1]      [c0     c1   ...   cN-1]     [c0 c1 ... cN-1] │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Why keep the unsynchronized strategy?
//!
//! The store exists to compare disciplines. `none` shows what the others
//! prevent: two sessions that bump the same cell at the same time can both
//! read the old value and one increment disappears. The global write counter
//! is still an atomic, so a lost update shows up as `sum < write_count`.
//!
//! ## Per-index sums
//!
//! [`PerIndexLock::total_sum`] scans the cells without taking any lock. A scan
//! that runs while writers touch different cells may see some cells before and
//! some after their increment. Each cell value is real, the combination may
//! never have existed at a single instant. This is accepted for the per-index
//! strategy and not papered over.
//!
//! # Example
//!
//! ```
//! use counter_store::controller::{self, Strategy};
//!
//! let store = controller::build(Strategy::PerIndex, 10).unwrap();
//! assert_eq!(store.increment(2).unwrap(), 1);
//! assert_eq!(store.read(2).unwrap(), 1);
//! assert!(store.read(10).is_err());
//! assert_eq!(store.write_count(), 1);
//! ```

mod global;
mod per_index;
mod reader_writer;
mod unsynchronized;

use core::fmt;
use core::str::FromStr;
use std::sync::Arc;

use crate::error::{StoreError, StoreResult};

pub use self::global::GlobalLock;
pub use self::per_index::PerIndexLock;
pub use self::reader_writer::ReaderWriterLock;
pub use self::unsynchronized::Unsynchronized;

/// The concurrency-control discipline guarding the vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Strategy {
    /// No synchronization at all.
    None,
    /// One mutex for the whole vector.
    Global,
    /// One mutex per cell.
    #[default]
    PerIndex,
    /// One reader/writer lock for the whole vector.
    ReaderWriter,
}

impl Strategy {
    /// All strategies, in the order they appear in the docs.
    pub const ALL: [Strategy; 4] = [
        Strategy::None,
        Strategy::Global,
        Strategy::PerIndex,
        Strategy::ReaderWriter,
    ];

    /// Canonical selector string, as accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::None => "none",
            Strategy::Global => "global",
            Strategy::PerIndex => "per-index",
            Strategy::ReaderWriter => "reader-writer",
        }
    }

    /// Returns `true` if concurrent increments to one cell can be lost.
    pub fn may_lose_updates(&self) -> bool {
        matches!(self, Strategy::None)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "unsynchronized" => Ok(Strategy::None),
            "global" | "global-lock" => Ok(Strategy::Global),
            "per-index" | "per_index" | "perindex" => Ok(Strategy::PerIndex),
            "reader-writer" | "reader_writer" | "rw" | "rwlock" => Ok(Strategy::ReaderWriter),
            other => Err(StoreError::InvalidConfig {
                reason: format!(
                    "unknown strategy {other:?} (expected none, global, per-index or reader-writer)"
                ),
            }),
        }
    }
}

/// Synchronized access to the shared vector.
///
/// Every implementation upholds the same contract: indices outside
/// `[0, len)` yield [`StoreError::IndexOutOfRange`] and never touch state, and
/// each successful [`increment`](Controller::increment) bumps the write
/// counter exactly once.
pub trait Controller: Send + Sync + fmt::Debug {
    /// Reads one cell.
    fn read(&self, index: i64) -> StoreResult<i64>;

    /// Adds one to a cell, returning the new value.
    fn increment(&self, index: i64) -> StoreResult<i64>;

    /// Sum of all cells. See the module docs for per-strategy consistency.
    fn total_sum(&self) -> i64;

    /// Number of successful increments since creation.
    fn write_count(&self) -> u64;

    /// Number of cells.
    fn len(&self) -> usize;

    /// Always `false`: a controller wraps at least one cell.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The strategy this controller implements.
    fn strategy(&self) -> Strategy;
}

/// Shared handle to a controller, cloned into every session.
pub type SharedController = Arc<dyn Controller>;

/// Builds a controller of the requested strategy over `size` zeroed cells.
///
/// # Errors
///
/// Returns [`StoreError::InvalidSize`] if `size` is not positive.
pub fn build(strategy: Strategy, size: i64) -> StoreResult<SharedController> {
    let controller: SharedController = match strategy {
        Strategy::None => Arc::new(Unsynchronized::create(size)?),
        Strategy::Global => Arc::new(GlobalLock::create(size)?),
        Strategy::PerIndex => Arc::new(PerIndexLock::create(size)?),
        Strategy::ReaderWriter => Arc::new(ReaderWriterLock::create(size)?),
    };
    Ok(controller)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_parse_round_trip() {
        for strategy in Strategy::ALL {
            assert_eq!(strategy.as_str().parse::<Strategy>().unwrap(), strategy);
        }
        assert_eq!("RW".parse::<Strategy>().unwrap(), Strategy::ReaderWriter);
        assert_eq!("Per_Index".parse::<Strategy>().unwrap(), Strategy::PerIndex);
        assert!("striped".parse::<Strategy>().is_err());
    }

    #[test]
    fn test_build_every_strategy() {
        for strategy in Strategy::ALL {
            let store = build(strategy, 5).unwrap();
            assert_eq!(store.strategy(), strategy);
            assert_eq!(store.len(), 5);
            assert_eq!(store.increment(4).unwrap(), 1);
            assert_eq!(store.read(4).unwrap(), 1);
            assert_eq!(store.total_sum(), 1);
            assert_eq!(store.write_count(), 1);
        }
    }

    #[test]
    fn test_out_of_range_leaves_state_alone() {
        for strategy in Strategy::ALL {
            let store = build(strategy, 3).unwrap();
            store.increment(0).unwrap();
            for index in [-1, 3, i64::MAX, i64::MIN] {
                assert!(matches!(
                    store.read(index),
                    Err(StoreError::IndexOutOfRange { .. })
                ));
                assert!(matches!(
                    store.increment(index),
                    Err(StoreError::IndexOutOfRange { .. })
                ));
            }
            assert_eq!(store.total_sum(), 1);
            assert_eq!(store.write_count(), 1);
        }
    }

    #[test]
    fn test_build_rejects_bad_size() {
        for strategy in Strategy::ALL {
            assert!(matches!(
                build(strategy, 0),
                Err(StoreError::InvalidSize { size: 0 })
            ));
        }
    }
}
