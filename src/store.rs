//! The shared store handed to every session.
//!
//! [`Store`] bundles the controller, the optional read cache and a few session
//! counters. It is created once at startup and shared behind an `Arc`; there is
//! no process-wide instance.

use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::StoreConfig;
use crate::controller::{self, SharedController, Strategy};
use crate::error::StoreResult;
use crate::read_through::ReadThroughCache;

/// Controller plus optional cache, shared by all sessions.
#[derive(Debug)]
pub struct Store {
    controller: SharedController,
    cache: Option<ReadThroughCache>,
    stats: StoreStats,
}

impl Store {
    /// Validates `config` and builds the store it describes.
    pub fn open(config: StoreConfig) -> StoreResult<Arc<Self>> {
        config.validate()?;
        let controller = controller::build(config.strategy, config.size)?;
        let cache = config
            .cache
            .as_ref()
            .map(|cache| ReadThroughCache::from_config(cache, &controller));
        Ok(Arc::new(Self {
            controller,
            cache,
            stats: StoreStats::default(),
        }))
    }

    /// Reads a cell, through the cache when one is configured.
    pub fn read(&self, index: i64) -> StoreResult<i64> {
        match &self.cache {
            Some(cache) => cache.read_through(index),
            None => self.controller.read(index),
        }
    }

    /// Increments a cell and refreshes its cache entry.
    pub fn write(&self, index: i64) -> StoreResult<i64> {
        let value = self.controller.increment(index)?;
        if let Some(cache) = &self.cache {
            cache.write_through(index, value);
        }
        Ok(value)
    }

    /// Sum of all cells, with the controller's consistency guarantee.
    pub fn total_sum(&self) -> i64 {
        self.controller.total_sum()
    }

    /// Number of successful writes since creation.
    pub fn write_count(&self) -> u64 {
        self.controller.write_count()
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.controller.len()
    }

    /// Always `false`: a store has at least one cell.
    pub fn is_empty(&self) -> bool {
        self.controller.is_empty()
    }

    /// Strategy guarding the cells.
    pub fn strategy(&self) -> Strategy {
        self.controller.strategy()
    }

    /// The controller, for callers that must bypass the cache.
    pub fn controller(&self) -> &SharedController {
        &self.controller
    }

    /// The read cache, if enabled.
    pub fn cache(&self) -> Option<&ReadThroughCache> {
        self.cache.as_ref()
    }

    /// Session lifecycle counters.
    pub fn stats(&self) -> SessionStats {
        self.stats.snapshot()
    }

    pub(crate) fn session_opened(&self) {
        self.stats.opened.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn session_closed(&self, completed: bool) {
        let counter = if completed {
            &self.stats.completed
        } else {
            &self.stats.failed
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Default)]
struct StoreStats {
    opened: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
}

impl StoreStats {
    fn snapshot(&self) -> SessionStats {
        SessionStats {
            opened: self.opened.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the session counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Sessions that reached the handshake.
    pub opened: u64,
    /// Sessions that sent their final report.
    pub completed: u64,
    /// Sessions that ended on an error.
    pub failed: u64,
}

impl SessionStats {
    /// Sessions opened but not yet closed.
    pub fn active(&self) -> u64 {
        self.opened.saturating_sub(self.completed + self.failed)
    }
}
