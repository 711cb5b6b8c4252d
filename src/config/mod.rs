//! Store Configuration Module
//!
//! Configuration structures for the store, its optional read cache and the
//! per-connection sessions. Structs have public fields and are built in one
//! expression; [`StoreConfig::validate`] checks the combination before anything
//! is allocated.
//!
//! | Config | Used by | Description |
//! |--------|---------|-------------|
//! | [`StoreConfig`] | [`Store::open`](crate::Store::open) | vector size, strategy, optional cache |
//! | [`CacheConfig`] | [`ReadThroughCache`](crate::read_through::ReadThroughCache) | capacity and backing read path |
//! | [`FifoCacheConfig`] | [`FifoCache`](crate::FifoCache) | capacity only |
//! | [`SessionConfig`] | [`Session`](crate::session::Session) | idle timeout, line length limit |
//!
//! # Examples
//!
//! ```
//! use counter_store::config::{BackendKind, CacheConfig, StoreConfig};
//! use counter_store::Strategy;
//! use core::num::NonZeroUsize;
//!
//! let config = StoreConfig {
//!     size: 1000,
//!     strategy: Strategy::ReaderWriter,
//!     cache: Some(CacheConfig {
//!         capacity: NonZeroUsize::new(64).unwrap(),
//!         backend: BackendKind::Controller,
//!     }),
//! };
//! assert!(config.validate().is_ok());
//! ```

pub mod fifo;

pub use fifo::FifoCacheConfig;

use core::fmt;
use core::num::NonZeroUsize;
use std::time::Duration;

use crate::controller::Strategy;
use crate::error::{StoreError, StoreResult};

/// Default idle timeout for a session read.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Default limit on the bytes in one client line, terminator excluded.
pub const DEFAULT_MAX_LINE_LEN: usize = 1024;

/// Where a cache miss fetches its value from.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// A plain controller read of the live cell.
    Controller,
    /// A stand-in for a slow external store that answers `index * multiplier`.
    Simulated {
        /// Factor applied to the index.
        multiplier: i64,
    },
}

impl fmt::Debug for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Controller => f.write_str("Controller"),
            BackendKind::Simulated { multiplier } => f
                .debug_struct("Simulated")
                .field("multiplier", multiplier)
                .finish(),
        }
    }
}

/// Configuration for the read cache in front of the store.
#[derive(Clone, Copy)]
pub struct CacheConfig {
    /// Maximum number of cached indices.
    pub capacity: NonZeroUsize,
    /// Backing read path used on a miss.
    pub backend: BackendKind,
}

impl fmt::Debug for CacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheConfig")
            .field("capacity", &self.capacity)
            .field("backend", &self.backend)
            .finish()
    }
}

/// Top-level store configuration.
#[derive(Clone, Copy)]
pub struct StoreConfig {
    /// Number of cells. Must be positive.
    pub size: i64,
    /// Concurrency-control discipline.
    pub strategy: Strategy,
    /// Read cache, if enabled.
    pub cache: Option<CacheConfig>,
}

impl StoreConfig {
    /// Checks the configuration without building anything.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidSize`] for a non-positive size, and
    /// [`StoreError::InvalidConfig`] for a vector too large to address.
    pub fn validate(&self) -> StoreResult<()> {
        if self.size <= 0 {
            return Err(StoreError::InvalidSize { size: self.size });
        }
        if usize::try_from(self.size).is_err() {
            return Err(StoreError::InvalidConfig {
                reason: format!("vector size {} does not fit in memory", self.size),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("size", &self.size)
            .field("strategy", &self.strategy)
            .field("cache", &self.cache)
            .finish()
    }
}

/// Per-connection settings.
#[derive(Clone, Copy)]
pub struct SessionConfig {
    /// Longest wait for a single client line. `None` waits forever.
    pub idle_timeout: Option<Duration>,
    /// Longest accepted line, terminator excluded. A longer count line ends
    /// the session; a longer request line is rejected and skipped.
    pub max_line_len: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Some(DEFAULT_IDLE_TIMEOUT),
            max_line_len: DEFAULT_MAX_LINE_LEN,
        }
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("idle_timeout", &self.idle_timeout)
            .field("max_line_len", &self.max_line_len)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_size() {
        let mut config = StoreConfig {
            size: 10,
            strategy: Strategy::Global,
            cache: None,
        };
        assert!(config.validate().is_ok());

        config.size = 0;
        assert!(matches!(
            config.validate(),
            Err(StoreError::InvalidSize { size: 0 })
        ));
        config.size = -5;
        assert!(matches!(
            config.validate(),
            Err(StoreError::InvalidSize { size: -5 })
        ));
    }

    #[test]
    fn test_session_default_timeout() {
        let config = SessionConfig::default();
        assert_eq!(config.idle_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.max_line_len, 1024);
    }
}
