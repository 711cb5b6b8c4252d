//! Configuration for the First-In First-Out (FIFO) cache.
//!
//! FIFO caches here hold small integer values keyed by cell index, so the
//! entry count is the only limit.

use core::fmt;
use core::num::NonZeroUsize;

/// Configuration for a FIFO cache.
///
/// # Examples
///
/// ```
/// use counter_store::config::FifoCacheConfig;
/// use counter_store::FifoCache;
/// use core::num::NonZeroUsize;
///
/// let config = FifoCacheConfig {
///     capacity: NonZeroUsize::new(128).unwrap(),
/// };
/// let cache: FifoCache<i64, i64> = FifoCache::init(config, None);
/// assert_eq!(cache.cap().get(), 128);
/// ```
#[derive(Clone, Copy)]
pub struct FifoCacheConfig {
    /// Maximum number of entries the cache can hold.
    pub capacity: NonZeroUsize,
}

impl fmt::Debug for FifoCacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FifoCacheConfig")
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_config_creation() {
        let config = FifoCacheConfig {
            capacity: NonZeroUsize::new(1000).unwrap(),
        };
        assert_eq!(config.capacity.get(), 1000);
    }
}
