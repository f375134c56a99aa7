//! Pool sizing configuration.

use tagheap_arena::{MIN_BLOCK_BYTES, WORD_BYTES};

use crate::error::PoolError;
use crate::heap::Heap;

/// Hints describing the expected allocation profile of a pool.
///
/// The pool does not enforce either estimate; they only size the arenas
/// it creates up front and the standard size of arenas added later.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    /// Guard every operation with one exclusive lock.
    pub thread_safe: bool,
    /// Expected size of the largest object, in bytes. Must be nonzero.
    pub est_max_size: usize,
    /// Expected number of live objects. Must be nonzero.
    pub est_count: usize,
}

impl PoolConfig {
    /// Upper bound on the number of arenas created at construction.
    pub const STANDARD_ARENA_LIMIT: usize = 8;

    /// Default estimated largest object: 256 bytes.
    pub const DEFAULT_MAX_SIZE: usize = 256;

    /// Default estimated object count.
    pub const DEFAULT_COUNT: usize = 4096;

    /// Create an unlocked pool config for the given estimates.
    pub fn new(est_max_size: usize, est_count: usize) -> Self {
        Self {
            thread_safe: false,
            est_max_size,
            est_count,
        }
    }

    /// Set whether the pool is guarded by a lock.
    pub fn thread_safe(mut self, thread_safe: bool) -> Self {
        self.thread_safe = thread_safe;
        self
    }

    /// Check that both estimates are nonzero.
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.est_max_size == 0 {
            return Err(PoolError::InvalidConfig {
                reason: "est_max_size must be nonzero".into(),
            });
        }
        if self.est_count == 0 {
            return Err(PoolError::InvalidConfig {
                reason: "est_count must be nonzero".into(),
            });
        }
        Ok(())
    }

    /// Block budget for one maximum-size object, boundary words included.
    pub fn object_budget(&self) -> usize {
        if self.est_max_size < MIN_BLOCK_BYTES {
            MIN_BLOCK_BYTES
        } else {
            self.est_max_size.saturating_add(2 * WORD_BYTES)
        }
    }

    /// Number of arenas created at construction.
    pub fn initial_arena_count(&self) -> usize {
        self.est_count.min(Self::STANDARD_ARENA_LIMIT)
    }

    /// Size in bytes of every arena created for ordinary requests.
    ///
    /// The estimated total is spread over the initial arenas, but no
    /// standard arena is smaller than one maximum-size object.
    pub fn standard_arena_size(&self) -> usize {
        let budget = self.object_budget();
        let arenas = self.initial_arena_count().max(1);
        (budget.saturating_mul(self.est_count) / arenas).max(budget)
    }

    /// Build the pool this config describes.
    pub fn build(&self) -> Result<Heap, PoolError> {
        Heap::new(self)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_SIZE, Self::DEFAULT_COUNT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_estimates_are_rejected() {
        assert!(PoolConfig::new(0, 10).validate().is_err());
        assert!(PoolConfig::new(10, 0).validate().is_err());
        assert!(PoolConfig::new(10, 10).validate().is_ok());
    }

    #[test]
    fn small_objects_are_raised_to_min_block() {
        let config = PoolConfig::new(1, 1);
        assert_eq!(config.object_budget(), MIN_BLOCK_BYTES);
        assert_eq!(config.standard_arena_size(), MIN_BLOCK_BYTES);
    }

    #[test]
    fn larger_objects_get_two_words_of_overhead() {
        let config = PoolConfig::new(1024, 1);
        assert_eq!(config.object_budget(), 1024 + 2 * WORD_BYTES);
    }

    #[test]
    fn arena_count_is_capped() {
        assert_eq!(PoolConfig::new(64, 3).initial_arena_count(), 3);
        assert_eq!(PoolConfig::new(64, 1000).initial_arena_count(), 8);
    }

    #[test]
    fn standard_size_spreads_total_over_initial_arenas() {
        let config = PoolConfig::new(1024, 10 * 1024);
        let budget = 1024 + 2 * WORD_BYTES;
        assert_eq!(config.standard_arena_size(), budget * 10 * 1024 / 8);
    }

    #[test]
    fn standard_size_fits_one_max_object() {
        let config = PoolConfig::new(4096, 2);
        assert!(config.standard_arena_size() >= config.object_budget());
    }

    #[test]
    fn huge_estimates_saturate() {
        let config = PoolConfig::new(usize::MAX / 2, usize::MAX / 2);
        assert_eq!(config.standard_arena_size(), usize::MAX / 8);
    }

    #[test]
    fn builder_sets_thread_safety() {
        let config = PoolConfig::default().thread_safe(true);
        assert!(config.thread_safe);
        assert_eq!(config.est_max_size, PoolConfig::DEFAULT_MAX_SIZE);
    }
}
