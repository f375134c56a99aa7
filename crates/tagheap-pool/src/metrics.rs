//! Cumulative routing counters for a pool.
//!
//! [`PoolMetrics`] shows how well the current-arena cache is working and
//! how often the pool has had to grow.

/// Counters accumulated over the lifetime of a [`Pool`](crate::Pool).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PoolMetrics {
    /// Allocations served by the current arena.
    pub alloc_cache_hits: u64,
    /// Allocations the current arena could not serve.
    pub alloc_cache_misses: u64,
    /// Cache misses served by scanning the other arenas.
    pub alloc_scan_hits: u64,
    /// Arenas added to serve a request.
    pub growth_events: u64,
    /// Of those, arenas sized for one oversized request.
    pub oversized_growth_events: u64,
    /// Successful frees whose pointer belonged to the current arena.
    pub free_cache_hits: u64,
    /// Successful frees that needed a range lookup.
    pub free_cache_misses: u64,
    /// Frees rejected before touching any arena state.
    pub rejected_frees: u64,
}

impl PoolMetrics {
    /// Fraction of allocations served by the current arena.
    pub fn alloc_hit_rate(&self) -> f64 {
        let total = self.alloc_cache_hits + self.alloc_cache_misses;
        if total == 0 {
            return 0.0;
        }
        self.alloc_cache_hits as f64 / total as f64
    }
}
