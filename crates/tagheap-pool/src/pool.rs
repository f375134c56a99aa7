//! The unlocked multi-arena pool.

use std::alloc::{handle_alloc_error, Layout};
use std::fmt;
use std::ptr::NonNull;

use smallvec::SmallVec;
use tagheap_arena::{Arena, ArenaError, WORD_BYTES};
use tracing::{debug, error, trace, warn};

use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::metrics::PoolMetrics;

/// A growing set of arenas used as one heap.
///
/// Arenas are kept sorted by the end of their address range so `free` can
/// find the owner of a pointer with one binary search. Arenas are never
/// released before the pool is dropped; dropping the pool releases all of
/// them and invalidates every pointer it handed out.
pub struct Pool {
    arenas: SmallVec<[Arena; PoolConfig::STANDARD_ARENA_LIMIT]>,
    /// Index into `arenas` of the arena tried first.
    current: usize,
    standard_arena_size: usize,
    metrics: PoolMetrics,
}

impl Pool {
    /// Create an unlocked pool from size estimates.
    ///
    /// See [`PoolConfig`] for how the estimates size the arenas.
    pub fn new(est_max_size: usize, est_count: usize) -> Result<Self, PoolError> {
        Self::with_config(&PoolConfig::new(est_max_size, est_count))
    }

    /// Create a pool from a validated config. `config.thread_safe` is
    /// ignored here; see [`SharedPool`](crate::SharedPool).
    pub fn with_config(config: &PoolConfig) -> Result<Self, PoolError> {
        config.validate()?;
        let standard_arena_size = config.standard_arena_size();
        let count = config.initial_arena_count();

        let mut arenas: SmallVec<[Arena; PoolConfig::STANDARD_ARENA_LIMIT]> =
            SmallVec::with_capacity(count);
        for _ in 0..count {
            arenas.push(Arena::new(standard_arena_size)?);
        }
        let first = arenas[0].range().start;
        arenas.sort_unstable_by_key(|a| a.range().end);
        let current = arenas
            .iter()
            .position(|a| a.range().start == first)
            .unwrap_or(0);

        debug!(
            arenas = count,
            standard_arena_size,
            est_max_size = config.est_max_size,
            est_count = config.est_count,
            "pool created"
        );

        Ok(Self {
            arenas,
            current,
            standard_arena_size,
            metrics: PoolMetrics::default(),
        })
    }

    /// Allocate at least `size` bytes, growing the pool if needed.
    ///
    /// Returns `Ok(None)` for a zero-size request. Fails only when a new
    /// arena cannot be created or cannot serve the request.
    pub fn try_allocate(&mut self, size: usize) -> Result<Option<NonNull<u8>>, PoolError> {
        if size == 0 {
            return Ok(None);
        }
        if let Some(ptr) = self.arenas[self.current].allocate(size) {
            self.metrics.alloc_cache_hits += 1;
            return Ok(Some(ptr));
        }
        self.metrics.alloc_cache_misses += 1;

        let skip = self.current;
        for (index, arena) in self.arenas.iter_mut().enumerate() {
            if index == skip {
                continue;
            }
            if let Some(ptr) = arena.allocate(size) {
                trace!(size, from = skip, to = index, "allocation moved to another arena");
                self.current = index;
                self.metrics.alloc_scan_hits += 1;
                return Ok(Some(ptr));
            }
        }

        let index = self.grow(size)?;
        self.arenas[index]
            .allocate(size)
            .map(Some)
            .ok_or(PoolError::OutOfMemory { requested: size })
    }

    /// Allocate at least `size` bytes.
    ///
    /// Returns `None` for a zero-size request. If the pool cannot grow this
    /// aborts through [`handle_alloc_error`], like the global allocator.
    pub fn allocate(&mut self, size: usize) -> Option<NonNull<u8>> {
        match self.try_allocate(size) {
            Ok(ptr) => ptr,
            Err(err) => {
                error!(%err, size, "pool exhausted");
                let layout = Layout::from_size_align(size, WORD_BYTES)
                    .unwrap_or_else(|_| Layout::new::<usize>());
                handle_alloc_error(layout)
            }
        }
    }

    /// Release a block to the arena that owns it.
    ///
    /// Pointers that no arena owns are rejected with
    /// [`PoolError::ForeignPointer`] and leave the pool untouched. On
    /// success the owning arena becomes the current arena.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `allocate` on this pool and not
    /// freed since.
    #[allow(unsafe_code)]
    pub unsafe fn free(&mut self, ptr: NonNull<u8>) -> Result<(), PoolError> {
        let addr = ptr.as_ptr() as usize;
        let cached = self.arenas[self.current].range().contains(&addr);
        let owner = if cached {
            Some(self.current)
        } else {
            trace!(addr = format_args!("{addr:#x}"), "free outside current arena");
            self.owner_of(addr)
        };
        let Some(index) = owner else {
            self.metrics.rejected_frees += 1;
            warn!(addr = format_args!("{addr:#x}"), "free of pointer outside every arena");
            return Err(PoolError::ForeignPointer { addr });
        };

        // SAFETY: the caller's contract is the arena's contract.
        let freed = unsafe { self.arenas[index].free(ptr) };
        if let Err(err) = freed {
            self.metrics.rejected_frees += 1;
            warn!(%err, arena = index, "free rejected by arena");
            return Err(err.into());
        }
        if cached {
            self.metrics.free_cache_hits += 1;
        } else {
            self.metrics.free_cache_misses += 1;
        }
        self.current = index;
        Ok(())
    }

    /// Index of the arena whose range contains `addr`, by binary search.
    fn owner_of(&self, addr: usize) -> Option<usize> {
        let index = self.arenas.partition_point(|a| a.range().end <= addr);
        let arena = self.arenas.get(index)?;
        (arena.range().start <= addr).then_some(index)
    }

    /// Add one arena able to serve `size` bytes and make it current.
    ///
    /// Ordinary requests get a standard arena. Requests at least as large
    /// as a standard arena get a dedicated one of twice their size.
    fn grow(&mut self, size: usize) -> Result<usize, PoolError> {
        let oversized = size >= self.standard_arena_size;
        let bytes = if oversized {
            size.checked_mul(2).ok_or(PoolError::OutOfMemory { requested: size })?
        } else {
            self.standard_arena_size
        };

        let arena = Arena::new(bytes).map_err(|err| match err {
            ArenaError::CapacityOverflow { .. } => PoolError::OutOfMemory { requested: size },
            other => PoolError::Arena(other),
        })?;
        let end = arena.range().end;
        let index = self.arenas.partition_point(|a| a.range().end < end);
        self.arenas.insert(index, arena);
        self.current = index;

        self.metrics.growth_events += 1;
        if oversized {
            self.metrics.oversized_growth_events += 1;
        }
        debug!(
            size,
            arena_bytes = bytes,
            arenas = self.arenas.len(),
            oversized,
            "pool grew"
        );
        Ok(index)
    }

    /// Total free bytes across all arenas.
    pub fn free_space(&self) -> usize {
        self.arenas.iter().map(Arena::free_space).sum()
    }

    /// Total bytes held by busy blocks across all arenas.
    pub fn allocated_space(&self) -> usize {
        self.arenas.iter().map(Arena::allocated_space).sum()
    }

    /// Total capacity in bytes across all arenas.
    pub fn total_size(&self) -> usize {
        self.arenas.iter().map(Arena::total_size).sum()
    }

    /// Number of arenas.
    pub fn arena_count(&self) -> usize {
        self.arenas.len()
    }

    /// Size in bytes requested for every standard arena.
    pub fn standard_arena_size(&self) -> usize {
        self.standard_arena_size
    }

    /// Index of the arena tried first by the next allocation.
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// The arena at `index` in end-address order.
    pub fn arena(&self, index: usize) -> Option<&Arena> {
        self.arenas.get(index)
    }

    /// The arenas, sorted by end address.
    pub fn arenas(&self) -> &[Arena] {
        &self.arenas
    }

    /// Routing counters.
    pub fn metrics(&self) -> &PoolMetrics {
        &self.metrics
    }

    /// Whether `ptr` lies inside any arena of this pool.
    pub fn contains(&self, ptr: *const u8) -> bool {
        self.arenas.iter().any(|a| a.contains(ptr))
    }

    /// Verify every arena and the ordering of their ranges.
    pub fn verify(&self) -> Result<(), PoolError> {
        for arena in &self.arenas {
            arena.verify()?;
        }
        for pair in self.arenas.windows(2) {
            if pair[0].range().end > pair[1].range().start {
                return Err(PoolError::Arena(ArenaError::CorruptBlock {
                    offset: 0,
                    reason: "arena ranges overlap or are out of order",
                }));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("arenas", &self.arenas.len())
            .field("current", &self.current)
            .field("standard_arena_size", &self.standard_arena_size)
            .field("free_space", &self.free_space())
            .finish()
    }
}

#[cfg(test)]
#[allow(unsafe_code)]
mod tests {
    use super::*;
    use tagheap_arena::MIN_BLOCK_BYTES;

    fn release(pool: &mut Pool, ptr: NonNull<u8>) {
        unsafe { pool.free(ptr) }.unwrap();
    }

    #[test]
    fn zero_estimates_fail() {
        assert!(matches!(
            Pool::new(0, 4),
            Err(PoolError::InvalidConfig { .. })
        ));
        assert!(matches!(
            Pool::new(64, 0),
            Err(PoolError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn initial_arenas_are_sorted_and_disjoint() {
        let pool = Pool::new(512, 100).unwrap();
        assert_eq!(pool.arena_count(), 8);
        pool.verify().unwrap();
        assert!(pool.current_index() < pool.arena_count());
    }

    #[test]
    fn small_estimates_make_one_min_block_arena() {
        let pool = Pool::new(1, 1).unwrap();
        assert_eq!(pool.arena_count(), 1);
        assert_eq!(pool.standard_arena_size(), MIN_BLOCK_BYTES);
    }

    #[test]
    fn zero_size_allocation_is_none() {
        let mut pool = Pool::new(64, 4).unwrap();
        let before = pool.free_space();
        assert_eq!(pool.try_allocate(0).unwrap(), None);
        assert_eq!(pool.allocate(0), None);
        assert_eq!(pool.free_space(), before);
        assert_eq!(pool.metrics().alloc_cache_hits, 0);
    }

    #[test]
    fn allocation_hits_current_arena() {
        let mut pool = Pool::new(64, 4).unwrap();
        let p = pool.allocate(32).unwrap();
        assert_eq!(pool.metrics().alloc_cache_hits, 1);
        assert!(pool.arenas()[pool.current_index()].contains(p.as_ptr()));
        release(&mut pool, p);
        assert_eq!(pool.metrics().free_cache_hits, 1);
    }

    #[test]
    fn miss_scans_other_arenas_before_growing() {
        // Two standard arenas, each fitting one 64-byte object.
        let mut pool = Pool::new(64, 2).unwrap();
        let a = pool.allocate(64).unwrap();
        let b = pool.allocate(64).unwrap();
        assert_eq!(pool.arena_count(), 2);
        assert_eq!(pool.metrics().alloc_scan_hits, 1);
        assert_eq!(pool.metrics().growth_events, 0);

        let owner = |pool: &Pool, p: NonNull<u8>| {
            pool.arenas()
                .iter()
                .position(|arena| arena.contains(p.as_ptr()))
        };
        assert_ne!(owner(&pool, a), owner(&pool, b));
        assert_eq!(owner(&pool, b), Some(pool.current_index()));
    }

    #[test]
    fn full_pool_grows_by_a_standard_arena() {
        let mut pool = Pool::new(64, 1).unwrap();
        let _a = pool.allocate(64).unwrap();
        let b = pool.allocate(64).unwrap();
        assert_eq!(pool.arena_count(), 2);
        assert_eq!(pool.metrics().growth_events, 1);
        assert_eq!(pool.metrics().oversized_growth_events, 0);
        assert!(pool.arenas()[pool.current_index()].contains(b.as_ptr()));
        pool.verify().unwrap();
    }

    #[test]
    fn oversized_request_gets_dedicated_arena() {
        let mut pool = Pool::new(64, 1).unwrap();
        let huge = pool.standard_arena_size() * 10;
        let p = pool.allocate(huge).unwrap();
        assert_eq!(pool.metrics().oversized_growth_events, 1);
        let arena = &pool.arenas()[pool.current_index()];
        assert!(arena.contains(p.as_ptr()));
        assert!(arena.total_size() >= 2 * huge);
        release(&mut pool, p);
    }

    #[test]
    fn free_routes_by_address_and_promotes_owner() {
        let mut pool = Pool::new(64, 1).unwrap();
        let a = pool.allocate(64).unwrap();
        let b = pool.allocate(64).unwrap();
        let a_owner = pool
            .arenas()
            .iter()
            .position(|arena| arena.contains(a.as_ptr()))
            .unwrap();
        assert_ne!(pool.current_index(), a_owner);

        release(&mut pool, a);
        assert_eq!(pool.metrics().free_cache_misses, 1);
        assert_eq!(pool.current_index(), a_owner);

        release(&mut pool, b);
        pool.verify().unwrap();
        assert_eq!(pool.allocated_space(), 0);
    }

    #[test]
    fn foreign_pointer_is_rejected_without_change() {
        let mut pool = Pool::new(64, 2).unwrap();
        let p = pool.allocate(16).unwrap();
        let free_before = pool.free_space();
        let current_before = pool.current_index();

        let mut outside = 0usize;
        let foreign = NonNull::from(&mut outside).cast::<u8>();
        assert!(pool.contains(p.as_ptr()));
        assert!(!pool.contains(foreign.as_ptr()));
        let err = unsafe { pool.free(foreign) }.unwrap_err();
        assert!(matches!(err, PoolError::ForeignPointer { .. }));
        assert_eq!(pool.free_space(), free_before);
        assert_eq!(pool.current_index(), current_before);
        assert_eq!(pool.metrics().rejected_frees, 1);
        assert_eq!(pool.metrics().free_cache_misses, 0);

        release(&mut pool, p);
    }

    #[test]
    fn double_free_is_reported_by_the_arena() {
        let mut pool = Pool::new(64, 1).unwrap();
        let _keep = pool.allocate(8).unwrap();
        let p = pool.allocate(8).unwrap();
        release(&mut pool, p);
        assert_eq!(pool.metrics().free_cache_hits, 1);

        let err = unsafe { pool.free(p) }.unwrap_err();
        assert!(matches!(err, PoolError::Arena(_)));
        assert_eq!(pool.metrics().free_cache_hits, 1);
        assert_eq!(pool.metrics().rejected_frees, 1);
    }

    #[test]
    fn free_space_sums_arenas() {
        let mut pool = Pool::new(128, 16).unwrap();
        let total: usize = pool.arenas().iter().map(Arena::free_space).sum();
        assert_eq!(pool.free_space(), total);
        let p = pool.allocate(100).unwrap();
        assert!(pool.free_space() < total);
        release(&mut pool, p);
        assert_eq!(pool.free_space(), total);
    }

    #[test]
    fn debug_output_is_compact() {
        let pool = Pool::new(64, 3).unwrap();
        let s = format!("{pool:?}");
        assert!(s.contains("arenas: 3"));
    }
}
