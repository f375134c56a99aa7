//! A pool behind one exclusive lock.

use std::ptr::NonNull;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::metrics::PoolMetrics;
use crate::pool::Pool;

/// A [`Pool`] that can be shared between threads.
///
/// Every operation, including `free_space`, holds the lock for its whole
/// duration, so allocations and frees from different threads are
/// serialized. Any thread may free a block allocated by any other.
#[derive(Debug)]
pub struct SharedPool {
    inner: Mutex<Pool>,
}

impl SharedPool {
    /// Create a locked pool from size estimates.
    pub fn new(est_max_size: usize, est_count: usize) -> Result<Self, PoolError> {
        Pool::new(est_max_size, est_count).map(Self::from_pool)
    }

    /// Create a locked pool from a config.
    pub fn with_config(config: &PoolConfig) -> Result<Self, PoolError> {
        Pool::with_config(config).map(Self::from_pool)
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: Pool) -> Self {
        Self {
            inner: Mutex::new(pool),
        }
    }

    /// Take the pool back out of the lock.
    pub fn into_inner(self) -> Pool {
        self.inner
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // Poison is ignored. Pool operations only panic on failed bounds checks.
    fn lock(&self) -> MutexGuard<'_, Pool> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// See [`Pool::try_allocate`].
    pub fn try_allocate(&self, size: usize) -> Result<Option<NonNull<u8>>, PoolError> {
        self.lock().try_allocate(size)
    }

    /// See [`Pool::allocate`].
    pub fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        self.lock().allocate(size)
    }

    /// See [`Pool::free`].
    ///
    /// # Safety
    ///
    /// Same contract as [`Pool::free`]. The block may have been allocated
    /// on any thread.
    #[allow(unsafe_code)]
    pub unsafe fn free(&self, ptr: NonNull<u8>) -> Result<(), PoolError> {
        // SAFETY: forwarded caller contract.
        unsafe { self.lock().free(ptr) }
    }

    /// Total free bytes across all arenas.
    pub fn free_space(&self) -> usize {
        self.lock().free_space()
    }

    /// Total bytes held by busy blocks across all arenas.
    pub fn allocated_space(&self) -> usize {
        self.lock().allocated_space()
    }

    /// Number of arenas.
    pub fn arena_count(&self) -> usize {
        self.lock().arena_count()
    }

    /// Snapshot of the routing counters.
    pub fn metrics(&self) -> PoolMetrics {
        self.lock().metrics().clone()
    }

    /// Run `f` with the lock held.
    pub fn with_pool<R>(&self, f: impl FnOnce(&mut Pool) -> R) -> R {
        f(&mut self.lock())
    }
}
