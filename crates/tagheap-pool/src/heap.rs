//! Runtime choice between a locked and an unlocked pool.

use std::ptr::NonNull;

use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::pool::Pool;
use crate::shared::SharedPool;

/// A pool whose locking is decided by [`PoolConfig::thread_safe`].
#[derive(Debug)]
pub enum Heap {
    /// No lock; usable from one thread at a time.
    Exclusive(Pool),
    /// Every operation holds one mutex.
    Shared(SharedPool),
}

impl Heap {
    /// Build the pool described by `config`.
    pub fn new(config: &PoolConfig) -> Result<Self, PoolError> {
        if config.thread_safe {
            SharedPool::with_config(config).map(Self::Shared)
        } else {
            Pool::with_config(config).map(Self::Exclusive)
        }
    }

    /// Whether operations are serialized by a lock.
    pub fn is_thread_safe(&self) -> bool {
        matches!(self, Self::Shared(_))
    }

    /// See [`Pool::try_allocate`].
    pub fn try_allocate(&mut self, size: usize) -> Result<Option<NonNull<u8>>, PoolError> {
        match self {
            Self::Exclusive(pool) => pool.try_allocate(size),
            Self::Shared(pool) => pool.try_allocate(size),
        }
    }

    /// See [`Pool::allocate`].
    pub fn allocate(&mut self, size: usize) -> Option<NonNull<u8>> {
        match self {
            Self::Exclusive(pool) => pool.allocate(size),
            Self::Shared(pool) => pool.allocate(size),
        }
    }

    /// See [`Pool::free`].
    ///
    /// # Safety
    ///
    /// Same contract as [`Pool::free`].
    #[allow(unsafe_code)]
    pub unsafe fn free(&mut self, ptr: NonNull<u8>) -> Result<(), PoolError> {
        // SAFETY: forwarded caller contract.
        unsafe {
            match self {
                Self::Exclusive(pool) => pool.free(ptr),
                Self::Shared(pool) => pool.free(ptr),
            }
        }
    }

    /// Total free bytes across all arenas.
    pub fn free_space(&self) -> usize {
        match self {
            Self::Exclusive(pool) => pool.free_space(),
            Self::Shared(pool) => pool.free_space(),
        }
    }

    /// Total bytes held by busy blocks across all arenas.
    pub fn allocated_space(&self) -> usize {
        match self {
            Self::Exclusive(pool) => pool.allocated_space(),
            Self::Shared(pool) => pool.allocated_space(),
        }
    }
}

#[cfg(test)]
#[allow(unsafe_code)]
mod tests {
    use super::*;

    #[test]
    fn flag_selects_variant() {
        let unlocked = PoolConfig::new(64, 4).build().unwrap();
        assert!(!unlocked.is_thread_safe());
        let locked = PoolConfig::new(64, 4).thread_safe(true).build().unwrap();
        assert!(locked.is_thread_safe());
    }

    #[test]
    fn both_variants_allocate_and_free() {
        for thread_safe in [false, true] {
            let mut heap = PoolConfig::new(64, 4)
                .thread_safe(thread_safe)
                .build()
                .unwrap();
            let before = heap.free_space();
            let p = heap.allocate(64).unwrap();
            assert!(heap.free_space() < before);
            unsafe { heap.free(p) }.unwrap();
            assert_eq!(heap.free_space(), before);
            assert_eq!(heap.allocated_space(), 0);
            assert_eq!(heap.try_allocate(0).unwrap(), None);
        }
    }

    #[test]
    fn invalid_config_fails_to_build() {
        let err = PoolConfig::new(0, 4).build().unwrap_err();
        assert!(matches!(err, PoolError::InvalidConfig { .. }));
    }
}
