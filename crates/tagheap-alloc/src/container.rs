//! Container allocators.
//!
//! [`SharedAlloc`] borrows a [`SharedPool`] and implements
//! [`allocator_api2::alloc::Allocator`], so `allocator_api2::vec::Vec`,
//! `hashbrown::HashMap` and any other `allocator-api2` container can keep
//! their storage in the pool. Alignment follows [`PoolAlloc`](crate::PoolAlloc).

#![allow(unsafe_code)]

use std::alloc::Layout;
use std::ptr::NonNull;

use allocator_api2::alloc::{AllocError as ContainerAllocError, Allocator};
use tagheap_pool::SharedPool;
use tracing::warn;

use crate::adapter::{allocate_aligned, deallocate_aligned};

/// A copyable handle that allocates from a borrowed [`SharedPool`].
///
/// Every call takes the pool's lock, so handles may be used from any
/// thread and containers may move between threads.
#[derive(Clone, Copy, Debug)]
pub struct SharedAlloc<'a> {
    pool: &'a SharedPool,
}

impl<'a> SharedAlloc<'a> {
    /// Allocate from `pool`.
    pub fn new(pool: &'a SharedPool) -> Self {
        Self { pool }
    }

    /// The borrowed pool.
    pub fn pool(&self) -> &'a SharedPool {
        self.pool
    }
}

unsafe impl Allocator for SharedAlloc<'_> {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, ContainerAllocError> {
        let ptr = self
            .pool
            .with_pool(|pool| allocate_aligned(pool, layout))
            .map_err(|_| ContainerAllocError)?;
        Ok(NonNull::slice_from_raw_parts(ptr, layout.size()))
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: the container hands back a block from `allocate` with its layout.
        let freed = self.pool.with_pool(|pool| unsafe { deallocate_aligned(pool, ptr, layout) });
        if let Err(err) = freed {
            warn!(%err, "container released a block the pool rejected");
        }
    }
}
