//! One process-wide pool behind the adapter.
//!
//! The pool is created by [`init`] and destroyed by [`teardown`]; every
//! other function fails with [`AllocError::NotInitialized`] in between.
//! Access always goes through a static `Mutex`. `thread_safe` only picks
//! whether the pool itself also carries a lock.
//!
//! [`GlobalPool`] exposes the same pool to `allocator-api2` containers.

#![allow(unsafe_code)]

use std::alloc::Layout;
use std::ptr::NonNull;
use std::sync::{Mutex, MutexGuard, PoisonError};

use allocator_api2::alloc::{AllocError as ContainerAllocError, Allocator};
use tagheap_pool::{Heap, PoolConfig};
use tracing::{debug, warn};

use crate::adapter::PoolAlloc;
use crate::error::AllocError;

static GLOBAL: Mutex<Option<PoolAlloc<Heap>>> = Mutex::new(None);

fn global() -> MutexGuard<'static, Option<PoolAlloc<Heap>>> {
    GLOBAL.lock().unwrap_or_else(PoisonError::into_inner)
}

fn with_global<R>(f: impl FnOnce(&mut PoolAlloc<Heap>) -> R) -> Result<R, AllocError> {
    let mut guard = global();
    let alloc = guard.as_mut().ok_or(AllocError::NotInitialized)?;
    Ok(f(alloc))
}

/// Create the process-wide pool.
pub fn init(thread_safe: bool, est_max_size: usize, est_count: usize) -> Result<(), AllocError> {
    init_with_config(&PoolConfig::new(est_max_size, est_count).thread_safe(thread_safe))
}

/// Create the process-wide pool from a config.
///
/// Fails with [`AllocError::AlreadyInitialized`] if a pool exists.
pub fn init_with_config(config: &PoolConfig) -> Result<(), AllocError> {
    let mut guard = global();
    if guard.is_some() {
        return Err(AllocError::AlreadyInitialized);
    }
    *guard = Some(PoolAlloc::new(config.build()?));
    debug!(thread_safe = config.thread_safe, "global pool initialised");
    Ok(())
}

/// Destroy the process-wide pool. Returns whether one existed.
///
/// Every pointer the pool handed out is dangling afterwards.
pub fn teardown() -> bool {
    let pool = global().take();
    if pool.is_some() {
        debug!("global pool torn down");
    }
    pool.is_some()
}

/// Whether [`init`] has run without a matching [`teardown`].
pub fn is_initialized() -> bool {
    global().is_some()
}

/// Allocate a block for `layout` from the process-wide pool.
pub fn allocate(layout: Layout) -> Result<NonNull<u8>, AllocError> {
    with_global(|alloc| alloc.allocate(layout))?
}

/// Release a block from [`allocate`].
///
/// # Safety
///
/// `ptr` must come from [`allocate`] with the same `layout`, since the
/// last [`init`], and must not have been released since.
pub unsafe fn deallocate(ptr: NonNull<u8>, layout: Layout) -> Result<(), AllocError> {
    // SAFETY: forwarded caller contract.
    with_global(|alloc| unsafe { alloc.deallocate(ptr, layout) })?
}

/// Allocate uninitialised room for `count` values of `T`.
pub fn allocate_array<T>(count: usize) -> Result<NonNull<T>, AllocError> {
    with_global(|alloc| alloc.allocate_array::<T>(count))?
}

/// Release an array from [`allocate_array`]. The values are not dropped.
///
/// # Safety
///
/// `ptr` and `count` must match one earlier [`allocate_array`] call since
/// the last [`init`], and the array must not have been released since.
pub unsafe fn deallocate_array<T>(ptr: NonNull<T>, count: usize) -> Result<(), AllocError> {
    // SAFETY: forwarded caller contract.
    with_global(|alloc| unsafe { alloc.deallocate_array(ptr, count) })?
}

/// Free bytes in the process-wide pool.
pub fn free_space() -> Result<usize, AllocError> {
    with_global(|alloc| alloc.free_space())
}

/// Bytes held by live blocks in the process-wide pool.
pub fn allocated_space() -> Result<usize, AllocError> {
    with_global(|alloc| alloc.allocated_space())
}

/// A zero-sized [`Allocator`] over the process-wide pool.
///
/// Containers built with it, such as `allocator_api2::vec::Vec<T, GlobalPool>`
/// or `hashbrown::HashMap<K, V, _, GlobalPool>`, keep their storage in the
/// pool until they are dropped. They must be dropped before [`teardown`].
/// Allocation fails while no pool is initialised.
#[derive(Clone, Copy, Debug, Default)]
pub struct GlobalPool;

unsafe impl Allocator for GlobalPool {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, ContainerAllocError> {
        match allocate(layout) {
            Ok(ptr) => Ok(NonNull::slice_from_raw_parts(ptr, layout.size())),
            Err(err) => {
                debug!(%err, size = layout.size(), "global pool refused a container block");
                Err(ContainerAllocError)
            }
        }
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: the container hands back a block from `allocate` with its layout.
        if let Err(err) = unsafe { deallocate(ptr, layout) } {
            warn!(%err, "container released a block the global pool rejected");
        }
    }
}
