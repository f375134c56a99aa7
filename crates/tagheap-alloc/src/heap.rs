//! The byte-level heap seam the adapter is generic over.

#![allow(unsafe_code)]

use std::ptr::NonNull;

use tagheap_pool::{Heap, Pool, PoolError, SharedPool};

/// A heap that hands out word-aligned byte blocks.
///
/// # Safety
///
/// A non-null pointer returned by `try_allocate_bytes(n)` must be aligned
/// to `size_of::<usize>()`, valid for reads and writes of `n` bytes, and
/// must not overlap any other live block until it is passed to
/// `free_bytes`.
pub unsafe trait RawHeap {
    /// Allocate at least `size` bytes. `Ok(None)` only for `size == 0`.
    fn try_allocate_bytes(&mut self, size: usize) -> Result<Option<NonNull<u8>>, PoolError>;

    /// Release a block from `try_allocate_bytes`.
    ///
    /// # Safety
    ///
    /// `ptr` must come from `try_allocate_bytes` on this heap and must not
    /// have been released since.
    unsafe fn free_bytes(&mut self, ptr: NonNull<u8>) -> Result<(), PoolError>;

    /// Free bytes currently available without growing.
    fn free_space(&self) -> usize;

    /// Bytes held by live blocks, including block overhead.
    fn allocated_space(&self) -> usize;
}

unsafe impl RawHeap for Pool {
    fn try_allocate_bytes(&mut self, size: usize) -> Result<Option<NonNull<u8>>, PoolError> {
        self.try_allocate(size)
    }

    unsafe fn free_bytes(&mut self, ptr: NonNull<u8>) -> Result<(), PoolError> {
        // SAFETY: forwarded caller contract.
        unsafe { self.free(ptr) }
    }

    fn free_space(&self) -> usize {
        Pool::free_space(self)
    }

    fn allocated_space(&self) -> usize {
        Pool::allocated_space(self)
    }
}

unsafe impl RawHeap for SharedPool {
    fn try_allocate_bytes(&mut self, size: usize) -> Result<Option<NonNull<u8>>, PoolError> {
        self.try_allocate(size)
    }

    unsafe fn free_bytes(&mut self, ptr: NonNull<u8>) -> Result<(), PoolError> {
        // SAFETY: forwarded caller contract.
        unsafe { self.free(ptr) }
    }

    fn free_space(&self) -> usize {
        SharedPool::free_space(self)
    }

    fn allocated_space(&self) -> usize {
        SharedPool::allocated_space(self)
    }
}

unsafe impl RawHeap for Heap {
    fn try_allocate_bytes(&mut self, size: usize) -> Result<Option<NonNull<u8>>, PoolError> {
        self.try_allocate(size)
    }

    unsafe fn free_bytes(&mut self, ptr: NonNull<u8>) -> Result<(), PoolError> {
        // SAFETY: forwarded caller contract.
        unsafe { self.free(ptr) }
    }

    fn free_space(&self) -> usize {
        Heap::free_space(self)
    }

    fn allocated_space(&self) -> usize {
        Heap::allocated_space(self)
    }
}
