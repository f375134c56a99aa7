//! `Layout`-aware allocation over a [`RawHeap`].

#![allow(unsafe_code)]

use std::alloc::Layout;
use std::num::NonZeroUsize;
use std::ptr::NonNull;

use tagheap_arena::WORD_BYTES;
use tagheap_pool::PoolError;

use crate::error::AllocError;
use crate::heap::RawHeap;

/// Aligned and typed allocation on top of a byte heap.
///
/// For `align > 1` the request grows by `align - 1 + WORD` bytes. The
/// returned pointer is the first `align` boundary at least one word past
/// the heap block, and the heap block's address is stored in the word just
/// before it. For `align == 1` the heap block is returned as is.
///
/// Zero-size layouts never reach the heap; they get a dangling pointer
/// aligned to the layout, and deallocating one is a no-op.
#[derive(Debug)]
pub struct PoolAlloc<H> {
    heap: H,
}

impl<H: RawHeap> PoolAlloc<H> {
    /// Wrap a heap.
    pub fn new(heap: H) -> Self {
        Self { heap }
    }

    /// The wrapped heap.
    pub fn heap(&self) -> &H {
        &self.heap
    }

    /// Unwrap the heap.
    pub fn into_inner(self) -> H {
        self.heap
    }

    /// Free bytes in the wrapped heap.
    pub fn free_space(&self) -> usize {
        self.heap.free_space()
    }

    /// Bytes held by live blocks in the wrapped heap.
    pub fn allocated_space(&self) -> usize {
        self.heap.allocated_space()
    }

    /// Allocate a block for `layout`.
    pub fn allocate(&mut self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        allocate_aligned(&mut self.heap, layout)
    }

    /// Release a block from [`allocate`](Self::allocate).
    ///
    /// # Safety
    ///
    /// `ptr` must come from `allocate` on this adapter with the same
    /// `layout`, and must not have been released since.
    pub unsafe fn deallocate(
        &mut self,
        ptr: NonNull<u8>,
        layout: Layout,
    ) -> Result<(), AllocError> {
        // SAFETY: forwarded caller contract.
        unsafe { deallocate_aligned(&mut self.heap, ptr, layout) }
    }

    /// Allocate uninitialised room for `count` values of `T`.
    pub fn allocate_array<T>(&mut self, count: usize) -> Result<NonNull<T>, AllocError> {
        let layout = Layout::array::<T>(count).map_err(|_| AllocError::LayoutOverflow)?;
        self.allocate(layout).map(NonNull::cast)
    }

    /// Release an array from [`allocate_array`](Self::allocate_array).
    ///
    /// The values are not dropped.
    ///
    /// # Safety
    ///
    /// `ptr` and `count` must match one earlier `allocate_array::<T>` call
    /// on this adapter, and the array must not have been released since.
    pub unsafe fn deallocate_array<T>(
        &mut self,
        ptr: NonNull<T>,
        count: usize,
    ) -> Result<(), AllocError> {
        let layout = Layout::array::<T>(count).map_err(|_| AllocError::LayoutOverflow)?;
        // SAFETY: forwarded caller contract.
        unsafe { self.deallocate(ptr.cast(), layout) }
    }
}

/// Allocate a block for `layout` from `heap`, padding and aligning by hand
/// when `layout.align() > 1`.
pub(crate) fn allocate_aligned<H: RawHeap + ?Sized>(
    heap: &mut H,
    layout: Layout,
) -> Result<NonNull<u8>, AllocError> {
    if layout.size() == 0 {
        return Ok(dangling(layout));
    }
    if layout.align() == 1 {
        return raw_allocate(heap, layout.size());
    }

    let padding = layout.align() - 1 + WORD_BYTES;
    let padded = layout
        .size()
        .checked_add(padding)
        .ok_or(AllocError::LayoutOverflow)?;
    let raw = raw_allocate(heap, padded)?;

    let raw_addr = raw.as_ptr() as usize;
    let aligned_addr = (raw_addr + padding) & !(layout.align() - 1);
    // SAFETY: `aligned_addr - raw_addr` lies in `[WORD, padding]`, and
    // `aligned + size` stays within the `padded` bytes of `raw`. Heap
    // blocks are word aligned and so is every `align` boundary above
    // one word, which makes the back-pointer slot aligned.
    unsafe {
        let aligned = raw.as_ptr().add(aligned_addr - raw_addr);
        aligned.cast::<*mut u8>().sub(1).write(raw.as_ptr());
        Ok(NonNull::new_unchecked(aligned))
    }
}

/// Release a block from [`allocate_aligned`].
///
/// # Safety
///
/// `ptr` must come from `allocate_aligned` on `heap` with the same
/// `layout`, and must not have been released since.
pub(crate) unsafe fn deallocate_aligned<H: RawHeap + ?Sized>(
    heap: &mut H,
    ptr: NonNull<u8>,
    layout: Layout,
) -> Result<(), AllocError> {
    if layout.size() == 0 {
        return Ok(());
    }
    let raw = if layout.align() == 1 {
        ptr
    } else {
        // SAFETY: `allocate_aligned` wrote the heap pointer one word below.
        let stored = unsafe { ptr.as_ptr().cast::<*mut u8>().sub(1).read() };
        NonNull::new(stored).ok_or(AllocError::Pool(PoolError::ForeignPointer {
            addr: ptr.as_ptr() as usize,
        }))?
    };
    // SAFETY: `raw` is the block `allocate_aligned` got from the heap.
    unsafe { heap.free_bytes(raw) }.map_err(AllocError::from)
}

fn raw_allocate<H: RawHeap + ?Sized>(
    heap: &mut H,
    size: usize,
) -> Result<NonNull<u8>, AllocError> {
    heap.try_allocate_bytes(size)?
        .ok_or(AllocError::Pool(PoolError::OutOfMemory { requested: size }))
}

/// A non-null pointer aligned to `layout.align()` that owns no memory.
fn dangling(layout: Layout) -> NonNull<u8> {
    let addr = NonZeroUsize::new(layout.align()).unwrap_or(NonZeroUsize::MIN);
    NonNull::<u8>::dangling().with_addr(addr)
}
