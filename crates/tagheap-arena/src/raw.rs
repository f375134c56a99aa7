//! Word-addressed backing storage.
//!
//! [`WordBuffer`] is the only place in the crate that touches raw memory.
//! Every metadata access goes through [`WordBuffer::get`] and
//! [`WordBuffer::set`], which bounds-check the word index. Payload
//! pointers handed to callers are derived from the same base pointer, so
//! caller writes and metadata accesses never go through overlapping
//! references.

#![allow(unsafe_code)]

use std::alloc::{self, Layout};
use std::ops::Range;
use std::ptr::NonNull;

use crate::block::WORD_BYTES;
use crate::error::ArenaError;

/// A fixed-length, zero-initialised buffer of machine words.
pub(crate) struct WordBuffer {
    base: NonNull<usize>,
    len: usize,
}

// SAFETY: the buffer exclusively owns its allocation; moving it to another
// thread moves that ownership with it.
unsafe impl Send for WordBuffer {}

impl WordBuffer {
    /// Reserve `len` zeroed words.
    pub(crate) fn new(len: usize) -> Result<Self, ArenaError> {
        let layout = Self::layout(len)?;
        // SAFETY: `len` is at least one, so the layout has a nonzero size.
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let base = NonNull::new(raw.cast::<usize>()).ok_or(ArenaError::BackingAllocFailed {
            bytes: layout.size(),
        })?;
        Ok(Self { base, len })
    }

    fn layout(len: usize) -> Result<Layout, ArenaError> {
        if len == 0 {
            return Err(ArenaError::InvalidCapacity);
        }
        Layout::array::<usize>(len).map_err(|_| ArenaError::CapacityOverflow {
            requested: len.saturating_mul(WORD_BYTES),
        })
    }

    /// Number of words in the buffer.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Read the word at `index`.
    #[inline]
    pub(crate) fn get(&self, index: usize) -> usize {
        assert!(index < self.len, "word {index} out of bounds ({})", self.len);
        // SAFETY: `index` is in bounds and the buffer was zero-initialised.
        unsafe { self.base.as_ptr().add(index).read() }
    }

    /// Write `value` to the word at `index`.
    #[inline]
    pub(crate) fn set(&mut self, index: usize, value: usize) {
        assert!(index < self.len, "word {index} out of bounds ({})", self.len);
        // SAFETY: `index` is in bounds; `&mut self` excludes concurrent metadata access.
        unsafe { self.base.as_ptr().add(index).write(value) }
    }

    /// Write one word every `stride` words so the OS commits the pages now
    /// rather than on first use.
    pub(crate) fn touch(&mut self, stride: usize) {
        for index in (0..self.len).step_by(stride.max(1)) {
            self.set(index, 0);
        }
    }

    /// Byte pointer to the word at `index`.
    #[inline]
    pub(crate) fn addr(&self, index: usize) -> NonNull<u8> {
        assert!(index < self.len, "word {index} out of bounds ({})", self.len);
        // SAFETY: `index` is in bounds, so the offset stays inside the allocation.
        unsafe { self.base.add(index) }.cast()
    }

    /// Word index of an address inside the buffer.
    pub(crate) fn index_of(&self, addr: usize) -> Result<usize, ArenaError> {
        let range = self.range();
        if !range.contains(&addr) {
            return Err(ArenaError::OutOfRange { addr });
        }
        let offset = addr - range.start;
        if offset % WORD_BYTES != 0 {
            return Err(ArenaError::Misaligned { addr });
        }
        Ok(offset / WORD_BYTES)
    }

    /// `[start, end)` byte addresses covered by the buffer.
    #[inline]
    pub(crate) fn range(&self) -> Range<usize> {
        let start = self.base.as_ptr() as usize;
        start..start + self.len * WORD_BYTES
    }
}

impl Drop for WordBuffer {
    fn drop(&mut self) {
        if let Ok(layout) = Self::layout(self.len) {
            // SAFETY: `base` came from `alloc_zeroed` with this exact layout.
            unsafe { alloc::dealloc(self.base.as_ptr().cast(), layout) }
        }
    }
}
