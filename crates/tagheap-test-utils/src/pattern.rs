//! Byte patterns for overlap detection.
//!
//! Each live allocation is filled with a pattern derived from a per-block
//! tag. If two allocations overlap, or an allocation overlaps allocator
//! metadata, at least one block's pattern will no longer check out.

#![allow(unsafe_code)]

use std::ptr::NonNull;

#[inline]
fn byte_at(tag: u32, i: usize) -> u8 {
    (tag as usize).wrapping_mul(31).wrapping_add(i) as u8
}

/// Fill `len` bytes at `ptr` with the pattern for `tag`.
///
/// # Safety
///
/// `ptr` must be valid for writes of `len` bytes.
pub unsafe fn fill(ptr: NonNull<u8>, len: usize, tag: u32) {
    // SAFETY: the caller guarantees `len` writable bytes at `ptr`.
    let bytes = unsafe { std::slice::from_raw_parts_mut(ptr.as_ptr(), len) };
    for (i, b) in bytes.iter_mut().enumerate() {
        *b = byte_at(tag, i);
    }
}

/// Whether the `len` bytes at `ptr` still hold the pattern for `tag`.
///
/// # Safety
///
/// `ptr` must be valid for reads of `len` bytes.
pub unsafe fn check(ptr: NonNull<u8>, len: usize, tag: u32) -> bool {
    // SAFETY: the caller guarantees `len` readable bytes at `ptr`.
    let bytes = unsafe { std::slice::from_raw_parts(ptr.as_ptr(), len) };
    bytes.iter().enumerate().all(|(i, &b)| b == byte_at(tag, i))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_then_check() {
        let mut buf = vec![0u8; 64];
        let ptr = NonNull::new(buf.as_mut_ptr()).unwrap();
        unsafe {
            fill(ptr, 64, 7);
            assert!(check(ptr, 64, 7));
            assert!(!check(ptr, 64, 8));
        }
    }

    #[test]
    fn overwrite_is_detected() {
        let mut buf = vec![0u8; 32];
        let ptr = NonNull::new(buf.as_mut_ptr()).unwrap();
        unsafe { fill(ptr, 32, 1) };
        buf[10] ^= 0xFF;
        let ptr = NonNull::new(buf.as_mut_ptr()).unwrap();
        assert!(!unsafe { check(ptr, 32, 1) });
    }
}
