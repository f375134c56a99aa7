//! Benchmark profiles and drivers for the tagheap allocator.
//!
//! - [`RANGE_PROFILES`]: the size ranges the range benchmark sweeps
//! - [`run_range`]: allocate a workload, free about half, reallocate
//!   those, then free everything
//! - [`RangeHeap`]: the allocators `run_range` compares

#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::ptr::NonNull;

use tagheap_pool::{Pool, SharedPool};
use tagheap_test_utils::Workload;

/// One sweep of the range benchmark.
#[derive(Clone, Copy, Debug)]
pub struct RangeProfile {
    /// Smallest maximum object size, in bytes.
    pub from: usize,
    /// Largest maximum object size, in bytes. Sizes double from `from`.
    pub to: usize,
    /// Objects per workload.
    pub count: usize,
}

impl RangeProfile {
    /// Maximum object sizes visited by this sweep.
    pub fn max_sizes(&self) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(Some(self.from), |&n| n.checked_mul(2))
            .take_while(move |&n| n <= self.to)
    }
}

/// Small, medium, and large object sweeps.
pub const RANGE_PROFILES: &[RangeProfile] = &[
    RangeProfile {
        from: 32,
        to: 64,
        count: 100_000,
    },
    RangeProfile {
        from: 128,
        to: 512,
        count: 100_000,
    },
    RangeProfile {
        from: 1024,
        to: 10 * 1024,
        count: 10_000,
    },
    RangeProfile {
        from: 20 * 1024,
        to: 256 * 1024,
        count: 1_000,
    },
];

/// An allocator driven by [`run_range`].
pub trait RangeHeap {
    /// Handle to one live block.
    type Block;

    /// Allocate `size > 0` bytes.
    fn alloc(&mut self, size: usize) -> Self::Block;

    /// Release a block from `alloc`.
    fn release(&mut self, block: Self::Block);
}

/// The global allocator, through `Vec<u8>` buffers.
#[derive(Debug, Default)]
pub struct SystemHeap;

impl RangeHeap for SystemHeap {
    type Block = Vec<u8>;

    fn alloc(&mut self, size: usize) -> Vec<u8> {
        Vec::with_capacity(size)
    }

    fn release(&mut self, block: Vec<u8>) {
        drop(block);
    }
}

#[allow(unsafe_code)]
impl RangeHeap for Pool {
    type Block = NonNull<u8>;

    fn alloc(&mut self, size: usize) -> NonNull<u8> {
        self.allocate(size).expect("workload sizes are nonzero")
    }

    fn release(&mut self, block: NonNull<u8>) {
        // SAFETY: blocks only come from `alloc` on this pool.
        unsafe { self.free(block) }.expect("block belongs to this pool");
    }
}

#[allow(unsafe_code)]
impl RangeHeap for SharedPool {
    type Block = NonNull<u8>;

    fn alloc(&mut self, size: usize) -> NonNull<u8> {
        self.allocate(size).expect("workload sizes are nonzero")
    }

    fn release(&mut self, block: NonNull<u8>) {
        // SAFETY: blocks only come from `alloc` on this pool.
        unsafe { self.free(block) }.expect("block belongs to this pool");
    }
}

/// Allocate every item, free the churned ones, reallocate them at their
/// second size, then free everything. Returns the number of operations.
pub fn run_range<H: RangeHeap>(heap: &mut H, workload: &Workload) -> usize {
    let mut slots: Vec<Option<H::Block>> = workload
        .items
        .iter()
        .map(|item| Some(heap.alloc(item.size)))
        .collect();
    let mut ops = slots.len();

    for (slot, item) in slots.iter_mut().zip(&workload.items) {
        if item.churn {
            if let Some(block) = slot.take() {
                heap.release(block);
                ops += 1;
            }
        }
    }
    for (slot, item) in slots.iter_mut().zip(&workload.items) {
        if slot.is_none() {
            *slot = Some(heap.alloc(item.resize));
            ops += 1;
        }
    }
    for block in slots.into_iter().flatten() {
        heap.release(block);
        ops += 1;
    }
    ops
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiles_double_up_to_their_bound() {
        let sizes: Vec<_> = RANGE_PROFILES[1].max_sizes().collect();
        assert_eq!(sizes, vec![128, 256, 512]);
        let sizes: Vec<_> = RANGE_PROFILES[2].max_sizes().collect();
        assert_eq!(sizes, vec![1024, 2048, 4096, 8192]);
    }

    #[test]
    fn range_run_leaves_pool_empty() {
        let workload = Workload::random(1, 2_000, 256);
        let mut pool = Pool::new(256, workload.len()).unwrap();
        let ops = run_range(&mut pool, &workload);
        let churned = workload.items.iter().filter(|i| i.churn).count();
        assert_eq!(ops, 2 * workload.len() + 2 * churned);
        assert_eq!(pool.allocated_space(), 0);
    }

    #[test]
    fn system_heap_runs_the_same_workload() {
        let workload = Workload::random(2, 500, 64);
        assert!(run_range(&mut SystemHeap, &workload) >= 2 * workload.len());
    }
}
