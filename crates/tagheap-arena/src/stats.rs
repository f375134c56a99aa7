//! Point-in-time arena diagnostics.

/// Occupancy snapshot of a single [`Arena`](crate::Arena).
///
/// All sizes are in bytes. Computing it walks every free list, so it is
/// O(free blocks) like [`Arena::free_space`](crate::Arena::free_space).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArenaStats {
    /// Size of the backing buffer.
    pub total_bytes: usize,
    /// Bytes currently handed out, including boundary tags.
    pub allocated_bytes: usize,
    /// Bytes held by free blocks.
    pub free_bytes: usize,
    /// Number of free blocks across all size classes.
    pub free_blocks: usize,
    /// Largest single free block, the biggest block a request could get.
    pub largest_free_block: usize,
}

impl ArenaStats {
    /// Fraction of free memory that is not in the largest free block.
    ///
    /// 0.0 means all free space is contiguous; values near 1.0 mean it is
    /// scattered across many small blocks.
    pub fn fragmentation(&self) -> f64 {
        if self.free_bytes == 0 {
            return 0.0;
        }
        1.0 - self.largest_free_block as f64 / self.free_bytes as f64
    }
}
