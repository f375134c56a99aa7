//! The single-arena allocator.
//!
//! [`Arena`] serves variable-size requests from one fixed buffer. Requests
//! are rounded up to whole words plus two boundary words, matched against
//! the free lists by an ascending size-class sweep (first fit within each
//! class), and split when the leftover is big enough to stand as its own
//! block. Releases merge with free neighbours on both sides in O(1).

use std::fmt;
use std::ops::Range;
use std::ptr::NonNull;

use tracing::debug;

use crate::block::{
    request_words, size_class, BlockInfo, ARENA_OVERHEAD_WORDS, MIN_BLOCK_BYTES, MIN_BLOCK_WORDS,
    TOUCH_STRIDE_WORDS, WORD_BYTES,
};
use crate::buckets::FreeLists;
use crate::error::ArenaError;
use crate::raw::WordBuffer;
use crate::stats::ArenaStats;

/// One contiguous, fixed-capacity heap.
///
/// The address range of an arena is fixed at construction and never
/// changes, so a pool can route a pointer back to its arena by address.
/// Invariant: free-block words plus `allocated_words` always equal the
/// capacity.
pub struct Arena {
    /// Backing storage, `capacity` words.
    words: WordBuffer,
    /// Bucket heads, one per size class up to the class of the whole arena.
    free_lists: FreeLists,
    /// Words currently held by busy blocks, boundary tags included.
    allocated_words: usize,
}

impl Arena {
    /// Create an arena able to hold at least `capacity_bytes` bytes.
    ///
    /// The capacity is raised to one minimum block if smaller, and three
    /// words of slack are added. Pages are touched up front so the first
    /// allocations do not fault.
    pub fn new(capacity_bytes: usize) -> Result<Self, ArenaError> {
        if capacity_bytes == 0 {
            return Err(ArenaError::InvalidCapacity);
        }
        let capacity = capacity_bytes.max(MIN_BLOCK_BYTES) / WORD_BYTES + ARENA_OVERHEAD_WORDS;

        let mut words = WordBuffer::new(capacity)?;
        words.touch(TOUCH_STRIDE_WORDS);

        let mut free_lists = FreeLists::new(size_class(capacity) + 1);
        free_lists.insert(&mut words, 0, capacity);

        debug!(
            requested = capacity_bytes,
            total_bytes = capacity * WORD_BYTES,
            classes = free_lists.class_count(),
            "arena created"
        );

        Ok(Self {
            words,
            free_lists,
            allocated_words: 0,
        })
    }

    /// Allocate at least `size` bytes.
    ///
    /// Returns `None` for a zero-size request or when no free block is
    /// large enough. The returned pointer is word aligned and stays valid
    /// until it is passed to [`free`](Self::free) or the arena is dropped.
    pub fn allocate(&mut self, size: usize) -> Option<NonNull<u8>> {
        if size == 0 {
            return None;
        }
        let mut need = request_words(size)?;
        if need > self.capacity() - self.allocated_words {
            return None;
        }

        let block = self.free_lists.first_fit(&self.words, need)?;
        let found = FreeLists::size_of(&self.words, block);
        self.free_lists.remove(&mut self.words, block);

        let remainder = found - need;
        if remainder < MIN_BLOCK_WORDS {
            need = found;
        } else {
            self.free_lists.insert(&mut self.words, block + need, remainder);
        }

        self.words.set(block, need);
        self.words.set(block + need - 1, 0);
        self.allocated_words += need;

        Some(self.words.addr(block + 1))
    }

    /// Release a block previously returned by [`allocate`](Self::allocate).
    ///
    /// The block is merged with a free left and/or right neighbour and the
    /// result is filed under its new size class. Pointers outside the arena,
    /// misaligned pointers, and pointers whose boundary tags do not describe
    /// a busy block are rejected before any state changes.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `allocate` on this arena and must not
    /// have been freed since. A stale pointer into a region that has been
    /// merged or reallocated can pass the tag checks and corrupt the arena.
    #[allow(unsafe_code)]
    pub unsafe fn free(&mut self, ptr: NonNull<u8>) -> Result<(), ArenaError> {
        let addr = ptr.as_ptr() as usize;
        let payload = self.words.index_of(addr)?;
        if payload == 0 {
            return Err(ArenaError::NotAllocated { addr });
        }
        let mut start = payload - 1;
        let mut size = self.words.get(start);
        if size == 0 {
            return Err(ArenaError::NotAllocated { addr });
        }
        self.check_busy(start, size)?;

        self.allocated_words -= size;

        if start != 0 {
            let left = self.words.get(start - 1);
            if left != 0 {
                start -= left;
                debug_assert_eq!(FreeLists::size_of(&self.words, start), left);
                self.free_lists.remove(&mut self.words, start);
                size += left;
            }
        }

        let end = start + size;
        if end < self.capacity() && self.words.get(end) == 0 {
            let right = FreeLists::size_of(&self.words, end);
            debug_assert_eq!(self.words.get(end + right - 1), right);
            self.free_lists.remove(&mut self.words, end);
            size += right;
        }

        self.free_lists.insert(&mut self.words, start, size);
        Ok(())
    }

    fn check_busy(&self, start: usize, size: usize) -> Result<(), ArenaError> {
        if size < MIN_BLOCK_WORDS || size > self.capacity() - start {
            return Err(ArenaError::CorruptBlock {
                offset: start,
                reason: "header size is out of bounds",
            });
        }
        if self.words.get(start + size - 1) != 0 {
            return Err(ArenaError::CorruptBlock {
                offset: start,
                reason: "busy block footer was overwritten",
            });
        }
        Ok(())
    }

    /// Total bytes in free blocks. O(free blocks).
    pub fn free_space(&self) -> usize {
        self.free_lists
            .iter(&self.words)
            .map(|node| node.size)
            .sum::<usize>()
            * WORD_BYTES
    }

    /// Bytes held by busy blocks, boundary tags included.
    pub fn allocated_space(&self) -> usize {
        self.allocated_words * WORD_BYTES
    }

    /// Size of the backing buffer in bytes.
    pub fn total_size(&self) -> usize {
        self.capacity() * WORD_BYTES
    }

    /// Smallest block the arena hands out, in bytes.
    ///
    /// Any request up to this size minus two words costs exactly this much.
    pub const fn min_alloc_size() -> usize {
        MIN_BLOCK_BYTES
    }

    /// `[start, end)` byte addresses owned by this arena.
    pub fn range(&self) -> Range<usize> {
        self.words.range()
    }

    /// Whether `ptr` points into this arena's buffer.
    pub fn contains(&self, ptr: *const u8) -> bool {
        self.range().contains(&(ptr as usize))
    }

    /// Number of size classes (buckets).
    pub fn class_count(&self) -> usize {
        self.free_lists.class_count()
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.words.len()
    }

    /// Occupancy snapshot.
    pub fn stats(&self) -> ArenaStats {
        let mut stats = ArenaStats {
            total_bytes: self.total_size(),
            allocated_bytes: self.allocated_space(),
            ..ArenaStats::default()
        };
        for node in self.free_lists.iter(&self.words) {
            let bytes = node.size * WORD_BYTES;
            stats.free_bytes += bytes;
            stats.free_blocks += 1;
            stats.largest_free_block = stats.largest_free_block.max(bytes);
        }
        stats
    }

    /// Walk every block in address order.
    pub fn blocks(&self) -> Blocks<'_> {
        Blocks {
            words: &self.words,
            offset: 0,
        }
    }

    /// Check every structural invariant of the arena.
    ///
    /// Walks the blocks in address order (sizes, footers, size mirrors, no
    /// two adjacent free blocks), checks every free-list link, and confirms
    /// that the lists and the walk agree on the free total and that busy
    /// blocks add up to the allocated total.
    pub fn verify(&self) -> Result<(), ArenaError> {
        let corrupt = |offset, reason| ArenaError::CorruptBlock { offset, reason };
        let capacity = self.capacity();

        let mut offset = 0;
        let mut busy_words = 0;
        let mut free_words = 0;
        let mut free_blocks = 0;
        let mut prev_free = false;
        while offset < capacity {
            if capacity - offset < MIN_BLOCK_WORDS {
                return Err(corrupt(offset, "block runs past the arena end"));
            }
            let header = self.words.get(offset);
            let size = if header != 0 {
                header
            } else {
                FreeLists::size_of(&self.words, offset)
            };
            if size < MIN_BLOCK_WORDS {
                return Err(corrupt(offset, "block is smaller than the minimum block"));
            }
            if size > capacity - offset {
                return Err(corrupt(offset, "block runs past the arena end"));
            }
            let tail = self.words.get(offset + size - 1);
            if header != 0 {
                if tail != 0 {
                    return Err(corrupt(offset, "busy block footer was overwritten"));
                }
                busy_words += size;
                prev_free = false;
            } else {
                if tail != size {
                    return Err(corrupt(offset, "size mirror does not match node size"));
                }
                if prev_free {
                    return Err(corrupt(offset, "adjacent free blocks were not merged"));
                }
                free_words += size;
                free_blocks += 1;
                prev_free = true;
            }
            offset += size;
        }

        if busy_words != self.allocated_words {
            return Err(corrupt(0, "allocated total does not match busy blocks"));
        }

        self.free_lists
            .check(&self.words)
            .map_err(|(offset, reason)| corrupt(offset, reason))?;

        let (listed_blocks, listed_words) = self
            .free_lists
            .iter(&self.words)
            .fold((0, 0), |(n, w), node| (n + 1, w + node.size));
        if listed_blocks != free_blocks || listed_words != free_words {
            return Err(corrupt(0, "free lists disagree with the heap walk"));
        }
        Ok(())
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let range = self.range();
        f.debug_struct("Arena")
            .field("range", &format_args!("{:#x}..{:#x}", range.start, range.end))
            .field("total_bytes", &self.total_size())
            .field("allocated_bytes", &self.allocated_space())
            .field("classes", &self.class_count())
            .finish()
    }
}

/// Iterator over the blocks of an [`Arena`] in address order.
///
/// Stops early if it meets a block whose size cannot be right; use
/// [`Arena::verify`] to find out why.
pub struct Blocks<'a> {
    words: &'a WordBuffer,
    offset: usize,
}

impl Iterator for Blocks<'_> {
    type Item = BlockInfo;

    fn next(&mut self) -> Option<BlockInfo> {
        let capacity = self.words.len();
        if self.offset >= capacity || capacity - self.offset < MIN_BLOCK_WORDS {
            return None;
        }
        let header = self.words.get(self.offset);
        let busy = header != 0;
        let words = if busy {
            header
        } else {
            FreeLists::size_of(self.words, self.offset)
        };
        if words < MIN_BLOCK_WORDS || words > capacity - self.offset {
            self.offset = capacity;
            return None;
        }
        let info = BlockInfo {
            offset_words: self.offset,
            words,
            busy,
        };
        self.offset += words;
        Some(info)
    }
}
