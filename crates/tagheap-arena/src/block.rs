//! Block geometry: word size, minimum block size, and size classes.
//!
//! All arena bookkeeping is in words. A block always carries one header
//! word and one trailing word (footer when busy, size mirror when free),
//! and must be large enough to hold a free-list node between them once it
//! is released.

/// Size of the accounting unit in bytes.
pub const WORD_BYTES: usize = std::mem::size_of::<usize>();

/// Words taken by a free-list node: `start`, `size`, `prev`, `next`.
pub(crate) const NODE_WORDS: usize = 4;

/// Smallest block the arena will ever create, in words.
pub const MIN_BLOCK_WORDS: usize = NODE_WORDS + 2;

/// Smallest block the arena will ever create, in bytes.
pub const MIN_BLOCK_BYTES: usize = MIN_BLOCK_WORDS * WORD_BYTES;

/// Words added to every arena on top of the requested capacity.
pub(crate) const ARENA_OVERHEAD_WORDS: usize = 3;

/// Distance between words written at construction to commit pages.
pub(crate) const TOUCH_STRIDE_WORDS: usize = MIN_BLOCK_WORDS * 4;

/// Link value meaning "no node".
pub(crate) const NIL: usize = usize::MAX;

/// Size class of a block of `words` words.
///
/// Class 0 holds every block up to `MIN_BLOCK_WORDS + 1` words; class `k`
/// covers `MIN_BLOCK_WORDS + [2^k, 2^(k+1))`.
#[inline]
pub fn size_class(words: usize) -> usize {
    if words <= MIN_BLOCK_WORDS {
        return 0;
    }
    (words - MIN_BLOCK_WORDS).ilog2() as usize
}

/// Block size in words needed to serve a request of `bytes` bytes.
///
/// Adds the two boundary words, clamps to the minimum block and rounds up
/// to a whole word. Returns `None` if the computation overflows.
#[inline]
pub fn request_words(bytes: usize) -> Option<usize> {
    let with_tags = bytes.checked_add(2 * WORD_BYTES)?;
    Some(with_tags.max(MIN_BLOCK_BYTES).div_ceil(WORD_BYTES))
}

/// One block as seen by a heap walk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockInfo {
    /// Word offset of the block header from the arena start.
    pub offset_words: usize,
    /// Block size in words, including both boundary words.
    pub words: usize,
    /// Whether the block is currently handed out.
    pub busy: bool,
}

impl BlockInfo {
    /// Block size in bytes.
    pub fn bytes(&self) -> usize {
        self.words * WORD_BYTES
    }
}
