//! Size-class buckets of intrusive free-list nodes.
//!
//! Each bucket is a doubly linked LIFO list. Nodes live in the second
//! through fifth words of the free block they describe; links are word
//! offsets into the arena buffer.

use smallvec::{smallvec, SmallVec};

use crate::block::{size_class, MIN_BLOCK_WORDS, NIL};
use crate::raw::WordBuffer;

const NODE_START: usize = 1;
const NODE_SIZE: usize = 2;
const NODE_PREV: usize = 3;
const NODE_NEXT: usize = 4;

/// Buckets kept inline before spilling to the heap (arenas below 2^32 words).
const INLINE_CLASSES: usize = 32;

/// The bucket array of one arena.
pub(crate) struct FreeLists {
    heads: SmallVec<[usize; INLINE_CLASSES]>,
}

impl FreeLists {
    pub(crate) fn new(classes: usize) -> Self {
        Self {
            heads: smallvec![NIL; classes],
        }
    }

    pub(crate) fn class_count(&self) -> usize {
        self.heads.len()
    }

    /// Format `[block, block + size)` as a free block and push it onto its bucket.
    pub(crate) fn insert(&mut self, words: &mut WordBuffer, block: usize, size: usize) {
        let class = size_class(size);
        let head = self.heads[class];
        words.set(block, 0);
        words.set(block + NODE_START, block);
        words.set(block + NODE_SIZE, size);
        words.set(block + NODE_PREV, NIL);
        words.set(block + NODE_NEXT, head);
        words.set(block + size - 1, size);
        if head != NIL {
            words.set(head + NODE_PREV, block);
        }
        self.heads[class] = block;
    }

    /// Unlink the free block starting at `block` from its bucket.
    pub(crate) fn remove(&mut self, words: &mut WordBuffer, block: usize) {
        debug_assert_eq!(words.get(block + NODE_START), block);
        let size = words.get(block + NODE_SIZE);
        let prev = words.get(block + NODE_PREV);
        let next = words.get(block + NODE_NEXT);
        if prev == NIL {
            self.heads[size_class(size)] = next;
        } else {
            words.set(prev + NODE_NEXT, next);
        }
        if next != NIL {
            words.set(next + NODE_PREV, prev);
        }
    }

    /// First free block of at least `need` words, sweeping classes upward
    /// from `size_class(need)` and taking the first fit within each list.
    pub(crate) fn first_fit(&self, words: &WordBuffer, need: usize) -> Option<usize> {
        let first = size_class(need);
        for &head in self.heads.get(first..)? {
            let mut node = head;
            while node != NIL {
                if words.get(node + NODE_SIZE) >= need {
                    return Some(node);
                }
                node = words.get(node + NODE_NEXT);
            }
        }
        None
    }

    /// Size in words recorded in the node of the free block at `block`.
    #[inline]
    pub(crate) fn size_of(words: &WordBuffer, block: usize) -> usize {
        words.get(block + NODE_SIZE)
    }

    /// Every free block on every list.
    pub(crate) fn iter<'a>(&'a self, words: &'a WordBuffer) -> FreeNodes<'a> {
        FreeNodes {
            lists: self,
            words,
            class: 0,
            node: self.heads.first().copied().unwrap_or(NIL),
        }
    }

    /// Check link symmetry and class membership of every node.
    pub(crate) fn check(&self, words: &WordBuffer) -> Result<(), (usize, &'static str)> {
        for (class, &head) in self.heads.iter().enumerate() {
            let mut prev = NIL;
            let mut node = head;
            while node != NIL {
                if node >= words.len() || words.len() - node < MIN_BLOCK_WORDS {
                    return Err((prev, "free-list link points outside the arena"));
                }
                if words.get(node) != 0 {
                    return Err((node, "listed block has a busy header"));
                }
                if words.get(node + NODE_START) != node {
                    return Err((node, "node start does not match block offset"));
                }
                if words.get(node + NODE_PREV) != prev {
                    return Err((node, "back link does not match predecessor"));
                }
                if size_class(words.get(node + NODE_SIZE)) != class {
                    return Err((node, "block is filed under the wrong size class"));
                }
                prev = node;
                node = words.get(node + NODE_NEXT);
            }
        }
        Ok(())
    }
}

/// A free block yielded by [`FreeLists::iter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct FreeNode {
    pub(crate) offset: usize,
    pub(crate) size: usize,
}

pub(crate) struct FreeNodes<'a> {
    lists: &'a FreeLists,
    words: &'a WordBuffer,
    class: usize,
    node: usize,
}

impl Iterator for FreeNodes<'_> {
    type Item = FreeNode;

    fn next(&mut self) -> Option<FreeNode> {
        while self.node == NIL {
            self.class += 1;
            self.node = *self.lists.heads.get(self.class)?;
        }
        let offset = self.node;
        self.node = self.words.get(offset + NODE_NEXT);
        Some(FreeNode {
            offset,
            size: self.words.get(offset + NODE_SIZE),
        })
    }
}
