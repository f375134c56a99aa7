//! Single-arena heap allocation with segregated free lists.
//!
//! An [`Arena`] owns one fixed, word-addressed buffer and carves it into
//! variable-size blocks. Free blocks are threaded onto per-size-class
//! intrusive lists that live inside the free memory itself, and adjacent
//! free blocks are merged on release using boundary tags. This crate is
//! the only one in the workspace whose allocator metadata is reached
//! through raw pointers; all of that is confined to `raw.rs`.
//!
//! # Block layout
//!
//! ```text
//! busy block                free block
//! ┌──────────────┐          ┌──────────────┐
//! │ size (words) │ header   │ 0            │ header
//! │ payload ...  │          │ start        │ ┐
//! │              │          │ size         │ │ free-list node
//! │              │          │ prev         │ │
//! │              │          │ next         │ ┘
//! │              │          │ ...          │
//! │ 0            │ footer   │ size         │ size mirror
//! └──────────────┘          └──────────────┘
//! ```
//!
//! A block's header is nonzero exactly when the block is busy, so the word
//! just before any header tells whether the left neighbour is free (and
//! how large it is), and the word just past any block tells whether the
//! right neighbour is free.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod arena;
pub mod block;
mod buckets;
pub mod error;
mod raw;
pub mod stats;

// Public re-exports for the primary API surface.
pub use arena::{Arena, Blocks};
pub use block::{BlockInfo, MIN_BLOCK_BYTES, MIN_BLOCK_WORDS, WORD_BYTES};
pub use error::ArenaError;
pub use stats::ArenaStats;
