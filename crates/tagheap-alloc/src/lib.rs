//! Allocation adapters for tagheap pools.
//!
//! [`PoolAlloc`] layers `Layout`-aware allocation over any [`RawHeap`]:
//! requests with an alignment above one are padded and aligned by hand,
//! with the pool's own pointer stored in the word just below the aligned
//! one. Byte requests (`align == 1`) go straight to the pool.
//!
//! The [`global`] module keeps one such adapter per process, created by
//! [`global::init`] and released by [`global::teardown`].
//!
//! For containers, [`SharedAlloc`] and [`global::GlobalPool`] implement
//! `allocator_api2::alloc::Allocator`, so `allocator_api2::vec::Vec`,
//! `hashbrown::HashMap` and friends can be backed by a pool.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod adapter;
pub mod container;
pub mod error;
pub mod global;
pub mod heap;

pub use adapter::PoolAlloc;
pub use container::SharedAlloc;
pub use error::AllocError;
pub use heap::RawHeap;
