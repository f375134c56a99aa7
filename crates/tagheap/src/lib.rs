//! Tagheap: a boundary-tag heap allocator.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all tagheap sub-crates. For most users, adding `tagheap` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use tagheap::prelude::*;
//!
//! // Objects up to 256 bytes, about 1000 of them live at once.
//! let mut pool = Pool::new(256, 1000).unwrap();
//! let before = pool.free_space();
//!
//! let p = pool.allocate(200).unwrap();
//! assert!(pool.free_space() < before);
//!
//! unsafe { pool.free(p) }.unwrap();
//! assert_eq!(pool.free_space(), before);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`arena`] | `tagheap-arena` | Single fixed-capacity arena, block walk, stats |
//! | [`pool`] | `tagheap-pool` | Multi-arena pool, locked pool, config, metrics |
//! | [`alloc`] | `tagheap-alloc` | Aligned and typed adapter, process-wide pool |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Single-arena allocator (`tagheap-arena`).
///
/// [`arena::Arena`] serves requests from one fixed buffer; use
/// [`arena::Arena::verify`] and [`arena::Arena::blocks`] to inspect it.
pub use tagheap_arena as arena;

/// Multi-arena pools (`tagheap-pool`).
///
/// [`pool::Pool`] for single-threaded use, [`pool::SharedPool`] behind a
/// lock, and [`pool::Heap`] to choose at runtime.
pub use tagheap_pool as pool;

/// Allocation adapters (`tagheap-alloc`).
///
/// [`alloc::PoolAlloc`] adds `Layout` alignment over any
/// [`alloc::RawHeap`]; [`alloc::global`] holds one pool per process.
pub use tagheap_alloc as alloc;

/// Common imports for typical tagheap usage.
///
/// ```rust
/// use tagheap::prelude::*;
/// ```
pub mod prelude {
    // Arena
    pub use tagheap_arena::{Arena, ArenaError, ArenaStats};

    // Pool
    pub use tagheap_pool::{Heap, Pool, PoolConfig, PoolError, PoolMetrics, SharedPool};

    // Adapter
    pub use tagheap_alloc::{AllocError, PoolAlloc, RawHeap, SharedAlloc};
}
