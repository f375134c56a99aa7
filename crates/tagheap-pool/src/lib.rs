//! Multi-arena heap pools.
//!
//! A [`Pool`] owns a growing set of [`Arena`](tagheap_arena::Arena)s and
//! presents them as one allocator:
//!
//! ```text
//! Pool
//! ├── arenas: [Arena]   sorted by end address, never removed
//! ├── current: usize    last arena that served an allocate or free
//! └── standard size     size of every arena added for ordinary requests
//! ```
//!
//! `allocate` tries the current arena, then every other arena, then adds
//! a new one. `free` routes the pointer back to its arena by address:
//! the current arena is checked first, then a binary search over the
//! sorted ranges.
//!
//! [`SharedPool`] puts one `Mutex` around a pool for use from many
//! threads; [`Heap`] picks between the two at runtime from
//! [`PoolConfig::thread_safe`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod config;
pub mod error;
pub mod heap;
pub mod metrics;
pub mod pool;
pub mod shared;

// Public re-exports for the primary API surface.
pub use config::PoolConfig;
pub use error::PoolError;
pub use heap::Heap;
pub use metrics::PoolMetrics;
pub use pool::Pool;
pub use shared::SharedPool;
