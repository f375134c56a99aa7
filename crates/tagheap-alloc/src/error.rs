//! Adapter error types.

use std::error::Error;
use std::fmt;

use tagheap_pool::PoolError;

/// Errors surfaced by [`PoolAlloc`](crate::PoolAlloc) and the global pool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllocError {
    /// The global pool has not been initialised.
    NotInitialized,
    /// [`global::init`](crate::global::init) was called twice without a
    /// teardown in between.
    AlreadyInitialized,
    /// The padded request size does not fit in a `usize`.
    LayoutOverflow,
    /// The underlying pool failed.
    Pool(PoolError),
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInitialized => write!(f, "global pool is not initialised"),
            Self::AlreadyInitialized => write!(f, "global pool is already initialised"),
            Self::LayoutOverflow => write!(f, "allocation size overflows after alignment padding"),
            Self::Pool(e) => write!(f, "pool error: {e}"),
        }
    }
}

impl Error for AllocError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Pool(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PoolError> for AllocError {
    fn from(e: PoolError) -> Self {
        Self::Pool(e)
    }
}
