//! Pool-level error types.

use std::error::Error;
use std::fmt;

use tagheap_arena::ArenaError;

/// Errors surfaced by [`Pool`](crate::Pool) and [`SharedPool`](crate::SharedPool).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PoolError {
    /// The pool configuration was rejected.
    InvalidConfig {
        /// Why the configuration is invalid.
        reason: String,
    },
    /// A request could not be served even after adding a new arena.
    OutOfMemory {
        /// Number of bytes requested.
        requested: usize,
    },
    /// A pointer passed to `free` does not belong to any arena of the pool.
    ForeignPointer {
        /// Address of the offending pointer.
        addr: usize,
    },
    /// An arena rejected the operation.
    Arena(ArenaError),
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig { reason } => write!(f, "invalid pool config: {reason}"),
            Self::OutOfMemory { requested } => {
                write!(f, "pool out of memory: {requested} bytes requested after growth")
            }
            Self::ForeignPointer { addr } => {
                write!(f, "pointer {addr:#x} is not owned by any arena in this pool")
            }
            Self::Arena(e) => write!(f, "arena error: {e}"),
        }
    }
}

impl Error for PoolError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Arena(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ArenaError> for PoolError {
    fn from(e: ArenaError) -> Self {
        Self::Arena(e)
    }
}
