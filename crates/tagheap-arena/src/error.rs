//! Arena-specific error types.

use std::error::Error;
use std::fmt;

/// Errors that can occur during arena construction or release.
///
/// Running out of space is not an error: [`Arena::allocate`](crate::Arena::allocate)
/// reports it as `None`. The release-side variants describe pointers that
/// were caught before any bookkeeping was touched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// A zero-byte arena was requested.
    InvalidCapacity,
    /// The requested capacity does not fit in the address space.
    CapacityOverflow {
        /// Number of bytes requested.
        requested: usize,
    },
    /// The system allocator refused to provide the backing buffer.
    BackingAllocFailed {
        /// Size of the refused reservation in bytes.
        bytes: usize,
    },
    /// The pointer lies outside this arena's address range.
    OutOfRange {
        /// Address of the offending pointer.
        addr: usize,
    },
    /// The pointer is inside the arena but not on a word boundary.
    Misaligned {
        /// Address of the offending pointer.
        addr: usize,
    },
    /// The pointer does not start a busy block (never allocated or already freed).
    NotAllocated {
        /// Address of the offending pointer.
        addr: usize,
    },
    /// Boundary tags or free-list links are inconsistent.
    CorruptBlock {
        /// Word offset of the block where the inconsistency was found.
        offset: usize,
        /// What was wrong.
        reason: &'static str,
    },
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCapacity => write!(f, "arena capacity must be nonzero"),
            Self::CapacityOverflow { requested } => {
                write!(f, "arena capacity overflow: requested {requested} bytes")
            }
            Self::BackingAllocFailed { bytes } => {
                write!(f, "failed to reserve {bytes} bytes of arena storage")
            }
            Self::OutOfRange { addr } => {
                write!(f, "pointer {addr:#x} is outside the arena")
            }
            Self::Misaligned { addr } => {
                write!(f, "pointer {addr:#x} is not word aligned")
            }
            Self::NotAllocated { addr } => {
                write!(f, "pointer {addr:#x} does not refer to a live allocation")
            }
            Self::CorruptBlock { offset, reason } => {
                write!(f, "corrupt block at word {offset}: {reason}")
            }
        }
    }
}

impl Error for ArenaError {}
