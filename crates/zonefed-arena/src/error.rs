//! Allocation error type.

use std::error::Error;
use std::fmt;

/// Failure to obtain a block. The only recoverable error of the federation
/// engine; every other misuse is a programmer error and panics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllocError {
    /// The configured block budget is exhausted.
    CapacityExceeded {
        /// Number of blocks the allocator would hold after the request.
        requested: usize,
        /// Configured maximum.
        capacity: usize,
    },
    /// The system allocator refused the request.
    OutOfMemory {
        /// Number of bytes requested.
        bytes: usize,
    },
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityExceeded {
                requested,
                capacity,
            } => {
                write!(
                    f,
                    "allocator capacity exceeded: requested {requested} blocks, capacity {capacity}"
                )
            }
            Self::OutOfMemory { bytes } => {
                write!(f, "out of memory allocating {bytes} bytes")
            }
        }
    }
}

impl Error for AllocError {}
