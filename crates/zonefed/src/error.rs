//! Errors surfaced at the federation boundary.

use std::error::Error;
use std::fmt;
use std::io;

use zonefed_arena::AllocError;

/// Errors from [`Federation`](crate::Federation) operations and text I/O.
#[derive(Debug)]
pub enum FederationError {
    /// The allocator could not provide a block.
    Alloc(AllocError),
    /// Reading or writing the stream failed.
    Io(io::Error),
    /// The serialized text is malformed.
    Parse {
        /// What was wrong, and where.
        detail: String,
    },
    /// A serialized federation has more clocks than the allocator supports.
    DimensionTooLarge {
        /// Dimension found in the input.
        dim: usize,
        /// The allocator's maximum dimension.
        max_dim: usize,
    },
}

impl FederationError {
    pub(crate) fn parse(detail: impl Into<String>) -> Self {
        Self::Parse {
            detail: detail.into(),
        }
    }
}

impl fmt::Display for FederationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alloc(e) => write!(f, "allocation failed: {e}"),
            Self::Io(e) => write!(f, "i/o error: {e}"),
            Self::Parse { detail } => write!(f, "malformed federation: {detail}"),
            Self::DimensionTooLarge { dim, max_dim } => {
                write!(f, "dimension {dim} exceeds allocator maximum {max_dim}")
            }
        }
    }
}

impl Error for FederationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Alloc(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<AllocError> for FederationError {
    fn from(e: AllocError) -> Self {
        Self::Alloc(e)
    }
}

impl From<io::Error> for FederationError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
