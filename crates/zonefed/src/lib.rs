//! zonefed: federations of difference bound matrices.
//!
//! A federation is a finite union of zones, the convex sets of clock
//! valuations used in timed-automata reachability. This is the facade
//! crate: it provides the owning [`Federation`] handle, the text formats,
//! and re-exports the sub-crates.
//!
//! # Quick start
//!
//! ```rust
//! use zonefed::prelude::*;
//!
//! let alloc = zonefed::shared(DbmAllocator::with_max_dim(3));
//! let mut fed = Federation::new(&alloc, 3);
//! fed.init_to_zero()?;
//!
//! // 1 <= x1 <= 2, x2 free
//! let band = Dbm::init(3)
//!     .with(1, 0, Raw::weak(2))
//!     .and_then(|z| z.with(0, 1, Raw::weak(-1)))
//!     .expect("non-empty");
//! fed.union_dbm(&band)?;
//! assert_eq!(fed.len(), 2);
//!
//! fed.subtract_dbm(&Dbm::init(3))?;
//! assert!(fed.is_empty());
//! # Ok::<(), zonefed::FederationError>(())
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `zonefed-core` | raw bounds, `Relation`, active-clock sets |
//! | [`dbm`] | `zonefed-dbm` | the single-DBM kernel |
//! | [`arena`] | `zonefed-arena` | the fixed-block DBM allocator |
//! | [`algebra`] | `zonefed-algebra` | `FedList` and subtraction options |
//! | [`io`] | this crate | serialization and pretty printing |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Raw bounds, relations and active-clock sets (`zonefed-core`).
pub use zonefed_core as types;

/// The single-DBM kernel (`zonefed-dbm`).
///
/// [`dbm::Dbm`] is the owned zone value accepted by [`Federation`]
/// operations.
pub use zonefed_dbm as dbm;

/// The DBM allocator (`zonefed-arena`).
pub use zonefed_arena as arena;

/// Federation-list algebra over allocator blocks (`zonefed-algebra`).
///
/// Use [`algebra::FedList`] directly when one worker owns its allocator
/// outright and does not need index translation.
pub use zonefed_algebra as algebra;

pub mod error;
pub mod federation;
pub mod io;

pub use error::FederationError;
pub use federation::{shared, Federation, SharedAllocator};

/// Common imports.
pub mod prelude {
    pub use crate::federation::{shared, Federation, SharedAllocator};
    pub use crate::io::{PrintFormat, PrintStyle};
    pub use crate::FederationError;
    pub use zonefed_algebra::{FedList, SplitStrategy, SubtractOptions};
    pub use zonefed_arena::{AllocError, AllocatorConfig, DbmAllocator};
    pub use zonefed_core::{ClockSet, Constraint, Raw, Relation, Strictness};
    pub use zonefed_dbm::Dbm;
}
