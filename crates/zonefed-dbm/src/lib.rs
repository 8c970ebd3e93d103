//! Single difference-bound-matrix kernel.
//!
//! The federation layer treats a DBM as a `dim × dim` prefix of a raw
//! slice and calls the free functions in this crate on it. The same
//! functions back the owned [`Dbm`] value type.
//!
//! Module map:
//!
//! - [`close`]: Floyd–Warshall closure, incremental closure, emptiness.
//! - [`ops`]: relation, intersection, constraints, delay, clock updates.
//! - [`minimal`]: minimal constraint graph used to split subtractions.
//! - [`extrapolate`]: the four extrapolation variants.
//! - [`remap`]: copying a DBM across a change of active clocks.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod close;
pub mod dbm;
pub mod extrapolate;
pub mod minimal;
pub mod ops;
pub mod remap;

pub use close::{close, close_ij, close_touched, is_closed, is_empty, is_valid, mark_empty};
pub use dbm::Dbm;
pub use extrapolate::{
    diagonal_extrapolate_lu_bounds, diagonal_extrapolate_max_bounds, extrapolate_lu_bounds,
    extrapolate_max_bounds,
};
pub use minimal::{analyze_minimal, MinimalGraph};
pub use remap::update_dbm;
