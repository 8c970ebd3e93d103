//! Core types for the zonefed federation engine.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! scalar vocabulary shared by every other crate in the workspace:
//!
//! - [`Raw`]: an encoded clock-difference bound (`xi - xj < c` or `<= c`).
//! - [`Relation`]: the four-way inclusion relation between two zones.
//! - [`ClockSet`]: a bit string of active clocks, plus the bit-index
//!   utilities that turn such sets into dense index remapping tables.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod bits;
pub mod raw;
pub mod relation;

pub use bits::{compute_tables, ClockSet, IndexTables, NO_SOURCE};
pub use raw::{Raw, Strictness, INFINITY, OVERFLOW};
pub use relation::Relation;

/// A constraint `xi - xj ~ value` between two clock indices.
///
/// The reference clock has index 0. Indices are either physical DBM indices
/// or caller-visible clock ids, depending on where the constraint is used.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Constraint {
    /// Index of the left clock.
    pub i: usize,
    /// Index of the right clock.
    pub j: usize,
    /// Encoded bound on `xi - xj`.
    pub value: Raw,
}

impl Constraint {
    /// Create a constraint from an already-encoded bound.
    pub fn new(i: usize, j: usize, value: Raw) -> Self {
        Self { i, j, value }
    }

    /// Create a constraint `xi - xj <= bound` (weak) or `< bound` (strict).
    pub fn from_bound(i: usize, j: usize, bound: i32, strictness: Strictness) -> Self {
        Self::new(i, j, Raw::new(bound, strictness))
    }

    /// The negated constraint `xj - xi ~' -value`.
    pub fn negated(&self) -> Self {
        Self::new(self.j, self.i, self.value.negate())
    }
}

impl std::fmt::Display for Constraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "x{}-x{}{}", self.i, self.j, self.value)
    }
}
