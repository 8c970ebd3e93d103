//! Owned single-DBM value.

use std::fmt;
use std::ops::Index;

use zonefed_core::{Constraint, Raw, Relation};

use crate::close::{at, close, is_empty, is_valid};
use crate::ops;

/// A heap-allocated, closed DBM of a fixed dimension.
///
/// Used to build zones outside an allocator, e.g. as arguments to
/// federation operations and in tests. Federations themselves store their
/// members in allocator blocks.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Dbm {
    dim: usize,
    cells: Vec<Raw>,
}

impl Dbm {
    /// The unconstrained zone (all clocks non-negative).
    pub fn init(dim: usize) -> Self {
        assert!(dim >= 1, "a DBM has at least the reference clock");
        let mut cells = vec![Raw::LS_INFINITY; dim * dim];
        ops::init(&mut cells, dim);
        Self { dim, cells }
    }

    /// The zone where every clock is zero.
    pub fn zero(dim: usize) -> Self {
        assert!(dim >= 1, "a DBM has at least the reference clock");
        Self {
            dim,
            cells: vec![Raw::LE_ZERO; dim * dim],
        }
    }

    /// The unconstrained zone tightened by `constraints`, or `None` if the
    /// result is empty.
    pub fn from_constraints(dim: usize, constraints: &[Constraint]) -> Option<Self> {
        let mut dbm = Self::init(dim);
        if constraints.is_empty() || ops::constrain_n(&mut dbm.cells, dim, constraints) {
            Some(dbm)
        } else {
            None
        }
    }

    /// Wrap a row-major matrix, closing it. `None` if it is empty or the
    /// length does not match.
    pub fn from_cells(dim: usize, mut cells: Vec<Raw>) -> Option<Self> {
        if dim == 0 || cells.len() != dim * dim {
            return None;
        }
        if !close(&mut cells, dim) || is_empty(&cells, dim) {
            return None;
        }
        Some(Self { dim, cells })
    }

    /// Dimension, including the reference clock.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Row-major entries.
    pub fn as_slice(&self) -> &[Raw] {
        &self.cells
    }

    /// Bound on `xi - xj`.
    pub fn get(&self, i: usize, j: usize) -> Raw {
        self.cells[at(self.dim, i, j)]
    }

    /// Tighten with one constraint. Returns `false` if the zone became
    /// empty, in which case `self` is unchanged.
    pub fn constrain(&mut self, i: usize, j: usize, value: Raw) -> bool {
        let mut next = self.cells.clone();
        if ops::constrain1(&mut next, self.dim, i, j, value) {
            self.cells = next;
            true
        } else {
            false
        }
    }

    /// Builder form of [`Dbm::constrain`].
    pub fn with(mut self, i: usize, j: usize, value: Raw) -> Option<Self> {
        self.constrain(i, j, value).then_some(self)
    }

    /// Inclusion relation against `other`.
    pub fn relation(&self, other: &Dbm) -> Relation {
        assert_eq!(self.dim, other.dim, "dimension mismatch");
        ops::relation(&self.cells, &other.cells, self.dim)
    }

    /// Whether the zones share a point.
    pub fn intersects(&self, other: &Dbm) -> bool {
        assert_eq!(self.dim, other.dim, "dimension mismatch");
        ops::intersects(&self.cells, &other.cells, self.dim)
    }

    /// Whether the integer valuation is inside the zone.
    pub fn contains_point(&self, point: &[i32]) -> bool {
        ops::is_point_included(point, &self.cells, self.dim)
    }

    /// Closed, non-empty, clocks non-negative.
    pub fn is_valid(&self) -> bool {
        is_valid(&self.cells, self.dim)
    }
}

impl Index<(usize, usize)> for Dbm {
    type Output = Raw;

    fn index(&self, (i, j): (usize, usize)) -> &Raw {
        &self.cells[at(self.dim, i, j)]
    }
}

impl fmt::Debug for Dbm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dbm({}) ", self.dim)?;
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Dbm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(self.dim) {
            for c in row {
                write!(f, "{c}\t")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_produces_valid_zone() {
        let d = Dbm::init(3)
            .with(1, 0, Raw::weak(5))
            .and_then(|d| d.with(0, 1, Raw::weak(-2)))
            .unwrap();
        assert!(d.is_valid());
        assert_eq!(d[(1, 0)], Raw::weak(5));
        assert!(d.contains_point(&[0, 3, 100]));
    }

    #[test]
    fn failed_constrain_leaves_zone_unchanged() {
        let mut d = Dbm::init(2).with(1, 0, Raw::weak(1)).unwrap();
        let before = d.clone();
        assert!(!d.constrain(0, 1, Raw::weak(-2)));
        assert_eq!(d, before);
    }

    #[test]
    fn from_cells_rejects_empty() {
        let mut cells = vec![Raw::LS_INFINITY; 4];
        ops::init(&mut cells, 2);
        cells[1] = Raw::weak(-3);
        cells[2] = Raw::weak(1);
        assert!(Dbm::from_cells(2, cells).is_none());
        assert!(Dbm::from_cells(2, vec![Raw::LE_ZERO; 3]).is_none());
    }

    #[test]
    fn relation_with_self_is_equal() {
        let d = Dbm::zero(3);
        assert_eq!(d.relation(&d), Relation::Equal);
        assert!(d.intersects(&Dbm::init(3)));
    }

    #[test]
    fn display_lists_rows() {
        let d = Dbm::init(2);
        assert_eq!(d.to_string(), "<=0\t<=0\t\n<inf\t<=0\t\n");
    }
}
