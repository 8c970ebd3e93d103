//! Federation subtraction by minimal-constraint splitting.
//!
//! `A - B` for convex `A` and `B` is the union of `A ∧ ¬c` over the minimal
//! constraints `c` of `B` that actually cut `A`. How those pieces are cut
//! is chosen by [`SplitStrategy`]. Everything larger (federation minus
//! zone, federation minus federation) is built from that one step.

use tracing::trace;
use zonefed_arena::{AllocError, BlockId, DbmAllocator};
use zonefed_core::Raw;
use zonefed_dbm::close::{at, close, close_ij};
use zonefed_dbm::{analyze_minimal, ops, MinimalGraph};

use crate::fedlist::FedList;

/// How the pieces of a zone subtraction are cut.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SplitStrategy {
    /// One piece per minimal constraint that cuts the minuend. Cheapest;
    /// pieces may overlap.
    Overlapping,
    /// Pieces are cut from a shrinking remainder so they are pairwise
    /// disjoint. One extra row/column closure per piece.
    #[default]
    Disjoint,
    /// Like [`SplitStrategy::Overlapping`], but a piece is only emitted when
    /// the facet of the subtrahend on that constraint meets the minuend.
    /// Fewer pieces, one full closure per candidate.
    MinimalFacets,
}

/// Runtime options for every subtraction entry point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubtractOptions {
    /// Piece-cutting policy.
    pub strategy: SplitStrategy,
    /// Run the cheap pairwise disjointness test before analysing the
    /// subtrahend.
    pub intersection_precheck: bool,
}

impl SubtractOptions {
    /// Default piece-cutting policy.
    pub const DEFAULT_STRATEGY: SplitStrategy = SplitStrategy::Disjoint;
    /// Default for [`SubtractOptions::intersection_precheck`].
    pub const DEFAULT_INTERSECTION_PRECHECK: bool = true;

    /// Options with the given strategy and the default precheck.
    pub fn new(strategy: SplitStrategy) -> Self {
        Self {
            strategy,
            intersection_precheck: Self::DEFAULT_INTERSECTION_PRECHECK,
        }
    }

    /// Builder: toggle the disjointness precheck.
    pub fn with_intersection_precheck(mut self, on: bool) -> Self {
        self.intersection_precheck = on;
        self
    }
}

impl Default for SubtractOptions {
    fn default() -> Self {
        Self::new(Self::DEFAULT_STRATEGY)
    }
}

/// Outcome of cutting one zone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Cut {
    /// The zones are disjoint; the minuend is the whole result.
    Untouched,
    /// The result is the pieces pushed to the output.
    Split,
}

/// Cut `a - b` into `out`. On error the pieces pushed by this call are
/// released.
fn cut(
    a: &[Raw],
    b: &[Raw],
    graph: &MinimalGraph,
    dim: usize,
    opts: SubtractOptions,
    alloc: &mut DbmAllocator,
    out: &mut Vec<BlockId>,
) -> Result<Cut, AllocError> {
    if dim <= 1 || graph.is_empty() {
        return Ok(Cut::Split);
    }
    if opts.intersection_precheck && !ops::have_intersection(a, b, dim) {
        return Ok(Cut::Untouched);
    }
    if graph
        .iter()
        .any(|(i, j)| b[at(dim, i, j)].negate() >= a[at(dim, j, i)])
    {
        return Ok(Cut::Untouched);
    }
    if opts.strategy == SplitStrategy::MinimalFacets && !ops::intersects(a, b, dim) {
        return Ok(Cut::Untouched);
    }

    let start = out.len();
    let result = match opts.strategy {
        SplitStrategy::Overlapping => cut_overlapping(a, b, graph, dim, alloc, out, |_, _| true),
        SplitStrategy::MinimalFacets => cut_overlapping(a, b, graph, dim, alloc, out, |i, j| {
            facet_meets(a, b, graph, dim, i, j)
        }),
        SplitStrategy::Disjoint => cut_disjoint(a, b, graph, dim, alloc, out),
    };
    match result {
        Ok(()) => {
            trace!(dim, pieces = out.len() - start, "zone subtraction");
            Ok(Cut::Split)
        }
        Err(e) => {
            alloc.deallocate_list(out.split_off(start));
            Err(e)
        }
    }
}

/// `a ∧ ¬(xi - xj ≺ c)` as a new block. Requires `c < a[i,j]` and the
/// negation to be consistent with `a`.
fn emit_negated(
    a: &[Raw],
    c: Raw,
    dim: usize,
    i: usize,
    j: usize,
    alloc: &mut DbmAllocator,
    out: &mut Vec<BlockId>,
) -> Result<(), AllocError> {
    let id = alloc.allocate_from(a)?;
    let piece = alloc.dbm_mut(&id, dim);
    piece[at(dim, j, i)] = c.negate();
    close_ij(piece, dim, j, i);
    out.push(id);
    Ok(())
}

fn cut_overlapping(
    a: &[Raw],
    b: &[Raw],
    graph: &MinimalGraph,
    dim: usize,
    alloc: &mut DbmAllocator,
    out: &mut Vec<BlockId>,
    mut wanted: impl FnMut(usize, usize) -> bool,
) -> Result<(), AllocError> {
    for (i, j) in graph.iter() {
        let c = b[at(dim, i, j)];
        if c < a[at(dim, i, j)] && wanted(i, j) {
            emit_negated(a, c, dim, i, j, alloc, out)?;
        }
    }
    Ok(())
}

fn cut_disjoint(
    a: &[Raw],
    b: &[Raw],
    graph: &MinimalGraph,
    dim: usize,
    alloc: &mut DbmAllocator,
    out: &mut Vec<BlockId>,
) -> Result<(), AllocError> {
    let mut rest = a.to_vec();
    for (i, j) in graph.iter() {
        let c = b[at(dim, i, j)];
        if c >= rest[at(dim, i, j)] {
            continue;
        }
        if c.negate() < rest[at(dim, j, i)] {
            emit_negated(&rest, c, dim, i, j, alloc, out)?;
            rest[at(dim, i, j)] = c;
            close_ij(&mut rest, dim, i, j);
        } else {
            // the remainder lies entirely outside c
            out.push(alloc.allocate_from(&rest)?);
            return Ok(());
        }
    }
    Ok(())
}

/// Whether the facet `xi - xj = b[i,j]` of `b`, bounded by the other
/// minimal constraints, meets `a`. An unsatisfiable facet counts as
/// meeting, so the piece is kept.
fn facet_meets(a: &[Raw], b: &[Raw], graph: &MinimalGraph, dim: usize, i: usize, j: usize) -> bool {
    let mut facet = vec![Raw::LS_INFINITY; dim * dim];
    for k in 0..dim {
        facet[at(dim, k, k)] = Raw::LE_ZERO;
    }
    for (k, l) in graph.iter() {
        if (k, l) != (i, j) {
            facet[at(dim, k, l)] = b[at(dim, k, l)];
        }
    }
    let bound = b[at(dim, i, j)].bound();
    facet[at(dim, i, j)] = Raw::weak(bound);
    facet[at(dim, j, i)] = facet[at(dim, j, i)].min(Raw::weak(-bound));
    if !close(&mut facet, dim) {
        return true;
    }
    ops::intersects(a, &facet, dim)
}

/// `a - b` as a new list.
pub fn subtract_dbm_from_dbm(
    a: &[Raw],
    b: &[Raw],
    dim: usize,
    opts: SubtractOptions,
    alloc: &mut DbmAllocator,
) -> Result<FedList, AllocError> {
    let graph = analyze_minimal(b, dim);
    let mut out = Vec::new();
    if cut(&a[..dim * dim], b, &graph, dim, opts, alloc, &mut out)? == Cut::Untouched {
        out.push(alloc.allocate_from(&a[..dim * dim])?);
    }
    let mut fed = FedList::new(dim);
    fed.dbms = out;
    Ok(fed)
}

/// `a - fed` as a new list.
pub fn subtract_fed_from_dbm(
    a: &[Raw],
    fed: &FedList,
    opts: SubtractOptions,
    alloc: &mut DbmAllocator,
) -> Result<FedList, AllocError> {
    let mut out = FedList::new(fed.dim());
    out.add_dbm(a, alloc)?;
    if let Err(e) = out.subtract_fed(fed, opts, alloc) {
        out.release(alloc);
        return Err(e);
    }
    Ok(out)
}

impl FedList {
    /// `self - b` as a new list; `self` is untouched.
    pub fn subtract_dbm_from_fed(
        &self,
        b: &[Raw],
        opts: SubtractOptions,
        alloc: &mut DbmAllocator,
    ) -> Result<FedList, AllocError> {
        let dim = self.dim();
        let graph = analyze_minimal(b, dim);
        let mut out = Vec::new();
        let mut a = vec![Raw::LE_ZERO; dim * dim];
        for id in &self.dbms {
            a.copy_from_slice(alloc.dbm(id, dim));
            let step = match cut(&a, b, &graph, dim, opts, alloc, &mut out) {
                Ok(Cut::Untouched) => alloc.duplicate(id, dim).map(|copy| out.push(copy)),
                Ok(Cut::Split) => Ok(()),
                Err(e) => Err(e),
            };
            if let Err(e) = step {
                alloc.deallocate_list(out);
                return Err(e);
            }
        }
        let mut fed = FedList::new(dim);
        fed.dbms = out;
        Ok(fed)
    }

    /// `self - other` as a new list; `self` is untouched.
    pub fn subtract_fed_from_fed(
        &self,
        other: &FedList,
        opts: SubtractOptions,
        alloc: &mut DbmAllocator,
    ) -> Result<FedList, AllocError> {
        assert_eq!(self.dim(), other.dim(), "dimension mismatch");
        let Some((first, rest)) = other.dbms.split_first() else {
            return self.copy(alloc);
        };
        let dim = self.dim();
        let scratch = alloc.dbm(first, dim).to_vec();
        let mut out = self.subtract_dbm_from_fed(&scratch, opts, alloc)?;
        if let Err(e) = out.subtract_ids(rest, opts, alloc) {
            out.release(alloc);
            return Err(e);
        }
        Ok(out)
    }

    /// `self := self - b`. On error `self` is unchanged.
    pub fn subtract_dbm(
        &mut self,
        b: &[Raw],
        opts: SubtractOptions,
        alloc: &mut DbmAllocator,
    ) -> Result<(), AllocError> {
        if self.is_empty() {
            return Ok(());
        }
        let dim = self.dim();
        let graph = analyze_minimal(b, dim);
        let old = self.take_dbms();
        let mut kept = Vec::with_capacity(old.len());
        let mut replaced = Vec::new();
        let mut pieces = Vec::new();
        let mut a = vec![Raw::LE_ZERO; dim * dim];
        let mut old = old.into_iter();
        while let Some(id) = old.next() {
            a.copy_from_slice(alloc.dbm(&id, dim));
            match cut(&a, b, &graph, dim, opts, alloc, &mut pieces) {
                Ok(Cut::Untouched) => kept.push(id),
                Ok(Cut::Split) => replaced.push(id),
                Err(e) => {
                    alloc.deallocate_list(pieces);
                    self.dbms = kept;
                    self.dbms.append(&mut replaced);
                    self.dbms.push(id);
                    self.dbms.extend(old);
                    return Err(e);
                }
            }
        }
        alloc.deallocate_list(replaced);
        self.dbms = kept;
        self.dbms.append(&mut pieces);
        Ok(())
    }

    /// `self := self - other`, one member of `other` at a time. On error
    /// `self` holds the result of the steps completed so far.
    pub fn subtract_fed(
        &mut self,
        other: &FedList,
        opts: SubtractOptions,
        alloc: &mut DbmAllocator,
    ) -> Result<(), AllocError> {
        assert_eq!(self.dim(), other.dim(), "dimension mismatch");
        self.subtract_ids(&other.dbms, opts, alloc)
    }

    pub(crate) fn subtract_ids(
        &mut self,
        ids: &[BlockId],
        opts: SubtractOptions,
        alloc: &mut DbmAllocator,
    ) -> Result<(), AllocError> {
        let dim = self.dim();
        let mut scratch = vec![Raw::LE_ZERO; dim * dim];
        for id in ids {
            if self.is_empty() {
                break;
            }
            scratch.copy_from_slice(alloc.dbm(id, dim));
            self.subtract_dbm(&scratch, opts, alloc)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fed_of, same_points};
    use zonefed_dbm::Dbm;
    use zonefed_test_utils::zone;

    const ALL: [SplitStrategy; 3] = [
        SplitStrategy::Overlapping,
        SplitStrategy::Disjoint,
        SplitStrategy::MinimalFacets,
    ];

    #[test]
    fn disjoint_zones_are_untouched() {
        let mut alloc = DbmAllocator::with_max_dim(3);
        let a = zone(3, &[(1, 0, 2)]);
        let b = zone(3, &[(0, 1, -5)]);
        for strategy in ALL {
            let mut r =
                subtract_dbm_from_dbm(a.as_slice(), b.as_slice(), 3, SubtractOptions::new(strategy), &mut alloc)
                    .unwrap();
            assert_eq!(r.len(), 1);
            assert!(r.has_dbm(a.as_slice(), &alloc));
            r.release(&mut alloc);
        }
        assert_eq!(alloc.live_blocks(), 0);
    }

    #[test]
    fn superset_subtrahend_leaves_nothing() {
        let mut alloc = DbmAllocator::with_max_dim(3);
        let a = zone(3, &[(1, 0, 2), (2, 0, 2)]);
        let b = zone(3, &[(1, 0, 3)]);
        for strategy in ALL {
            let r = subtract_dbm_from_dbm(a.as_slice(), b.as_slice(), 3, SubtractOptions::new(strategy), &mut alloc)
                .unwrap();
            assert!(r.is_empty());
        }
    }

    #[test]
    fn box_minus_inner_box() {
        // [0,4]² minus [1,2]²
        let mut alloc = DbmAllocator::with_max_dim(3);
        let a = zone(3, &[(1, 0, 4), (2, 0, 4)]);
        let b = zone(3, &[(1, 0, 2), (0, 1, -1), (2, 0, 2), (0, 2, -1)]);
        for strategy in ALL {
            let mut r = subtract_dbm_from_dbm(a.as_slice(), b.as_slice(), 3, SubtractOptions::new(strategy), &mut alloc)
                .unwrap();
            assert!(!r.is_empty());
            assert!(r.is_real_point_included(&[0.0, 0.5, 0.5], &alloc));
            assert!(r.is_real_point_included(&[0.0, 3.0, 1.5], &alloc));
            assert!(!r.is_real_point_included(&[0.0, 1.5, 1.5], &alloc));
            assert!(!r.is_real_point_included(&[0.0, 2.0, 1.0], &alloc));
            assert!(r.is_real_point_included(&[0.0, 2.5, 1.0], &alloc));
            r.release(&mut alloc);
        }
    }

    #[test]
    fn disjoint_pieces_do_not_overlap() {
        let mut alloc = DbmAllocator::with_max_dim(3);
        let a = zone(3, &[(1, 0, 4), (2, 0, 4)]);
        let b = zone(3, &[(1, 0, 2), (0, 1, -1), (2, 0, 2), (0, 2, -1)]);
        let mut r = subtract_dbm_from_dbm(a.as_slice(), b.as_slice(), 3, SubtractOptions::default(), &mut alloc)
            .unwrap();
        let members: Vec<Vec<Raw>> = r.iter(&alloc).map(|m| m.to_vec()).collect();
        for (k, x) in members.iter().enumerate() {
            for y in &members[k + 1..] {
                assert!(!ops::intersects(x, y, 3));
            }
        }
        r.release(&mut alloc);
    }

    #[test]
    fn strict_boundaries_are_kept() {
        // [0,4] minus [0,2] leaves 2 < x1 <= 4
        let mut alloc = DbmAllocator::with_max_dim(2);
        let a = zone(2, &[(1, 0, 4)]);
        let b = zone(2, &[(1, 0, 2)]);
        let mut r = subtract_dbm_from_dbm(a.as_slice(), b.as_slice(), 2, SubtractOptions::default(), &mut alloc)
            .unwrap();
        assert_eq!(r.len(), 1);
        assert!(!r.is_real_point_included(&[0.0, 2.0], &alloc));
        assert!(r.is_real_point_included(&[0.0, 2.001], &alloc));
        assert!(r.is_real_point_included(&[0.0, 4.0], &alloc));
        r.release(&mut alloc);
    }

    #[test]
    fn dim_one_subtraction_is_empty() {
        let mut alloc = DbmAllocator::with_max_dim(1);
        let z = Dbm::zero(1);
        let r = subtract_dbm_from_dbm(z.as_slice(), z.as_slice(), 1, SubtractOptions::default(), &mut alloc)
            .unwrap();
        assert!(r.is_empty());
    }

    #[test]
    fn in_place_subtraction_matches_copying() {
        let mut alloc = DbmAllocator::with_max_dim(3);
        let members = [
            zone(3, &[(1, 0, 3)]),
            zone(3, &[(2, 0, 3), (0, 1, -2)]),
        ];
        let b = zone(3, &[(1, 0, 2), (2, 0, 2)]);
        let mut fed = fed_of(&mut alloc, 3, &members);
        let mut copied = fed
            .subtract_dbm_from_fed(b.as_slice(), SubtractOptions::default(), &mut alloc)
            .unwrap();
        fed.subtract_dbm(b.as_slice(), SubtractOptions::default(), &mut alloc)
            .unwrap();
        assert!(same_points(&fed, &copied, &alloc, 6));
        fed.release(&mut alloc);
        copied.release(&mut alloc);
        assert_eq!(alloc.live_blocks(), 0);
    }

    #[test]
    fn failed_in_place_subtraction_restores_members() {
        let config = zonefed_arena::AllocatorConfig::new(3).with_max_blocks(2);
        let mut alloc = DbmAllocator::new(config);
        let a = zone(3, &[(1, 0, 4), (2, 0, 4)]);
        let b = zone(3, &[(1, 0, 2), (0, 1, -1), (2, 0, 2), (0, 2, -1)]);
        let mut fed = fed_of(&mut alloc, 3, &[a.clone()]);
        let err = fed.subtract_dbm(b.as_slice(), SubtractOptions::new(SplitStrategy::Overlapping), &mut alloc);
        assert!(err.is_err());
        assert_eq!(fed.len(), 1);
        assert!(fed.has_dbm(a.as_slice(), &alloc));
        assert_eq!(alloc.live_blocks(), 1);
        fed.release(&mut alloc);
    }

    #[test]
    fn fed_minus_fed_and_dbm_minus_fed() {
        let mut alloc = DbmAllocator::with_max_dim(2);
        let whole = zone(2, &[(1, 0, 10)]);
        let mut holes = fed_of(
            &mut alloc,
            2,
            &[zone(2, &[(1, 0, 2)]), zone(2, &[(0, 1, -5), (1, 0, 6)])],
        );
        let mut left = subtract_fed_from_dbm(whole.as_slice(), &holes, SubtractOptions::default(), &mut alloc)
            .unwrap();
        for (x, inside) in [(1.0, false), (3.0, true), (5.5, false), (8.0, true), (11.0, false)] {
            assert_eq!(left.is_real_point_included(&[0.0, x], &alloc), inside, "x1 = {x}");
        }
        let mut again = left
            .subtract_fed_from_fed(&holes, SubtractOptions::default(), &mut alloc)
            .unwrap();
        assert!(same_points(&left, &again, &alloc, 12));
        left.release(&mut alloc);
        again.release(&mut alloc);
        holes.release(&mut alloc);
        assert_eq!(alloc.live_blocks(), 0);
    }

    mod proptests {
        use super::*;
        use crate::testing::{grid, in_dbm};
        use proptest::prelude::*;
        use zonefed_test_utils::arb_zone;

        fn arb_strategy() -> impl Strategy<Value = SplitStrategy> {
            prop_oneof![
                Just(SplitStrategy::Overlapping),
                Just(SplitStrategy::Disjoint),
                Just(SplitStrategy::MinimalFacets),
            ]
        }

        proptest! {
            #[test]
            fn difference_matches_points(
                a in arb_zone(3, 6),
                b in arb_zone(3, 6),
                strategy in arb_strategy(),
                precheck in any::<bool>(),
            ) {
                let mut alloc = DbmAllocator::with_max_dim(3);
                let opts = SubtractOptions::new(strategy).with_intersection_precheck(precheck);
                let mut r = subtract_dbm_from_dbm(a.as_slice(), b.as_slice(), 3, opts, &mut alloc).unwrap();
                for p in grid(3, 8) {
                    let expect = in_dbm(&a, &p) && !in_dbm(&b, &p);
                    prop_assert_eq!(r.is_real_point_included(&p, &alloc), expect, "point {:?}", p);
                }
                r.release(&mut alloc);
                prop_assert_eq!(alloc.live_blocks(), 0);
            }

            #[test]
            fn reconstruction_identity(a in arb_zone(3, 6), b in arb_zone(3, 6)) {
                let mut alloc = DbmAllocator::with_max_dim(3);
                let mut r = subtract_dbm_from_dbm(
                    a.as_slice(), b.as_slice(), 3, SubtractOptions::default(), &mut alloc,
                ).unwrap();
                let mut meet = a.as_slice().to_vec();
                if ops::intersection(&mut meet, b.as_slice(), 3) {
                    r.add_dbm(&meet, &mut alloc).unwrap();
                }
                let mut whole = FedList::new(3);
                whole.add_dbm(a.as_slice(), &mut alloc).unwrap();
                prop_assert!(same_points(&r, &whole, &alloc, 8));
                r.release(&mut alloc);
                whole.release(&mut alloc);
            }
        }
    }
}
