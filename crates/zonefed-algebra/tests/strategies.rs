//! Integration test: the three split strategies on a staircase of
//! overlapping slabs.
//!
//! All strategies must describe the same set; they differ only in how many
//! pieces they produce and whether the pieces overlap.

use zonefed_algebra::{FedList, SplitStrategy, SubtractOptions};
use zonefed_arena::DbmAllocator;
use zonefed_core::Relation;
use zonefed_dbm::{ops, Dbm};
use zonefed_test_utils::fixtures::{cube, staircase};

fn fed_of(alloc: &mut DbmAllocator, dim: usize, zones: &[Dbm]) -> FedList {
    let mut fed = FedList::new(dim);
    for z in zones {
        fed.add_dbm(z.as_slice(), alloc).unwrap();
    }
    fed
}

fn cut_staircase(
    alloc: &mut DbmAllocator,
    dim: usize,
    steps: usize,
    strategy: SplitStrategy,
) -> FedList {
    let mut fed = fed_of(alloc, dim, &[cube(dim, 20)]);
    let mut holes = fed_of(alloc, dim, &staircase(dim, steps));
    fed.subtract_fed(&holes, SubtractOptions::new(strategy), alloc)
        .unwrap();
    holes.release(alloc);
    fed
}

fn pairwise_disjoint(fed: &FedList, alloc: &DbmAllocator) -> bool {
    let members: Vec<&[_]> = fed.iter(alloc).collect();
    members.iter().enumerate().all(|(i, a)| {
        members[i + 1..]
            .iter()
            .all(|b| !ops::intersects(a, b, fed.dim()))
    })
}

#[test]
fn strategies_agree_on_the_set() {
    for (dim, steps) in [(3, 4), (4, 2)] {
        let mut alloc = DbmAllocator::with_max_dim(dim);
        let mut overlapping = cut_staircase(&mut alloc, dim, steps, SplitStrategy::Overlapping);
        let mut disjoint = cut_staircase(&mut alloc, dim, steps, SplitStrategy::Disjoint);
        let mut facets = cut_staircase(&mut alloc, dim, steps, SplitStrategy::MinimalFacets);
        let opts = SubtractOptions::default();

        assert!(!overlapping.is_empty());
        assert_eq!(
            overlapping.relation(&disjoint, opts, &mut alloc).unwrap(),
            Relation::Equal
        );
        assert_eq!(
            facets.relation(&disjoint, opts, &mut alloc).unwrap(),
            Relation::Equal
        );

        overlapping.release(&mut alloc);
        disjoint.release(&mut alloc);
        facets.release(&mut alloc);
        assert_eq!(alloc.live_blocks(), 0);
    }
}

#[test]
fn disjoint_pieces_never_overlap() {
    let mut alloc = DbmAllocator::with_max_dim(4);
    let mut a = fed_of(&mut alloc, 4, &[cube(4, 6)]);
    let b = cube(4, 3);
    a.subtract_dbm(b.as_slice(), SubtractOptions::new(SplitStrategy::Disjoint), &mut alloc)
        .unwrap();
    // one piece per clock upper bound of b
    assert_eq!(a.len(), 3);
    assert!(pairwise_disjoint(&a, &alloc));
    assert!(a.is_point_included(&[0, 4, 0, 0], &alloc));
    assert!(!a.is_point_included(&[0, 3, 3, 3], &alloc));
    a.release(&mut alloc);
}

#[test]
fn overlapping_pieces_may_overlap() {
    let mut alloc = DbmAllocator::with_max_dim(3);
    let mut a = fed_of(&mut alloc, 3, &[cube(3, 6)]);
    let b = cube(3, 3);
    a.subtract_dbm(
        b.as_slice(),
        SubtractOptions::new(SplitStrategy::Overlapping),
        &mut alloc,
    )
    .unwrap();
    assert_eq!(a.len(), 2);
    // both pieces contain the far corner
    assert!(!pairwise_disjoint(&a, &alloc));
    a.release(&mut alloc);
}

#[test]
fn precheck_does_not_change_results() {
    let mut alloc = DbmAllocator::with_max_dim(3);
    let zones = staircase(3, 3);
    let mut with = fed_of(&mut alloc, 3, &[cube(3, 15)]);
    let mut without = fed_of(&mut alloc, 3, &[cube(3, 15)]);
    let holes = fed_of(&mut alloc, 3, &zones);
    let on = SubtractOptions::default();
    let off = on.with_intersection_precheck(false);
    with.subtract_fed(&holes, on, &mut alloc).unwrap();
    without.subtract_fed(&holes, off, &mut alloc).unwrap();
    assert!(with.are_equal(&without, on, &mut alloc).unwrap());
    for mut f in [with, without, holes] {
        f.release(&mut alloc);
    }
    assert_eq!(alloc.live_blocks(), 0);
}
