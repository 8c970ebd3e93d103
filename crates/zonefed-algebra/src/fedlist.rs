//! The federation list value and its member-wise operations.

use std::fmt;

use zonefed_arena::{AllocError, BlockId, DbmAllocator};
use zonefed_core::{Constraint, Raw};
use zonefed_dbm::{close::is_empty, ops};

/// A union of zones of one dimension, stored as allocator blocks.
///
/// An empty list is the empty set of valuations. The order of members has
/// no meaning; new members go to the back of the vector, which plays the
/// role of the list head.
///
/// A `FedList` does not hold its allocator. Every operation takes the
/// allocator that issued the blocks, and the list must be given back with
/// [`FedList::release`] before it is dropped, or its blocks stay live until
/// the allocator itself goes away.
pub struct FedList {
    dim: usize,
    pub(crate) dbms: Vec<BlockId>,
}

impl FedList {
    /// Empty federation of dimension `dim`.
    pub fn new(dim: usize) -> Self {
        assert!(dim >= 1, "a federation has at least the reference clock");
        Self {
            dim,
            dbms: Vec::new(),
        }
    }

    /// Dimension of every member, including the reference clock.
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub(crate) fn set_dim(&mut self, dim: usize) {
        debug_assert!(dim >= 1);
        self.dim = dim;
    }

    /// Number of member DBMs.
    pub fn len(&self) -> usize {
        self.dbms.len()
    }

    /// Whether the federation denotes the empty set.
    pub fn is_empty(&self) -> bool {
        self.dbms.is_empty()
    }

    /// Member handles.
    pub fn ids(&self) -> &[BlockId] {
        &self.dbms
    }

    /// Member matrices, each a `dim²` row-major slice.
    pub fn iter<'a>(&'a self, alloc: &'a DbmAllocator) -> impl Iterator<Item = &'a [Raw]> + 'a {
        let dim = self.dim;
        self.dbms.iter().map(move |id| alloc.dbm(id, dim))
    }

    /// Insert a block holding a closed, non-empty DBM of this dimension.
    /// No inclusion check is done.
    pub fn push(&mut self, id: BlockId) {
        self.dbms.push(id);
    }

    /// Take every member out, leaving the list empty.
    pub fn take_dbms(&mut self) -> Vec<BlockId> {
        std::mem::take(&mut self.dbms)
    }

    /// Give every member back to `alloc`.
    pub fn release(&mut self, alloc: &mut DbmAllocator) {
        alloc.deallocate_list(self.take_dbms());
    }

    /// Add the zone where every clock is zero. No inclusion check.
    pub fn add_zero(&mut self, alloc: &mut DbmAllocator) -> Result<(), AllocError> {
        let id = alloc.allocate()?;
        ops::zero(alloc.dbm_mut(&id, self.dim), self.dim);
        self.dbms.push(id);
        Ok(())
    }

    /// Add the unconstrained zone. No inclusion check.
    pub fn add_init(&mut self, alloc: &mut DbmAllocator) -> Result<(), AllocError> {
        let id = alloc.allocate()?;
        ops::init(alloc.dbm_mut(&id, self.dim), self.dim);
        self.dbms.push(id);
        Ok(())
    }

    /// Add a copy of `dbm`. No inclusion check.
    pub fn add_dbm(&mut self, dbm: &[Raw], alloc: &mut DbmAllocator) -> Result<(), AllocError> {
        let id = alloc.allocate_from(&dbm[..self.dim * self.dim])?;
        self.dbms.push(id);
        Ok(())
    }

    /// Make the federation exactly `{dbm}`, reusing one existing block.
    pub fn copy_from_dbm(
        &mut self,
        dbm: &[Raw],
        alloc: &mut DbmAllocator,
    ) -> Result<(), AllocError> {
        let n = self.dim * self.dim;
        match self.dbms.pop() {
            Some(keep) => {
                self.release(alloc);
                alloc.dbm_mut(&keep, self.dim).copy_from_slice(&dbm[..n]);
                self.dbms.push(keep);
                Ok(())
            }
            None => self.add_dbm(dbm, alloc),
        }
    }

    /// A new list holding copies of every member.
    pub fn copy(&self, alloc: &mut DbmAllocator) -> Result<FedList, AllocError> {
        let mut out = FedList::new(self.dim);
        if let Err(e) = out.add_copy(self, alloc) {
            out.release(alloc);
            return Err(e);
        }
        Ok(out)
    }

    /// Overwrite `dst` with copies of this list, reusing its blocks and
    /// releasing the ones left over. On error `dst` holds a prefix of the
    /// copy and nothing is leaked.
    pub fn copy_into(&self, dst: &mut FedList, alloc: &mut DbmAllocator) -> Result<(), AllocError> {
        let dim = self.dim;
        let mut spare = dst.take_dbms();
        dst.dim = dim;
        for src in &self.dbms {
            let id = match spare.pop() {
                Some(id) => id,
                None => alloc.allocate()?,
            };
            alloc.copy_block(&id, src, dim);
            dst.dbms.push(id);
        }
        alloc.deallocate_list(spare);
        Ok(())
    }

    /// Append copies of every member of `other`, without inclusion checks.
    /// On error the copies made so far are released.
    pub fn add_copy(&mut self, other: &FedList, alloc: &mut DbmAllocator) -> Result<(), AllocError> {
        assert_eq!(self.dim, other.dim, "dimension mismatch");
        let start = self.dbms.len();
        for src in &other.dbms {
            match alloc.duplicate(src, self.dim) {
                Ok(id) => self.dbms.push(id),
                Err(e) => {
                    let added = self.dbms.split_off(start);
                    alloc.deallocate_list(added);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Move every member of `other` into this list, without inclusion checks.
    pub fn append(&mut self, mut other: FedList) {
        assert_eq!(self.dim, other.dim, "dimension mismatch");
        self.dbms.append(&mut other.dbms);
    }

    /// Drop members whose matrix is marked empty.
    pub fn clean_up(&mut self, alloc: &mut DbmAllocator) {
        self.retain_members(alloc, |dbm, dim| !is_empty(dbm, dim));
    }

    /// Whether some member is exactly `dbm`.
    pub fn has_dbm(&self, dbm: &[Raw], alloc: &DbmAllocator) -> bool {
        self.iter(alloc).any(|m| ops::are_equal(m, dbm, self.dim))
    }

    /// Apply `keep` to every member in place and release the members for
    /// which it returns `false`.
    pub(crate) fn retain_members(
        &mut self,
        alloc: &mut DbmAllocator,
        mut keep: impl FnMut(&mut [Raw], usize) -> bool,
    ) {
        let dim = self.dim;
        let old = self.take_dbms();
        for id in old {
            if keep(alloc.dbm_mut(&id, dim), dim) {
                self.dbms.push(id);
            } else {
                alloc.deallocate(id);
            }
        }
    }

    pub(crate) fn for_each_member(&mut self, alloc: &mut DbmAllocator, mut f: impl FnMut(&mut [Raw], usize)) {
        let dim = self.dim;
        for id in &self.dbms {
            f(alloc.dbm_mut(id, dim), dim);
        }
    }

    /// Tighten every member with `xi - xj ≺ value`. Returns whether the
    /// federation is still non-empty.
    pub fn constrain1(&mut self, i: usize, j: usize, value: Raw, alloc: &mut DbmAllocator) -> bool {
        assert!(i < self.dim && j < self.dim && i != j, "bad clock pair ({i}, {j})");
        self.retain_members(alloc, |dbm, dim| ops::constrain1(dbm, dim, i, j, value));
        !self.is_empty()
    }

    /// Tighten every member with all of `constraints`.
    pub fn constrain_n(&mut self, constraints: &[Constraint], alloc: &mut DbmAllocator) -> bool {
        self.retain_members(alloc, |dbm, dim| ops::constrain_n(dbm, dim, constraints));
        !self.is_empty()
    }

    /// Tighten every member with `constraints`, translating clock ids
    /// through `table`.
    pub fn constrain_indexed_n(
        &mut self,
        table: &[usize],
        constraints: &[Constraint],
        alloc: &mut DbmAllocator,
    ) -> bool {
        self.retain_members(alloc, |dbm, dim| {
            ops::constrain_indexed_n(dbm, dim, table, constraints)
        });
        !self.is_empty()
    }

    /// Whether some member admits `xi - xj ≺ value`.
    pub fn satisfies(&self, i: usize, j: usize, value: Raw, alloc: &DbmAllocator) -> bool {
        self.iter(alloc)
            .any(|m| ops::satisfies(m, self.dim, i, j, value))
    }

    /// Delay every member.
    pub fn up(&mut self, alloc: &mut DbmAllocator) {
        self.for_each_member(alloc, ops::up);
    }

    /// Past of every member.
    pub fn down(&mut self, alloc: &mut DbmAllocator) {
        self.for_each_member(alloc, ops::down);
    }

    /// Remove every constraint on clock `k`.
    pub fn free_clock(&mut self, k: usize, alloc: &mut DbmAllocator) {
        assert!(k > 0 && k < self.dim, "bad clock {k}");
        self.for_each_member(alloc, |dbm, dim| ops::free_clock(dbm, dim, k));
    }

    /// `xk := value`.
    pub fn update_value(&mut self, k: usize, value: i32, alloc: &mut DbmAllocator) {
        assert!(k > 0 && k < self.dim, "bad clock {k}");
        self.for_each_member(alloc, |dbm, dim| ops::update_value(dbm, dim, k, value));
    }

    /// `xi := xj`.
    pub fn update_clock(&mut self, i: usize, j: usize, alloc: &mut DbmAllocator) {
        assert!(i > 0 && i < self.dim && j > 0 && j < self.dim, "bad clocks ({i}, {j})");
        self.for_each_member(alloc, |dbm, dim| ops::update_clock(dbm, dim, i, j));
    }

    /// `xk := xk + value`.
    pub fn update_increment(&mut self, k: usize, value: i32, alloc: &mut DbmAllocator) {
        assert!(k > 0 && k < self.dim, "bad clock {k}");
        self.for_each_member(alloc, |dbm, dim| ops::update_increment(dbm, dim, k, value));
    }

    /// `xi := xj + value`.
    pub fn update(&mut self, i: usize, j: usize, value: i32, alloc: &mut DbmAllocator) {
        assert!(i > 0 && i < self.dim && j > 0 && j < self.dim, "bad clocks ({i}, {j})");
        self.for_each_member(alloc, |dbm, dim| ops::update(dbm, dim, i, j, value));
    }

    /// Remove the upper bounds of every clock.
    pub fn stretch_up(&mut self, alloc: &mut DbmAllocator) {
        self.for_each_member(alloc, ops::free_all_up);
    }

    /// Remove the lower bounds of clock `k`.
    pub fn stretch_down(&mut self, k: usize, alloc: &mut DbmAllocator) {
        assert!(k > 0 && k < self.dim, "bad clock {k}");
        self.for_each_member(alloc, |dbm, dim| ops::free_down(dbm, dim, k));
    }

    /// Smallest delay: relax strict upper bounds where possible.
    pub fn micro_delay(&mut self, alloc: &mut DbmAllocator) {
        self.for_each_member(alloc, ops::relax_up);
    }

    /// Whether some member has no upper bound on any clock.
    pub fn is_unbounded(&self, alloc: &DbmAllocator) -> bool {
        self.iter(alloc).any(|m| ops::is_unbounded(m, self.dim))
    }

    /// Whether the integer valuation `point` is in the federation.
    pub fn is_point_included(&self, point: &[i32], alloc: &DbmAllocator) -> bool {
        assert!(point.len() >= self.dim, "point too short");
        self.iter(alloc)
            .any(|m| ops::is_point_included(point, m, self.dim))
    }

    /// Whether the real valuation `point` is in the federation.
    pub fn is_real_point_included(&self, point: &[f64], alloc: &DbmAllocator) -> bool {
        assert!(point.len() >= self.dim, "point too short");
        self.iter(alloc)
            .any(|m| ops::is_real_point_included(point, m, self.dim))
    }

    /// Convex hull of `dbm` and every member, written into `dbm`.
    pub fn convex_union(&self, dbm: &mut [Raw], alloc: &DbmAllocator) {
        for m in self.iter(alloc) {
            ops::convex_union(dbm, m, self.dim);
        }
    }

    /// Replace the federation by the convex hull of its members.
    pub fn convex_union_with_self(&mut self, alloc: &mut DbmAllocator) {
        let Some(hull) = self.dbms.pop() else {
            return;
        };
        let dim = self.dim;
        for other in self.take_dbms() {
            {
                let (d, s) = alloc.pair_mut(&hull, &other);
                ops::convex_union(d, s, dim);
            }
            alloc.deallocate(other);
        }
        self.dbms.push(hull);
    }
}

impl fmt::Debug for FedList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FedList")
            .field("dim", &self.dim)
            .field("len", &self.dbms.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fed_of;
    use zonefed_test_utils::zone;

    #[test]
    fn copy_from_dbm_reuses_a_block() {
        let mut alloc = DbmAllocator::with_max_dim(4);
        let mut fed = FedList::new(3);
        fed.add_zero(&mut alloc).unwrap();
        fed.add_init(&mut alloc).unwrap();
        assert_eq!(alloc.live_blocks(), 2);

        let z = zone(3, &[(1, 0, 5)]);
        fed.copy_from_dbm(z.as_slice(), &mut alloc).unwrap();
        assert_eq!(fed.len(), 1);
        assert_eq!(alloc.live_blocks(), 1);
        assert!(fed.has_dbm(z.as_slice(), &alloc));
        fed.release(&mut alloc);
        assert_eq!(alloc.live_blocks(), 0);
    }

    #[test]
    fn copy_into_releases_extra_blocks() {
        let mut alloc = DbmAllocator::with_max_dim(3);
        let src = fed_of(&mut alloc, 3, &[zone(3, &[(1, 0, 1)])]);
        let mut dst = FedList::new(3);
        for _ in 0..3 {
            dst.add_init(&mut alloc).unwrap();
        }
        src.copy_into(&mut dst, &mut alloc).unwrap();
        assert_eq!(dst.len(), 1);
        assert_eq!(alloc.live_blocks(), 2);
        let mut src = src;
        src.release(&mut alloc);
        dst.release(&mut alloc);
    }

    #[test]
    fn add_copy_rolls_back_on_budget() {
        let config = zonefed_arena::AllocatorConfig::new(3).with_max_blocks(3);
        let mut alloc = DbmAllocator::new(config);
        let mut src = FedList::new(3);
        src.add_zero(&mut alloc).unwrap();
        src.add_init(&mut alloc).unwrap();
        let mut dst = FedList::new(3);
        assert!(dst.add_copy(&src, &mut alloc).is_err());
        assert!(dst.is_empty());
        assert_eq!(alloc.live_blocks(), 2);
        src.release(&mut alloc);
    }

    #[test]
    fn constrain_drops_members_that_empty() {
        let mut alloc = DbmAllocator::with_max_dim(2);
        let mut fed = fed_of(
            &mut alloc,
            2,
            &[zone(2, &[(1, 0, 1)]), zone(2, &[(0, 1, -5)])],
        );
        // x1 >= 3 kills the first member
        assert!(fed.constrain1(0, 1, Raw::weak(-3), &mut alloc));
        assert_eq!(fed.len(), 1);
        assert!(!fed.constrain1(1, 0, Raw::weak(2), &mut alloc));
        assert!(fed.is_empty());
        assert_eq!(alloc.live_blocks(), 0);
    }

    #[test]
    fn satisfies_and_points() {
        let mut alloc = DbmAllocator::with_max_dim(3);
        let mut fed = fed_of(&mut alloc, 3, &[zone(3, &[(1, 0, 2), (2, 0, 2)])]);
        assert!(fed.satisfies(1, 0, Raw::weak(1), &alloc));
        assert!(!fed.satisfies(0, 1, Raw::strict(-2), &alloc));
        assert!(fed.is_point_included(&[0, 1, 2], &alloc));
        assert!(!fed.is_point_included(&[0, 3, 0], &alloc));
        assert!(fed.is_real_point_included(&[0.0, 1.5, 0.25], &alloc));
        assert!(!fed.is_unbounded(&alloc));
        fed.up(&mut alloc);
        assert!(fed.is_unbounded(&alloc));
        fed.release(&mut alloc);
    }

    #[test]
    fn convex_union_with_self_keeps_one_member() {
        let mut alloc = DbmAllocator::with_max_dim(2);
        let a = zone(2, &[(1, 0, 1)]);
        let b = zone(2, &[(0, 1, -4), (1, 0, 5)]);
        let mut fed = fed_of(&mut alloc, 2, &[a, b]);
        fed.convex_union_with_self(&mut alloc);
        assert_eq!(fed.len(), 1);
        assert!(fed.is_point_included(&[0, 2], &alloc));
        assert!(!fed.is_point_included(&[0, 6], &alloc));
        assert_eq!(alloc.live_blocks(), 1);
        fed.release(&mut alloc);
    }

    #[test]
    fn updates_apply_to_every_member() {
        let mut alloc = DbmAllocator::with_max_dim(3);
        let mut fed = fed_of(
            &mut alloc,
            3,
            &[zone(3, &[(1, 0, 1)]), zone(3, &[(0, 1, -4)])],
        );
        fed.update_value(1, 7, &mut alloc);
        assert!(fed.iter(&alloc).all(|m| m[3] == Raw::weak(7)));
        fed.update_clock(2, 1, &mut alloc);
        assert!(fed.is_point_included(&[0, 7, 7], &alloc));
        fed.update_increment(2, 1, &mut alloc);
        assert!(fed.is_point_included(&[0, 7, 8], &alloc));
        fed.free_clock(2, &mut alloc);
        assert!(fed.is_point_included(&[0, 7, 100], &alloc));
        fed.release(&mut alloc);
    }
}
