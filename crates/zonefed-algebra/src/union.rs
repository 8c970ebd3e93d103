//! Union with local pruning, and redundancy removal.

use tracing::trace;
use zonefed_arena::{AllocError, BlockId, DbmAllocator};
use zonefed_core::{Raw, Relation};
use zonefed_dbm::ops;

use crate::fedlist::FedList;
use crate::subtract::SubtractOptions;

impl FedList {
    /// Add `candidate` unless a member already includes it, dropping the
    /// members it includes. Returns whether it was kept.
    fn absorb(&mut self, candidate: BlockId, alloc: &mut DbmAllocator) -> bool {
        let dim = self.dim();
        let mut k = 0;
        while k < self.dbms.len() {
            match ops::relation(alloc.dbm(&candidate, dim), alloc.dbm(&self.dbms[k], dim), dim) {
                Relation::Superset => {
                    let gone = self.dbms.swap_remove(k);
                    alloc.deallocate(gone);
                }
                Relation::Subset | Relation::Equal => {
                    alloc.deallocate(candidate);
                    return false;
                }
                Relation::Different => k += 1,
            }
        }
        self.dbms.push(candidate);
        true
    }

    /// Union consuming `candidates`. Each candidate is dropped if a member
    /// includes it; otherwise the members it includes are dropped and it is
    /// added. Returns whether at least one candidate was added.
    ///
    /// Only pairwise domination is pruned; see [`FedList::reduce`] and
    /// [`FedList::expensive_reduce`].
    pub fn union(&mut self, mut candidates: FedList, alloc: &mut DbmAllocator) -> bool {
        assert_eq!(self.dim(), candidates.dim(), "dimension mismatch");
        if self.is_empty() {
            self.dbms = candidates.take_dbms();
            return !self.is_empty();
        }
        let mut accepted = false;
        for candidate in candidates.take_dbms() {
            accepted |= self.absorb(candidate, alloc);
        }
        accepted
    }

    /// Union with copies of the members of `other`, which is untouched.
    ///
    /// On error the candidates accepted before the failure stay in `self`;
    /// nothing is leaked and `self` remains a valid federation.
    pub fn union_with_copy(
        &mut self,
        other: &FedList,
        alloc: &mut DbmAllocator,
    ) -> Result<bool, AllocError> {
        assert_eq!(self.dim(), other.dim(), "dimension mismatch");
        let dim = self.dim();
        let mut accepted = false;
        for src in &other.dbms {
            let dominated = self.dbms.iter().any(|m| {
                ops::relation(alloc.dbm(src, dim), alloc.dbm(m, dim), dim).is_subset()
            });
            if dominated {
                continue;
            }
            let copy = alloc.duplicate(src, dim)?;
            accepted |= self.absorb(copy, alloc);
        }
        Ok(accepted)
    }

    /// Union with a copy of one zone.
    pub fn union_dbm(&mut self, dbm: &[Raw], alloc: &mut DbmAllocator) -> Result<bool, AllocError> {
        let dim = self.dim();
        if self
            .iter(alloc)
            .any(|m| ops::relation(dbm, m, dim).is_subset())
        {
            return Ok(false);
        }
        let copy = alloc.allocate_from(&dbm[..dim * dim])?;
        Ok(self.absorb(copy, alloc))
    }

    /// Union taking every member of `other`, which is left empty.
    pub fn steal(&mut self, other: &mut FedList, alloc: &mut DbmAllocator) -> bool {
        assert_eq!(self.dim(), other.dim(), "dimension mismatch");
        let mut taken = FedList::new(other.dim());
        taken.dbms = other.take_dbms();
        self.union(taken, alloc)
    }

    /// Drop every member included in another member.
    pub fn reduce(&mut self, alloc: &mut DbmAllocator) {
        let dim = self.dim();
        if dim <= 1 {
            if self.dbms.len() > 1 {
                let extra = self.dbms.split_off(1);
                alloc.deallocate_list(extra);
            }
            return;
        }
        let mut i = 0;
        'outer: while i < self.dbms.len() {
            let mut j = i + 1;
            while j < self.dbms.len() {
                let rel = ops::relation(alloc.dbm(&self.dbms[i], dim), alloc.dbm(&self.dbms[j], dim), dim);
                if rel.is_superset() {
                    let gone = self.dbms.swap_remove(j);
                    alloc.deallocate(gone);
                } else if rel == Relation::Subset {
                    let gone = self.dbms.swap_remove(i);
                    alloc.deallocate(gone);
                    continue 'outer;
                } else {
                    j += 1;
                }
            }
            i += 1;
        }
    }

    /// Drop every member covered by the union of the others.
    ///
    /// Costs one subtraction per pair of members, each of which may split.
    /// On error the members already dropped stay dropped; the represented
    /// set is unchanged either way.
    pub fn expensive_reduce(
        &mut self,
        opts: SubtractOptions,
        alloc: &mut DbmAllocator,
    ) -> Result<(), AllocError> {
        let dim = self.dim();
        let mut i = 0;
        while self.dbms.len() > 1 && i < self.dbms.len() {
            let mut rest = FedList::new(dim);
            rest.push(alloc.duplicate(&self.dbms[i], dim)?);
            let mut scratch = vec![Raw::LE_ZERO; dim * dim];
            for j in 0..self.dbms.len() {
                if j == i {
                    continue;
                }
                scratch.copy_from_slice(alloc.dbm(&self.dbms[j], dim));
                if let Err(e) = rest.subtract_dbm(&scratch, opts, alloc) {
                    rest.release(alloc);
                    return Err(e);
                }
                if rest.is_empty() {
                    break;
                }
            }
            if rest.is_empty() {
                let gone = self.dbms.swap_remove(i);
                alloc.deallocate(gone);
                trace!(dim, left = self.dbms.len(), "dropped covered zone");
            } else {
                rest.release(alloc);
                i += 1;
            }
        }
        Ok(())
    }

    /// Drop every member included in some member of `other`. Returns
    /// whether anything was dropped.
    pub fn remove_partial_included(&mut self, other: &FedList, alloc: &mut DbmAllocator) -> bool {
        assert_eq!(self.dim(), other.dim(), "dimension mismatch");
        let dim = self.dim();
        let before = self.dbms.len();
        let old = self.take_dbms();
        for id in old {
            let view: &DbmAllocator = alloc;
            let member = view.dbm(&id, dim);
            let included = other.iter(view).any(|m| ops::is_subset_eq(member, m, dim));
            if included {
                alloc.deallocate(id);
            } else {
                self.dbms.push(id);
            }
        }
        self.dbms.len() != before
    }
}
