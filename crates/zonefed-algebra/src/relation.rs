//! Inclusion and equality between zones and federations.
//!
//! Two families: *partial* tests compare member against member and can
//! miss an inclusion that only holds for the union, *exact* tests go
//! through subtraction and are complete but allocate.

use zonefed_arena::{AllocError, DbmAllocator};
use zonefed_core::{Raw, Relation};
use zonefed_dbm::ops;

use crate::fedlist::FedList;
use crate::subtract::{subtract_fed_from_dbm, SubtractOptions};

/// Whether `dbm` is included in a single member of `fed`.
pub fn is_included_in(dbm: &[Raw], fed: &FedList, alloc: &DbmAllocator) -> bool {
    let dim = fed.dim();
    fed.iter(alloc).any(|m| ops::is_subset_eq(dbm, m, dim))
}

/// Whether `dbm ⊆ fed`, exactly.
pub fn is_really_included_in(
    dbm: &[Raw],
    fed: &FedList,
    opts: SubtractOptions,
    alloc: &mut DbmAllocator,
) -> Result<bool, AllocError> {
    if is_included_in(dbm, fed, alloc) {
        return Ok(true);
    }
    let mut rest = subtract_fed_from_dbm(dbm, fed, opts, alloc)?;
    let included = rest.is_empty();
    rest.release(alloc);
    Ok(included)
}

impl FedList {
    /// Relation of `dbm` against this federation, member by member.
    ///
    /// Reports `dbm ⊆ self` if one member includes it, and `dbm ⊇ self` if
    /// it includes every member, so any zone includes the empty
    /// federation.
    pub fn partial_relation_dbm(&self, dbm: &[Raw], alloc: &DbmAllocator) -> Relation {
        let dim = self.dim();
        let mut subset = false;
        let mut superset = true;
        for m in self.iter(alloc) {
            let rel = ops::relation(dbm, m, dim);
            subset |= rel.is_subset();
            superset &= rel.is_superset();
        }
        Relation::from_inclusions(subset, superset)
    }

    /// Relation of this federation against `other`, member by member.
    pub fn partial_relation(&self, other: &FedList, alloc: &DbmAllocator) -> Relation {
        Relation::from_inclusions(
            self.are_dbms_included_in(other, alloc),
            other.are_dbms_included_in(self, alloc),
        )
    }

    /// Exact relation of `dbm` against this federation.
    pub fn relation_dbm(
        &self,
        dbm: &[Raw],
        opts: SubtractOptions,
        alloc: &mut DbmAllocator,
    ) -> Result<Relation, AllocError> {
        let subset = is_really_included_in(dbm, self, opts, alloc)?;
        let mut over = self.subtract_dbm_from_fed(dbm, opts, alloc)?;
        let superset = over.is_empty();
        over.release(alloc);
        Ok(Relation::from_inclusions(subset, superset))
    }

    /// Exact relation of this federation against `other`.
    pub fn relation(
        &self,
        other: &FedList,
        opts: SubtractOptions,
        alloc: &mut DbmAllocator,
    ) -> Result<Relation, AllocError> {
        let subset = self.are_dbms_really_included_in(other, opts, alloc)?;
        let superset = other.are_dbms_really_included_in(self, opts, alloc)?;
        Ok(Relation::from_inclusions(subset, superset))
    }

    /// Whether every member is included in a single member of `other`.
    pub fn are_dbms_included_in(&self, other: &FedList, alloc: &DbmAllocator) -> bool {
        assert_eq!(self.dim(), other.dim(), "dimension mismatch");
        self.iter(alloc).all(|m| is_included_in(m, other, alloc))
    }

    /// Whether `self ⊆ other`, exactly.
    pub fn are_dbms_really_included_in(
        &self,
        other: &FedList,
        opts: SubtractOptions,
        alloc: &mut DbmAllocator,
    ) -> Result<bool, AllocError> {
        assert_eq!(self.dim(), other.dim(), "dimension mismatch");
        if self.are_dbms_included_in(other, alloc) {
            return Ok(true);
        }
        if other.is_empty() {
            return Ok(false);
        }
        let mut rest = self.subtract_fed_from_fed(other, opts, alloc)?;
        let included = rest.is_empty();
        rest.release(alloc);
        Ok(included)
    }

    /// Whether both federations denote the same set.
    pub fn are_equal(
        &self,
        other: &FedList,
        opts: SubtractOptions,
        alloc: &mut DbmAllocator,
    ) -> Result<bool, AllocError> {
        Ok(self.relation(other, opts, alloc)? == Relation::Equal)
    }
}
