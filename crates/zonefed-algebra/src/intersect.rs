//! Intersection with a zone or a federation.

use zonefed_arena::{AllocError, DbmAllocator};
use zonefed_core::Raw;
use zonefed_dbm::ops;

use crate::fedlist::FedList;

impl FedList {
    /// `self ∩ dbm` as a new list; `self` is untouched.
    pub fn intersection(&self, dbm: &[Raw], alloc: &mut DbmAllocator) -> Result<FedList, AllocError> {
        let dim = self.dim();
        let mut out = FedList::new(dim);
        if dim <= 1 {
            if !self.is_empty() {
                out.add_zero(alloc)?;
            }
            return Ok(out);
        }
        for src in &self.dbms {
            let copy = match alloc.duplicate(src, dim) {
                Ok(id) => id,
                Err(e) => {
                    out.release(alloc);
                    return Err(e);
                }
            };
            if ops::intersection(alloc.dbm_mut(&copy, dim), dbm, dim) {
                out.push(copy);
            } else {
                alloc.deallocate(copy);
            }
        }
        Ok(out)
    }

    /// `self := self ∩ dbm`.
    pub fn intersect_dbm(&mut self, dbm: &[Raw], alloc: &mut DbmAllocator) {
        if self.dim() <= 1 {
            return;
        }
        self.retain_members(alloc, |m, dim| ops::intersection(m, dbm, dim));
    }

    /// `self := self ∩ other`. On error `self` is unchanged.
    pub fn intersect_fed(&mut self, other: &FedList, alloc: &mut DbmAllocator) -> Result<(), AllocError> {
        assert_eq!(self.dim(), other.dim(), "dimension mismatch");
        if other.is_empty() {
            self.release(alloc);
            return Ok(());
        }
        if self.is_empty() || self.dim() <= 1 {
            return Ok(());
        }
        let dim = self.dim();
        let Some((last, firsts)) = other.dbms.split_last() else {
            return Ok(());
        };
        let mut scratch = vec![Raw::LE_ZERO; dim * dim];
        let mut collected = FedList::new(dim);
        for id in firsts {
            scratch.copy_from_slice(alloc.dbm(id, dim));
            match self.intersection(&scratch, alloc) {
                Ok(part) => collected.append(part),
                Err(e) => {
                    collected.release(alloc);
                    return Err(e);
                }
            }
        }
        scratch.copy_from_slice(alloc.dbm(last, dim));
        self.intersect_dbm(&scratch, alloc);
        self.append(collected);
        Ok(())
    }

    /// `self ∩ other` as a new list.
    pub fn intersection_with_fed(
        &self,
        other: &FedList,
        alloc: &mut DbmAllocator,
    ) -> Result<FedList, AllocError> {
        assert_eq!(self.dim(), other.dim(), "dimension mismatch");
        let dim = self.dim();
        let mut out = FedList::new(dim);
        if dim <= 1 {
            if !self.is_empty() && !other.is_empty() {
                out.add_zero(alloc)?;
            }
            return Ok(out);
        }
        let mut scratch = vec![Raw::LE_ZERO; dim * dim];
        for id in &other.dbms {
            scratch.copy_from_slice(alloc.dbm(id, dim));
            match self.intersection(&scratch, alloc) {
                Ok(part) => out.append(part),
                Err(e) => {
                    out.release(alloc);
                    return Err(e);
                }
            }
        }
        Ok(out)
    }

    /// Whether some member meets `dbm`.
    pub fn has_intersection_with_dbm(&self, dbm: &[Raw], alloc: &DbmAllocator) -> bool {
        self.iter(alloc).any(|m| ops::intersects(m, dbm, self.dim()))
    }

    /// Whether some member meets some member of `other`.
    pub fn has_intersection_with_fed(&self, other: &FedList, alloc: &DbmAllocator) -> bool {
        assert_eq!(self.dim(), other.dim(), "dimension mismatch");
        self.iter(alloc)
            .any(|m| other.has_intersection_with_dbm(m, alloc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fed_of, same_points};
    use zonefed_test_utils::zone;

    #[test]
    fn intersection_keeps_non_empty_parts() {
        let mut alloc = DbmAllocator::with_max_dim(2);
        let mut fed = fed_of(
            &mut alloc,
            2,
            &[zone(2, &[(1, 0, 2)]), zone(2, &[(0, 1, -5), (1, 0, 8)])],
        );
        let window = zone(2, &[(0, 1, -1), (1, 0, 3)]);
        let mut part = fed.intersection(window.as_slice(), &mut alloc).unwrap();
        assert_eq!(part.len(), 1);
        assert!(part.is_point_included(&[0, 2], &alloc));
        assert!(!part.is_point_included(&[0, 3], &alloc));
        assert_eq!(fed.len(), 2);

        fed.intersect_dbm(window.as_slice(), &mut alloc);
        assert!(same_points(&fed, &part, &alloc, 10));
        part.release(&mut alloc);
        fed.release(&mut alloc);
        assert_eq!(alloc.live_blocks(), 0);
    }

    #[test]
    fn intersect_fed_matches_copying_form() {
        let mut alloc = DbmAllocator::with_max_dim(3);
        let mut a = fed_of(
            &mut alloc,
            3,
            &[zone(3, &[(1, 0, 4)]), zone(3, &[(2, 0, 4)])],
        );
        let mut b = fed_of(
            &mut alloc,
            3,
            &[zone(3, &[(0, 1, -2)]), zone(3, &[(0, 2, -3), (1, 0, 6)])],
        );
        let mut copied = a.intersection_with_fed(&b, &mut alloc).unwrap();
        assert!(a.has_intersection_with_fed(&b, &alloc));
        a.intersect_fed(&b, &mut alloc).unwrap();
        assert!(same_points(&a, &copied, &alloc, 8));
        assert!(a.is_point_included(&[0, 3, 5], &alloc));
        assert!(!a.is_point_included(&[0, 1, 2], &alloc));
        a.release(&mut alloc);
        b.release(&mut alloc);
        copied.release(&mut alloc);
    }

    #[test]
    fn empty_operand_empties() {
        let mut alloc = DbmAllocator::with_max_dim(2);
        let mut a = fed_of(&mut alloc, 2, &[zone(2, &[(1, 0, 4)])]);
        let b = FedList::new(2);
        a.intersect_fed(&b, &mut alloc).unwrap();
        assert!(a.is_empty());
        assert_eq!(alloc.live_blocks(), 0);
    }

    #[test]
    fn dim_one_intersection_is_the_origin() {
        let mut alloc = DbmAllocator::with_max_dim(1);
        let mut fed = FedList::new(1);
        fed.add_zero(&mut alloc).unwrap();
        let mut r = fed.intersection(&[Raw::LE_ZERO], &mut alloc).unwrap();
        assert_eq!(r.len(), 1);
        assert_eq!(r.iter(&alloc).next(), Some(&[Raw::LE_ZERO][..]));
        r.release(&mut alloc);
        fed.release(&mut alloc);
    }
}
