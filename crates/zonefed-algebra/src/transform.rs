//! Whole-federation transforms: predecessors, clock-set changes and
//! extrapolation.

use zonefed_arena::{AllocError, DbmAllocator};
use zonefed_core::{compute_tables, ClockSet, Raw};
use zonefed_dbm::{
    diagonal_extrapolate_lu_bounds, diagonal_extrapolate_max_bounds, extrapolate_lu_bounds,
    extrapolate_max_bounds, update_dbm,
};

use crate::fedlist::FedList;
use crate::subtract::SubtractOptions;

impl FedList {
    /// Timed predecessors of `self` avoiding `bad`, written into `self`.
    ///
    /// This keeps the historical algorithm, which is known to be
    /// imprecise: `G = down(self) - down(bad)`, then
    /// `self := (self ∩ down(bad)) - bad`, and finally
    /// `self := down(self) ∪ G` (or just `G` if `self` became empty).
    /// Do not use it as a reference for predecessor computation.
    ///
    /// `bad` is emptied in every case. On error `self` holds an
    /// intermediate result but nothing is leaked.
    pub fn predt(
        &mut self,
        bad: &mut FedList,
        opts: SubtractOptions,
        alloc: &mut DbmAllocator,
    ) -> Result<(), AllocError> {
        assert_eq!(self.dim(), bad.dim(), "dimension mismatch");
        let result = if self.is_empty() {
            Ok(())
        } else if bad.is_empty() {
            self.down(alloc);
            Ok(())
        } else {
            self.predt_general(bad, opts, alloc)
        };
        bad.release(alloc);
        result
    }

    fn predt_general(
        &mut self,
        bad: &FedList,
        opts: SubtractOptions,
        alloc: &mut DbmAllocator,
    ) -> Result<(), AllocError> {
        let mut good_down = self.copy(alloc)?;
        good_down.down(alloc);
        let mut bad_down = match bad.copy(alloc) {
            Ok(fed) => fed,
            Err(e) => {
                good_down.release(alloc);
                return Err(e);
            }
        };
        bad_down.down(alloc);

        let steps = good_down
            .subtract_fed(&bad_down, opts, alloc)
            .and_then(|()| self.intersect_fed(&bad_down, alloc))
            .and_then(|()| self.subtract_fed(bad, opts, alloc));
        bad_down.release(alloc);
        if let Err(e) = steps {
            good_down.release(alloc);
            return Err(e);
        }

        if self.is_empty() {
            self.dbms = good_down.take_dbms();
        } else {
            self.down(alloc);
            self.union(good_down, alloc);
        }
        Ok(())
    }

    /// Move the federation from the active clocks `before` to `after`.
    ///
    /// Returns the table mapping each global clock to its new physical
    /// index ([`zonefed_core::NO_SOURCE`] when inactive). Clocks that stay
    /// active keep their constraints, dropped clocks vanish and new clocks
    /// are unconstrained (apart from being non-negative). Collapsing to the
    /// reference clock alone leaves at most one member, the origin.
    ///
    /// Only one spare block is needed. On error `self` is unchanged.
    pub fn shrink_expand(
        &mut self,
        before: &ClockSet,
        after: &ClockSet,
        alloc: &mut DbmAllocator,
    ) -> Result<Vec<usize>, AllocError> {
        assert_eq!(self.dim(), before.count(), "federation does not match the active clocks");
        let tables = compute_tables(before, after);
        assert!(tables.dim <= alloc.max_dim(), "{} clocks exceed the allocator", tables.dim);

        if self.is_empty() {
            self.set_dim(tables.dim);
            return Ok(tables.table);
        }
        if tables.dim <= 1 {
            let extra = self.dbms.split_off(1);
            alloc.deallocate_list(extra);
            alloc.dbm_mut(&self.dbms[0], 1)[0] = Raw::LE_ZERO;
            self.set_dim(1);
            return Ok(tables.table);
        }

        let dim_src = self.dim();
        let mut spare = alloc.allocate()?;
        let old = self.take_dbms();
        for src in old {
            {
                let (dst, from) = alloc.pair_mut(&spare, &src);
                update_dbm(dst, from, tables.dim, dim_src, &tables.cols);
            }
            self.dbms.push(spare);
            spare = src;
        }
        alloc.deallocate(spare);
        self.set_dim(tables.dim);
        Ok(tables.table)
    }

    /// Classical extrapolation with one maximal constant per clock.
    pub fn extrapolate_max_bounds(&mut self, max: &[i32], alloc: &mut DbmAllocator) {
        assert!(max.len() >= self.dim(), "one bound per clock");
        self.for_each_member(alloc, |dbm, dim| extrapolate_max_bounds(dbm, dim, max));
    }

    /// Diagonal-aware extrapolation with one maximal constant per clock.
    pub fn diagonal_extrapolate_max_bounds(&mut self, max: &[i32], alloc: &mut DbmAllocator) {
        assert!(max.len() >= self.dim(), "one bound per clock");
        self.for_each_member(alloc, |dbm, dim| diagonal_extrapolate_max_bounds(dbm, dim, max));
    }

    /// Extrapolation with separate lower and upper constants.
    pub fn extrapolate_lu_bounds(&mut self, lower: &[i32], upper: &[i32], alloc: &mut DbmAllocator) {
        assert!(lower.len() >= self.dim() && upper.len() >= self.dim(), "one bound per clock");
        self.for_each_member(alloc, |dbm, dim| extrapolate_lu_bounds(dbm, dim, lower, upper));
    }

    /// Diagonal-aware extrapolation with separate lower and upper constants.
    pub fn diagonal_extrapolate_lu_bounds(
        &mut self,
        lower: &[i32],
        upper: &[i32],
        alloc: &mut DbmAllocator,
    ) {
        assert!(lower.len() >= self.dim() && upper.len() >= self.dim(), "one bound per clock");
        self.for_each_member(alloc, |dbm, dim| {
            diagonal_extrapolate_lu_bounds(dbm, dim, lower, upper)
        });
    }
}
