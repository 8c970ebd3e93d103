//! The owning federation handle.
//!
//! A [`Federation`] binds a [`FedList`] to one shared allocator for its
//! whole life and translates caller-visible clock ids to DBM indices
//! through an index table. Every clock id is checked against the
//! allocator's maximum dimension and the current active set before it is
//! used.

use std::cell::RefCell;
use std::fmt;
use std::io::{self, BufRead, Write};
use std::rc::Rc;

use tracing::{debug, warn};
use zonefed_algebra::{FedList, SubtractOptions};
use zonefed_arena::DbmAllocator;
use zonefed_core::{ClockSet, Constraint, Raw, Relation, Strictness, NO_SOURCE};
use zonefed_dbm::{close, is_empty, Dbm};

use crate::error::FederationError;
use crate::io::{pretty_print, read_fed, write_fed, PrintFormat};

/// An allocator shared by every federation of one exploration worker.
pub type SharedAllocator = Rc<RefCell<DbmAllocator>>;

/// Wrap an allocator for sharing between federations.
pub fn shared(alloc: DbmAllocator) -> SharedAllocator {
    Rc::new(RefCell::new(alloc))
}

/// A federation bound to a shared allocator, with a clock-id index table.
///
/// Dropping the handle gives its blocks back to the allocator. Operations
/// combining two handles require both to use the same allocator and to
/// have the same dimension; mixing allocators panics.
///
/// The index table holds one entry per clock id below the allocator's
/// `max_dim`.
///
/// Clock ids passed to `constrain`, `satisfies`, `free_clock` and the
/// `update_*` family are logical ids. DBM arguments, points and
/// extrapolation constants are indexed by DBM row, i.e. physical index.
pub struct Federation {
    alloc: SharedAllocator,
    fed: FedList,
    index: Vec<usize>,
    opts: SubtractOptions,
}

impl Federation {
    /// Empty federation over clocks `0..dim`, with an identity index table.
    ///
    /// # Panics
    ///
    /// Panics if `dim` is zero or larger than the allocator's `max_dim`.
    pub fn new(alloc: &SharedAllocator, dim: usize) -> Self {
        let max_dim = alloc.borrow().max_dim();
        assert!(dim >= 1 && dim <= max_dim, "dimension {dim} outside 1..={max_dim}");
        Self {
            alloc: Rc::clone(alloc),
            fed: FedList::new(dim),
            index: identity(max_dim),
            opts: SubtractOptions::default(),
        }
    }

    /// Empty federation over the active clocks of `clocks`.
    ///
    /// # Panics
    ///
    /// Panics if the reference clock is inactive or an active clock id is
    /// not below the allocator's `max_dim`.
    pub fn with_active_clocks(alloc: &SharedAllocator, clocks: &ClockSet) -> Self {
        let mut fed = Self::new(alloc, 1);
        fed.init_index_table_from_bits(clocks);
        fed
    }

    /// Deep copy sharing the same allocator.
    pub fn try_clone(&self) -> Result<Self, FederationError> {
        let fed = self.fed.copy(&mut self.alloc.borrow_mut())?;
        Ok(Self {
            alloc: Rc::clone(&self.alloc),
            fed,
            index: self.index.clone(),
            opts: self.opts,
        })
    }

    /// Make `self` a copy of `other`, index table included, reusing the
    /// blocks `self` already owns.
    pub fn assign(&mut self, other: &Federation) -> Result<(), FederationError> {
        self.check_allocator(other);
        other.fed.copy_into(&mut self.fed, &mut self.alloc.borrow_mut())?;
        self.index.copy_from_slice(&other.index);
        Ok(())
    }

    /// The allocator this federation is bound to.
    pub fn allocator(&self) -> &SharedAllocator {
        &self.alloc
    }

    /// Number of active clocks, including the reference clock.
    pub fn dim(&self) -> usize {
        self.fed.dim()
    }

    /// Number of member DBMs.
    pub fn len(&self) -> usize {
        self.fed.len()
    }

    /// Whether the federation denotes the empty set.
    pub fn is_empty(&self) -> bool {
        self.fed.is_empty()
    }

    /// Clock id to DBM index, [`NO_SOURCE`] for inactive clocks.
    pub fn index_table(&self) -> &[usize] {
        &self.index
    }

    /// Options used by every subtraction-based operation.
    pub fn options(&self) -> SubtractOptions {
        self.opts
    }

    /// Change the subtraction options.
    pub fn set_options(&mut self, opts: SubtractOptions) {
        self.opts = opts;
    }

    /// The underlying list. Its blocks live in [`Federation::allocator`].
    pub fn as_fed_list(&self) -> &FedList {
        &self.fed
    }

    /// Copies of every member.
    pub fn to_dbms(&self) -> Vec<Dbm> {
        let alloc = self.alloc.borrow();
        let dim = self.dim();
        self.fed
            .iter(&alloc)
            .filter_map(|m| Dbm::from_cells(dim, m.to_vec()))
            .collect()
    }

    /// Visit every member matrix.
    pub fn for_each_dbm(&self, mut f: impl FnMut(&[Raw])) {
        let alloc = self.alloc.borrow();
        for m in self.fed.iter(&alloc) {
            f(m);
        }
    }

    fn physical(&self, clock: usize) -> usize {
        let max_dim = self.alloc.borrow().max_dim();
        assert!(clock < max_dim, "clock {clock} outside the allocator's {max_dim} clocks");
        let p = self.index[clock];
        assert!(p < self.dim(), "clock {clock} is not active");
        p
    }

    fn check_allocator(&self, other: &Federation) {
        assert!(
            Rc::ptr_eq(&self.alloc, &other.alloc),
            "federations bound to different allocators"
        );
    }

    fn check_peer(&self, other: &Federation) {
        self.check_allocator(other);
        assert_eq!(self.dim(), other.dim(), "dimension mismatch");
    }

    fn check_dbm(&self, dbm: &Dbm) {
        assert_eq!(self.dim(), dbm.dim(), "dimension mismatch");
    }

    /// Give every member back to the allocator.
    pub fn reset(&mut self) {
        self.fed.release(&mut self.alloc.borrow_mut());
    }

    /// Make the federation exactly the origin, every clock zero.
    pub fn init_to_zero(&mut self) -> Result<(), FederationError> {
        let zero = Dbm::zero(self.dim());
        self.fed
            .copy_from_dbm(zero.as_slice(), &mut self.alloc.borrow_mut())?;
        Ok(())
    }

    /// Make the federation the whole non-negative clock space.
    pub fn init_unconstrained(&mut self) -> Result<(), FederationError> {
        let init = Dbm::init(self.dim());
        self.fed
            .copy_from_dbm(init.as_slice(), &mut self.alloc.borrow_mut())?;
        Ok(())
    }

    /// Add a member filled in by `fill`, without inclusion checks.
    ///
    /// `fill` receives a `dim²` row-major matrix set to the unconstrained
    /// zone. The result is closed afterwards; if it is empty the block is
    /// given back and `false` is returned.
    pub fn new_dbm(&mut self, fill: impl FnOnce(&mut [Raw])) -> Result<bool, FederationError> {
        let dim = self.dim();
        let mut cells = Dbm::init(dim).as_slice().to_vec();
        fill(&mut cells);
        if !close(&mut cells, dim) || is_empty(&cells, dim) {
            return Ok(false);
        }
        self.fed.add_dbm(&cells, &mut self.alloc.borrow_mut())?;
        Ok(true)
    }

    /// Append copies of the members of `other`, without inclusion checks.
    pub fn add(&mut self, other: &Federation) -> Result<(), FederationError> {
        self.check_peer(other);
        self.fed.add_copy(&other.fed, &mut self.alloc.borrow_mut())?;
        Ok(())
    }

    /// Append a copy of `dbm`, without inclusion checks.
    pub fn add_dbm(&mut self, dbm: &Dbm) -> Result<(), FederationError> {
        self.check_dbm(dbm);
        self.fed.add_dbm(dbm.as_slice(), &mut self.alloc.borrow_mut())?;
        Ok(())
    }

    /// Union taking every member of `other`, which is left empty.
    pub fn steal_dbms(&mut self, other: &mut Federation) -> bool {
        self.check_peer(other);
        self.fed.steal(&mut other.fed, &mut self.alloc.borrow_mut())
    }

    /// Union consuming `other`. Returns whether anything was added.
    pub fn union_with(&mut self, mut other: Federation) -> bool {
        self.steal_dbms(&mut other)
    }

    /// Union with copies of the members of `other`.
    ///
    /// On error the members accepted so far stay in `self`.
    pub fn union_with_copy(&mut self, other: &Federation) -> Result<bool, FederationError> {
        self.check_peer(other);
        Ok(self
            .fed
            .union_with_copy(&other.fed, &mut self.alloc.borrow_mut())?)
    }

    /// Union with a copy of `dbm`.
    pub fn union_dbm(&mut self, dbm: &Dbm) -> Result<bool, FederationError> {
        self.check_dbm(dbm);
        Ok(self
            .fed
            .union_dbm(dbm.as_slice(), &mut self.alloc.borrow_mut())?)
    }

    /// `self := self ∩ dbm`. Returns whether the result is non-empty.
    pub fn intersect_dbm(&mut self, dbm: &Dbm) -> bool {
        self.check_dbm(dbm);
        self.fed
            .intersect_dbm(dbm.as_slice(), &mut self.alloc.borrow_mut());
        !self.is_empty()
    }

    /// `self := self ∩ other`. Returns whether the result is non-empty.
    pub fn intersect(&mut self, other: &Federation) -> Result<bool, FederationError> {
        self.check_peer(other);
        self.fed
            .intersect_fed(&other.fed, &mut self.alloc.borrow_mut())?;
        Ok(!self.is_empty())
    }

    /// Whether some member of `self` meets some member of `other`.
    pub fn intersects(&self, other: &Federation) -> bool {
        self.check_peer(other);
        self.fed
            .has_intersection_with_fed(&other.fed, &self.alloc.borrow())
    }

    /// Tighten with `xi - xj ≤ bound` or `< bound`. Returns whether the
    /// federation is still non-empty.
    pub fn constrain(&mut self, i: usize, j: usize, bound: i32, strictness: Strictness) -> bool {
        self.constrain_raw(i, j, Raw::new(bound, strictness))
    }

    /// Tighten with an encoded bound on `xi - xj`.
    pub fn constrain_raw(&mut self, i: usize, j: usize, value: Raw) -> bool {
        let (pi, pj) = (self.physical(i), self.physical(j));
        self.fed
            .constrain1(pi, pj, value, &mut self.alloc.borrow_mut())
    }

    /// Tighten with every constraint of `constraints`, given over clock ids.
    pub fn constrain_all(&mut self, constraints: &[Constraint]) -> bool {
        for c in constraints {
            assert_ne!(self.physical(c.i), self.physical(c.j), "constraint on one clock");
        }
        self.fed
            .constrain_indexed_n(&self.index, constraints, &mut self.alloc.borrow_mut())
    }

    /// Whether some member admits `xi - xj ≤ bound` or `< bound`.
    pub fn satisfies(&self, i: usize, j: usize, bound: i32, strictness: Strictness) -> bool {
        self.satisfies_raw(i, j, Raw::new(bound, strictness))
    }

    /// Whether some member admits an encoded bound on `xi - xj`.
    pub fn satisfies_raw(&self, i: usize, j: usize, value: Raw) -> bool {
        let (pi, pj) = (self.physical(i), self.physical(j));
        self.fed.satisfies(pi, pj, value, &self.alloc.borrow())
    }

    /// Let time pass.
    pub fn up(&mut self) {
        self.fed.up(&mut self.alloc.borrow_mut());
    }

    /// Past of every member.
    pub fn down(&mut self) {
        self.fed.down(&mut self.alloc.borrow_mut());
    }

    /// Relax strict upper bounds by an infinitesimal delay.
    pub fn micro_delay(&mut self) {
        self.fed.micro_delay(&mut self.alloc.borrow_mut());
    }

    /// Remove every upper bound.
    pub fn stretch_up(&mut self) {
        self.fed.stretch_up(&mut self.alloc.borrow_mut());
    }

    /// Remove the lower bounds of clock `clock`.
    pub fn stretch_down(&mut self, clock: usize) {
        let k = self.physical(clock);
        self.fed.stretch_down(k, &mut self.alloc.borrow_mut());
    }

    /// Forget everything about `clock`.
    pub fn free_clock(&mut self, clock: usize) {
        let k = self.physical(clock);
        self.fed.free_clock(k, &mut self.alloc.borrow_mut());
    }

    /// `clock := value`.
    pub fn update_value(&mut self, clock: usize, value: i32) {
        let k = self.physical(clock);
        self.fed.update_value(k, value, &mut self.alloc.borrow_mut());
    }

    /// `i := j`.
    pub fn update_clock(&mut self, i: usize, j: usize) {
        let (pi, pj) = (self.physical(i), self.physical(j));
        self.fed.update_clock(pi, pj, &mut self.alloc.borrow_mut());
    }

    /// `clock := clock + value`.
    pub fn update_increment(&mut self, clock: usize, value: i32) {
        let k = self.physical(clock);
        self.fed
            .update_increment(k, value, &mut self.alloc.borrow_mut());
    }

    /// `i := j + value`.
    pub fn update(&mut self, i: usize, j: usize, value: i32) {
        let (pi, pj) = (self.physical(i), self.physical(j));
        self.fed.update(pi, pj, value, &mut self.alloc.borrow_mut());
    }

    /// `self := self - dbm`. Returns whether the result is non-empty. On
    /// error `self` is unchanged.
    pub fn subtract_dbm(&mut self, dbm: &Dbm) -> Result<bool, FederationError> {
        self.check_dbm(dbm);
        self.fed
            .subtract_dbm(dbm.as_slice(), self.opts, &mut self.alloc.borrow_mut())?;
        Ok(!self.is_empty())
    }

    /// `self := self - other`. Returns whether the result is non-empty.
    ///
    /// On error `self` is the difference with the members of `other`
    /// handled before the failure, a superset of the true result.
    pub fn subtract(&mut self, other: &Federation) -> Result<bool, FederationError> {
        self.check_peer(other);
        self.fed
            .subtract_fed(&other.fed, self.opts, &mut self.alloc.borrow_mut())?;
        Ok(!self.is_empty())
    }

    /// Whether every member is included in a single member of `other`.
    /// `false` does not rule out `self ⊆ other`.
    pub fn is_maybe_included_in(&self, other: &Federation) -> bool {
        self.check_peer(other);
        self.fed
            .are_dbms_included_in(&other.fed, &self.alloc.borrow())
    }

    /// Whether `self ⊆ other`, exactly.
    pub fn is_really_included_in(&self, other: &Federation) -> Result<bool, FederationError> {
        self.check_peer(other);
        Ok(self
            .fed
            .are_dbms_really_included_in(&other.fed, self.opts, &mut self.alloc.borrow_mut())?)
    }

    /// Member-wise relation of `dbm` against this federation.
    pub fn partial_relation_dbm(&self, dbm: &Dbm) -> Relation {
        self.check_dbm(dbm);
        self.fed
            .partial_relation_dbm(dbm.as_slice(), &self.alloc.borrow())
    }

    /// Member-wise relation of `self` against `other`.
    pub fn partial_relation(&self, other: &Federation) -> Relation {
        self.check_peer(other);
        self.fed.partial_relation(&other.fed, &self.alloc.borrow())
    }

    /// Exact relation of `dbm` against this federation.
    pub fn relation_dbm(&self, dbm: &Dbm) -> Result<Relation, FederationError> {
        self.check_dbm(dbm);
        Ok(self
            .fed
            .relation_dbm(dbm.as_slice(), self.opts, &mut self.alloc.borrow_mut())?)
    }

    /// Exact relation of `self` against `other`.
    pub fn relation(&self, other: &Federation) -> Result<Relation, FederationError> {
        self.check_peer(other);
        Ok(self
            .fed
            .relation(&other.fed, self.opts, &mut self.alloc.borrow_mut())?)
    }

    /// Whether both federations denote the same set.
    pub fn equals(&self, other: &Federation) -> Result<bool, FederationError> {
        Ok(self.relation(other)? == Relation::Equal)
    }

    /// Drop members included in another member.
    pub fn reduce(&mut self) {
        self.fed.reduce(&mut self.alloc.borrow_mut());
    }

    /// Drop members covered by the union of the others.
    pub fn expensive_reduce(&mut self) -> Result<(), FederationError> {
        self.fed
            .expensive_reduce(self.opts, &mut self.alloc.borrow_mut())?;
        Ok(())
    }

    /// Predecessors of `self` avoiding `bad`, written into `self`.
    ///
    /// Reproduces a historical algorithm that is known to be imprecise;
    /// see [`FedList::predt`]. `bad` is emptied.
    pub fn predt(&mut self, bad: &mut Federation) -> Result<(), FederationError> {
        self.check_peer(bad);
        self.fed
            .predt(&mut bad.fed, self.opts, &mut self.alloc.borrow_mut())?;
        Ok(())
    }

    /// Drop members included in some member of `other`. Returns whether
    /// anything was dropped.
    pub fn remove_partial_included_in(&mut self, other: &Federation) -> bool {
        self.check_peer(other);
        self.fed
            .remove_partial_included(&other.fed, &mut self.alloc.borrow_mut())
    }

    /// Replace the federation by the convex hull of its members.
    pub fn convex_union(&mut self) {
        self.fed
            .convex_union_with_self(&mut self.alloc.borrow_mut());
    }

    /// Convex hull of the members, `None` if the federation is empty.
    pub fn convex_hull(&self) -> Option<Dbm> {
        let alloc = self.alloc.borrow();
        let dim = self.dim();
        let mut members = self.fed.iter(&alloc);
        let mut hull = members.next()?.to_vec();
        self.fed.convex_union(&mut hull, &alloc);
        Dbm::from_cells(dim, hull)
    }

    /// Reset to an empty federation over clocks `0..dim`, with an identity
    /// index table.
    pub fn init_index_table(&mut self, dim: usize) {
        let max_dim = self.alloc.borrow().max_dim();
        assert!(dim >= 1 && dim <= max_dim, "dimension {dim} outside 1..={max_dim}");
        self.reset();
        self.fed = FedList::new(dim);
        self.index = identity(max_dim);
    }

    /// Reset to an empty federation over the active clocks of `clocks`.
    pub fn init_index_table_from_bits(&mut self, clocks: &ClockSet) {
        let table = self.table_for(clocks);
        self.reset();
        self.fed = FedList::new(clocks.count());
        self.index = table;
    }

    fn table_for(&self, clocks: &ClockSet) -> Vec<usize> {
        let max_dim = self.alloc.borrow().max_dim();
        assert!(clocks.contains(0), "reference clock must be active");
        assert!(
            clocks.iter().all(|c| c < max_dim),
            "active clock outside the allocator's {max_dim} clocks"
        );
        let mut table = clocks.index_table();
        table.resize(max_dim, NO_SOURCE);
        table
    }

    /// Move from the active clocks `before`, which must describe the
    /// current index table, to `after`.
    ///
    /// Clocks active in both sets keep their constraints, newly active
    /// clocks are unconstrained. On error nothing changes.
    pub fn change_clocks(&mut self, before: &ClockSet, after: &ClockSet) -> Result<(), FederationError> {
        if before.iter().eq(after.iter()) {
            return Ok(());
        }
        let table = self.table_for(after);
        self.fed
            .shrink_expand(before, after, &mut self.alloc.borrow_mut())?;
        debug!(
            from = before.count(),
            to = after.count(),
            members = self.len(),
            "changed active clocks"
        );
        self.index = table;
        Ok(())
    }

    /// Classical extrapolation, one constant per DBM index.
    pub fn extrapolate_max_bounds(&mut self, max: &[i32]) {
        self.fed
            .extrapolate_max_bounds(max, &mut self.alloc.borrow_mut());
    }

    /// Diagonal-aware extrapolation, one constant per DBM index.
    pub fn diagonal_extrapolate_max_bounds(&mut self, max: &[i32]) {
        self.fed
            .diagonal_extrapolate_max_bounds(max, &mut self.alloc.borrow_mut());
    }

    /// Lower/upper extrapolation, constants per DBM index.
    pub fn extrapolate_lu_bounds(&mut self, lower: &[i32], upper: &[i32]) {
        self.fed
            .extrapolate_lu_bounds(lower, upper, &mut self.alloc.borrow_mut());
    }

    /// Diagonal-aware lower/upper extrapolation, constants per DBM index.
    pub fn diagonal_extrapolate_lu_bounds(&mut self, lower: &[i32], upper: &[i32]) {
        self.fed
            .diagonal_extrapolate_lu_bounds(lower, upper, &mut self.alloc.borrow_mut());
    }

    /// Whether the integer valuation is in the federation.
    pub fn contains_point(&self, point: &[i32]) -> bool {
        self.fed.is_point_included(point, &self.alloc.borrow())
    }

    /// Whether the real valuation is in the federation.
    pub fn contains_real_point(&self, point: &[f64]) -> bool {
        self.fed
            .is_real_point_included(point, &self.alloc.borrow())
    }

    /// Whether some member has no upper bound on any clock.
    pub fn is_unbounded(&self) -> bool {
        self.fed.is_unbounded(&self.alloc.borrow())
    }

    /// Write the federation in the text exchange format.
    pub fn serialize(&self, out: &mut impl Write) -> Result<(), FederationError> {
        write_fed(&self.fed, &self.alloc.borrow(), out)?;
        Ok(())
    }

    /// Replace the federation with one read from `input`.
    ///
    /// If the dimension read differs from the current one the index table
    /// is reset to the identity. On error the federation holds the members
    /// read before the failure.
    pub fn unserialize(&mut self, input: &mut impl BufRead) -> Result<(), FederationError> {
        let before = self.dim();
        let result = read_fed(&mut self.fed, &mut self.alloc.borrow_mut(), input);
        if self.dim() != before {
            debug!(from = before, to = self.dim(), "dimension changed on read");
            self.index = identity(self.index.len());
        }
        result
    }

    /// Write a human-readable rendering.
    pub fn pretty_print(&self, format: &PrintFormat, out: &mut impl Write) -> io::Result<()> {
        pretty_print(&self.fed, &self.alloc.borrow(), format, out)
    }
}

fn identity(len: usize) -> Vec<usize> {
    (0..len).collect()
}

impl Drop for Federation {
    fn drop(&mut self) {
        match self.alloc.try_borrow_mut() {
            Ok(mut alloc) => self.fed.release(&mut alloc),
            Err(_) => warn!(
                blocks = self.fed.len(),
                "federation dropped while its allocator is borrowed; blocks leak"
            ),
        }
    }
}

impl fmt::Debug for Federation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Federation")
            .field("dim", &self.dim())
            .field("len", &self.len())
            .field("opts", &self.opts)
            .finish()
    }
}

impl fmt::Display for Federation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Ok(alloc) = self.alloc.try_borrow() else {
            return write!(f, "<federation of {} zones>", self.len());
        };
        let mut text = Vec::new();
        pretty_print(&self.fed, &alloc, &PrintFormat::plain(), &mut text).map_err(|_| fmt::Error)?;
        f.write_str(&String::from_utf8_lossy(&text))
    }
}
