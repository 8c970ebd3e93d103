//! Helpers for unit tests.

use zonefed_arena::DbmAllocator;
use zonefed_dbm::{ops, Dbm};

use crate::FedList;

pub(crate) use zonefed_test_utils::grid;

/// A federation holding copies of `zones`, without inclusion checks.
pub(crate) fn fed_of(alloc: &mut DbmAllocator, dim: usize, zones: &[Dbm]) -> FedList {
    let mut fed = FedList::new(dim);
    for z in zones {
        assert_eq!(z.dim(), dim);
        fed.add_dbm(z.as_slice(), alloc).unwrap();
    }
    fed
}

pub(crate) fn in_dbm(dbm: &Dbm, point: &[f64]) -> bool {
    ops::is_real_point_included(point, dbm.as_slice(), dbm.dim())
}

/// Whether both federations agree on every half-integer point of
/// `[0, max]^(dim-1)`.
pub(crate) fn same_points(a: &FedList, b: &FedList, alloc: &DbmAllocator, max: i32) -> bool {
    assert_eq!(a.dim(), b.dim());
    grid(a.dim(), max)
        .iter()
        .all(|p| a.is_real_point_included(p, alloc) == b.is_real_point_included(p, alloc))
}
