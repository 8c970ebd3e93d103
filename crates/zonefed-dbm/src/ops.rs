//! Constraint, relation, and clock-update operations on a single DBM.
//!
//! Every operation takes the matrix as a slice plus its dimension and
//! expects a closed, non-empty input unless stated otherwise. Operations
//! that can make the DBM empty return `false` in that case and leave the
//! matrix marked empty.

use zonefed_core::{ClockSet, Constraint, Raw, Relation};

use crate::close::{at, close_ij, close_touched, mark_empty};

/// Unconstrained DBM: every clock non-negative, nothing else.
pub fn init(dbm: &mut [Raw], dim: usize) {
    let cells = &mut dbm[..dim * dim];
    cells.fill(Raw::LS_INFINITY);
    cells[..dim].fill(Raw::LE_ZERO);
    for i in 0..dim {
        cells[at(dim, i, i)] = Raw::LE_ZERO;
    }
}

/// DBM containing only the valuation where every clock is zero.
pub fn zero(dbm: &mut [Raw], dim: usize) {
    dbm[..dim * dim].fill(Raw::LE_ZERO);
}

/// Copy the `dim × dim` prefix of `src` into `dst`.
pub fn copy(dst: &mut [Raw], src: &[Raw], dim: usize) {
    let n = dim * dim;
    dst[..n].copy_from_slice(&src[..n]);
}

/// Entry-wise equality of the `dim × dim` prefixes.
pub fn are_equal(a: &[Raw], b: &[Raw], dim: usize) -> bool {
    let n = dim * dim;
    a[..n] == b[..n]
}

/// Inclusion relation of two closed DBMs, `a` against `b`.
pub fn relation(a: &[Raw], b: &[Raw], dim: usize) -> Relation {
    if dim <= 1 {
        return Relation::Equal;
    }
    let mut subset = true;
    let mut superset = true;
    for (x, y) in a[..dim * dim].iter().zip(&b[..dim * dim]) {
        if x < y {
            superset = false;
        } else if x > y {
            subset = false;
        }
        if !subset && !superset {
            return Relation::Different;
        }
    }
    Relation::from_inclusions(subset, superset)
}

/// `a ⊆ b` for closed DBMs.
pub fn is_subset_eq(a: &[Raw], b: &[Raw], dim: usize) -> bool {
    a[..dim * dim].iter().zip(&b[..dim * dim]).all(|(x, y)| x <= y)
}

/// Tighten `dst` with every constraint of `src`. Returns `false` if the
/// intersection is empty.
pub fn intersection(dst: &mut [Raw], src: &[Raw], dim: usize) -> bool {
    if dim <= 1 {
        return true;
    }
    let mut touched = ClockSet::new(dim);
    let mut count = 0;
    let (mut ci, mut cj) = (0, 0);
    for i in 0..dim {
        for j in 0..dim {
            let s = src[at(dim, i, j)];
            if dst[at(dim, i, j)] > s {
                dst[at(dim, i, j)] = s;
                if s.negate() >= dst[at(dim, j, i)] {
                    mark_empty(dst);
                    return false;
                }
                count += 1;
                ci = i;
                cj = j;
                touched.insert(i);
                touched.insert(j);
            }
        }
    }
    match count {
        0 => true,
        1 => {
            close_ij(dst, dim, ci, cj);
            true
        }
        _ => close_touched(dst, dim, &touched),
    }
}

/// Cheap disjointness test: `false` means the DBMs certainly do not
/// intersect, `true` means they may.
pub fn have_intersection(a: &[Raw], b: &[Raw], dim: usize) -> bool {
    for i in 1..dim {
        for j in 0..i {
            let aij = a[at(dim, i, j)];
            if !aij.is_infinity() && aij.negate() >= b[at(dim, j, i)] {
                return false;
            }
            let bij = b[at(dim, i, j)];
            if !bij.is_infinity() && bij.negate() >= a[at(dim, j, i)] {
                return false;
            }
        }
    }
    true
}

/// Exact intersection test, computed on a scratch copy of `a`.
pub fn intersects(a: &[Raw], b: &[Raw], dim: usize) -> bool {
    if !have_intersection(a, b, dim) {
        return false;
    }
    let mut scratch = a[..dim * dim].to_vec();
    intersection(&mut scratch, b, dim)
}

/// Tighten `(i, j)` with `value` and close. Returns `false` if empty.
pub fn constrain1(dbm: &mut [Raw], dim: usize, i: usize, j: usize, value: Raw) -> bool {
    debug_assert!(i < dim && j < dim && i != j);
    if dbm[at(dim, i, j)] > value {
        dbm[at(dim, i, j)] = value;
        if value.negate() >= dbm[at(dim, j, i)] {
            mark_empty(dbm);
            return false;
        }
        close_ij(dbm, dim, i, j);
    }
    true
}

/// Tighten with several constraints, closing once at the end.
pub fn constrain_n(dbm: &mut [Raw], dim: usize, constraints: &[Constraint]) -> bool {
    constrain_mapped(dbm, dim, constraints.iter().map(|c| (c.i, c.j, c.value)))
}

/// Like [`constrain_n`], with clock indices translated through `table`.
pub fn constrain_indexed_n(
    dbm: &mut [Raw],
    dim: usize,
    table: &[usize],
    constraints: &[Constraint],
) -> bool {
    constrain_mapped(
        dbm,
        dim,
        constraints.iter().map(|c| (table[c.i], table[c.j], c.value)),
    )
}

fn constrain_mapped(
    dbm: &mut [Raw],
    dim: usize,
    constraints: impl Iterator<Item = (usize, usize, Raw)>,
) -> bool {
    let mut touched = ClockSet::new(dim);
    let mut changed = 0;
    let (mut ci, mut cj) = (0, 0);
    for (i, j, value) in constraints {
        debug_assert!(i < dim && j < dim && i != j);
        if dbm[at(dim, i, j)] > value {
            dbm[at(dim, i, j)] = value;
            if value.negate() >= dbm[at(dim, j, i)] {
                mark_empty(dbm);
                return false;
            }
            changed += 1;
            ci = i;
            cj = j;
            touched.insert(i);
            touched.insert(j);
        }
    }
    match changed {
        0 => true,
        1 => {
            close_ij(dbm, dim, ci, cj);
            true
        }
        _ => close_touched(dbm, dim, &touched),
    }
}

/// Whether tightening `(i, j)` with `value` leaves the DBM non-empty.
pub fn satisfies(dbm: &[Raw], dim: usize, i: usize, j: usize, value: Raw) -> bool {
    debug_assert!(i < dim && j < dim && i != j);
    value.is_infinity()
        || !(dbm[at(dim, i, j)] > value && value.negate() >= dbm[at(dim, j, i)])
}

/// Delay: remove every upper bound `xi - x0`.
pub fn up(dbm: &mut [Raw], dim: usize) {
    for i in 1..dim {
        dbm[at(dim, i, 0)] = Raw::LS_INFINITY;
    }
}

/// Inverse delay: relax every lower bound as far as the diagonal
/// constraints permit.
pub fn down(dbm: &mut [Raw], dim: usize) {
    for j in 1..dim {
        if dbm[at(dim, 0, j)] < Raw::LE_ZERO {
            let mut bound = Raw::LE_ZERO;
            for i in 1..dim {
                bound = bound.min(dbm[at(dim, i, j)]);
            }
            dbm[at(dim, 0, j)] = bound;
        }
    }
}

/// Remove every constraint on clock `k` except `xk >= 0`.
pub fn free_clock(dbm: &mut [Raw], dim: usize, k: usize) {
    debug_assert!(k > 0 && k < dim);
    for i in 0..dim {
        if i != k {
            dbm[at(dim, k, i)] = Raw::LS_INFINITY;
            dbm[at(dim, i, k)] = dbm[at(dim, i, 0)];
        }
    }
}

/// Remove the upper bounds of every clock.
pub fn free_all_up(dbm: &mut [Raw], dim: usize) {
    for i in 1..dim {
        for j in 0..dim {
            dbm[at(dim, i, j)] = if i == j {
                Raw::LE_ZERO
            } else {
                Raw::LS_INFINITY
            };
        }
    }
}

/// Remove the lower bounds of clock `k`.
pub fn free_down(dbm: &mut [Raw], dim: usize, k: usize) {
    debug_assert!(k > 0 && k < dim);
    for i in 0..dim {
        if i != k {
            dbm[at(dim, i, k)] = dbm[at(dim, i, 0)];
        }
    }
}

/// Reset clock `k` to `value`.
pub fn update_value(dbm: &mut [Raw], dim: usize, k: usize, value: i32) {
    debug_assert!(k > 0 && k < dim && value >= 0);
    dbm[at(dim, k, 0)] = Raw::weak(value);
    dbm[at(dim, 0, k)] = Raw::weak(-value);
    for i in 1..dim {
        dbm[at(dim, k, i)] = dbm[at(dim, k, 0)].add(dbm[at(dim, 0, i)]);
        dbm[at(dim, i, k)] = dbm[at(dim, i, 0)].add(dbm[at(dim, 0, k)]);
    }
    dbm[at(dim, k, k)] = Raw::LE_ZERO;
}

/// Assign clock `i := j`.
pub fn update_clock(dbm: &mut [Raw], dim: usize, i: usize, j: usize) {
    debug_assert!(i > 0 && j > 0 && i < dim && j < dim);
    if i == j {
        return;
    }
    for k in 0..dim {
        if k != i {
            dbm[at(dim, i, k)] = dbm[at(dim, j, k)];
            dbm[at(dim, k, i)] = dbm[at(dim, k, j)];
        }
    }
}

/// Increment clock `k` by `value`.
pub fn update_increment(dbm: &mut [Raw], dim: usize, k: usize, value: i32) {
    debug_assert!(k > 0 && k < dim);
    if value == 0 {
        return;
    }
    for i in 0..dim {
        if i != k {
            dbm[at(dim, k, i)] = dbm[at(dim, k, i)].shift(value);
            dbm[at(dim, i, k)] = dbm[at(dim, i, k)].shift(-value);
        }
    }
}

/// General update `i := j + value`.
pub fn update(dbm: &mut [Raw], dim: usize, i: usize, j: usize, value: i32) {
    debug_assert!(i > 0 && j > 0 && i < dim && j < dim);
    if i == j {
        update_increment(dbm, dim, i, value);
        return;
    }
    if value == 0 {
        update_clock(dbm, dim, i, j);
        return;
    }
    for k in 0..dim {
        dbm[at(dim, i, k)] = dbm[at(dim, j, k)].shift(value);
        dbm[at(dim, k, i)] = dbm[at(dim, k, j)].shift(-value);
    }
    dbm[at(dim, i, i)] = Raw::LE_ZERO;
}

/// No clock has an upper bound.
pub fn is_unbounded(dbm: &[Raw], dim: usize) -> bool {
    (1..dim).all(|i| dbm[at(dim, i, 0)].is_infinity())
}

/// Widen `dst` to the convex hull of `dst` and `src`. Stays closed.
pub fn convex_union(dst: &mut [Raw], src: &[Raw], dim: usize) {
    for (d, s) in dst[..dim * dim].iter_mut().zip(&src[..dim * dim]) {
        if *d < *s {
            *d = *s;
        }
    }
}

/// Smallest possible delay: make the strict upper bounds `xi - x0 < c`
/// weak where no other constraint forces them to stay strict.
pub fn relax_up(dbm: &mut [Raw], dim: usize) {
    relax_down_clock(dbm, dim, 0);
}

fn relax_down_clock(dbm: &mut [Raw], dim: usize, clock: usize) {
    for i in 0..dim {
        let ic = dbm[at(dim, i, clock)];
        if ic.is_infinity() || !ic.is_strict() {
            continue;
        }
        dbm[at(dim, i, clock)] = ic.to_weak();
        for j in 0..dim {
            let ij = dbm[at(dim, i, j)];
            let jc = dbm[at(dim, j, clock)];
            if ij.is_infinity() || jc.is_infinity() {
                continue;
            }
            let via = ij.add(jc.to_weak());
            if via < dbm[at(dim, i, clock)] {
                dbm[at(dim, i, clock)] = via;
                break;
            }
        }
    }
}

/// Whether the integer valuation `point` (with `point[0] == 0`) is inside.
pub fn is_point_included(point: &[i32], dbm: &[Raw], dim: usize) -> bool {
    for i in 0..dim {
        for j in 0..dim {
            if Raw::weak(point[i] - point[j]) > dbm[at(dim, i, j)] {
                return false;
            }
        }
    }
    true
}

/// Whether the real valuation `point` (with `point[0] == 0.0`) is inside.
pub fn is_real_point_included(point: &[f64], dbm: &[Raw], dim: usize) -> bool {
    for i in 0..dim {
        for j in 0..dim {
            let c = dbm[at(dim, i, j)];
            if c.is_infinity() {
                continue;
            }
            let diff = point[i] - point[j];
            let bound = c.bound() as f64;
            let inside = if c.is_strict() {
                diff < bound
            } else {
                diff <= bound
            };
            if !inside {
                return false;
            }
        }
    }
    true
}
