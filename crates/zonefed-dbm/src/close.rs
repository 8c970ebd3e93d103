//! Shortest-path closure and emptiness.
//!
//! A DBM is stored row-major: entry `(i, j)` bounds `xi - xj` and lives at
//! `dbm[i * dim + j]`. Only the first `dim * dim` entries of the slice are
//! read, so a block sized for a larger maximum dimension can hold a smaller
//! DBM in its prefix.

use zonefed_core::{ClockSet, Raw};

/// Value written to `(0, 0)` to mark a DBM empty.
pub const EMPTY_MARK: Raw = Raw::LS_ZERO;

/// Row-major offset of entry `(i, j)`.
#[inline]
pub fn at(dim: usize, i: usize, j: usize) -> usize {
    i * dim + j
}

/// Mark a DBM as empty.
pub fn mark_empty(dbm: &mut [Raw]) {
    dbm[0] = EMPTY_MARK;
}

/// Full Floyd–Warshall closure. Returns `false` (and marks the DBM) if a
/// negative cycle shows the DBM is empty.
pub fn close(dbm: &mut [Raw], dim: usize) -> bool {
    for k in 0..dim {
        if !relax_through(dbm, dim, k) {
            return false;
        }
    }
    true
}

/// Closure restricted to the clocks in `touched`.
///
/// Valid when the DBM was closed before and only constraints between
/// touched clocks were tightened since.
pub fn close_touched(dbm: &mut [Raw], dim: usize, touched: &ClockSet) -> bool {
    for k in touched.iter().take_while(|&k| k < dim) {
        if !relax_through(dbm, dim, k) {
            return false;
        }
    }
    true
}

fn relax_through(dbm: &mut [Raw], dim: usize, k: usize) -> bool {
    for i in 0..dim {
        if i == k {
            continue;
        }
        let dik = dbm[at(dim, i, k)];
        if !dik.is_infinity() {
            for j in 0..dim {
                let dkj = dbm[at(dim, k, j)];
                if dkj.is_infinity() {
                    continue;
                }
                let via = dik.add(dkj);
                if dbm[at(dim, i, j)] > via {
                    dbm[at(dim, i, j)] = via;
                }
            }
        }
        if dbm[at(dim, i, i)] < Raw::LE_ZERO {
            mark_empty(dbm);
            return false;
        }
    }
    true
}

/// Incremental closure after tightening the single entry `(b, a)`.
///
/// The DBM must have been closed before the change and must still be
/// non-empty (`(b, a) + (a, b) >= <=0`). Runs in O(dim²).
pub fn close_ij(dbm: &mut [Raw], dim: usize, b: usize, a: usize) {
    debug_assert!(a < dim && b < dim && a != b);
    if dim <= 2 {
        return;
    }
    let ba = dbm[at(dim, b, a)];
    debug_assert!(!ba.is_infinity());

    for j in 0..dim {
        let aj = dbm[at(dim, a, j)];
        if !aj.is_infinity() {
            let bj = ba.add(aj);
            if dbm[at(dim, b, j)] > bj {
                dbm[at(dim, b, j)] = bj;
            }
        }
    }

    for i in 0..dim {
        let ib = dbm[at(dim, i, b)];
        if ib.is_infinity() {
            continue;
        }
        let ia = ib.add(ba);
        if dbm[at(dim, i, a)] > ia {
            dbm[at(dim, i, a)] = ia;
            for j in 0..dim {
                let aj = dbm[at(dim, a, j)];
                if !aj.is_infinity() {
                    let ij = ia.add(aj);
                    if dbm[at(dim, i, j)] > ij {
                        dbm[at(dim, i, j)] = ij;
                    }
                }
            }
        }
    }
}

/// Whether no entry can be tightened by going through a third clock.
pub fn is_closed(dbm: &[Raw], dim: usize) -> bool {
    for k in 0..dim {
        for i in 0..dim {
            let ik = dbm[at(dim, i, k)];
            if ik.is_infinity() {
                continue;
            }
            for j in 0..dim {
                if dbm[at(dim, i, j)] > ik.add(dbm[at(dim, k, j)]) {
                    return false;
                }
            }
        }
    }
    true
}

/// Whether the diagonal shows a negative cycle.
pub fn is_empty(dbm: &[Raw], dim: usize) -> bool {
    (0..dim).any(|i| dbm[at(dim, i, i)] < Raw::LE_ZERO)
}

/// Closed, non-empty, and with a first row of `<= 0` or tighter (clocks are
/// non-negative).
pub fn is_valid(dbm: &[Raw], dim: usize) -> bool {
    is_closed(dbm, dim)
        && !is_empty(dbm, dim)
        && (0..dim).all(|j| dbm[at(dim, 0, j)] <= Raw::LE_ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::init;

    fn inf() -> Raw {
        Raw::LS_INFINITY
    }

    #[test]
    fn close_tightens_transitive_bound() {
        // x1 <= 3, x2 - x1 <= 2  =>  x2 <= 5
        let mut d = vec![Raw::LE_ZERO; 9];
        init(&mut d, 3);
        d[at(3, 1, 0)] = Raw::weak(3);
        d[at(3, 2, 1)] = Raw::weak(2);
        assert!(close(&mut d, 3));
        assert_eq!(d[at(3, 2, 0)], Raw::weak(5));
        assert!(is_valid(&d, 3));
    }

    #[test]
    fn close_detects_negative_cycle() {
        // x1 <= 2 and x1 > 3
        let mut d = vec![Raw::LE_ZERO; 4];
        init(&mut d, 2);
        d[at(2, 1, 0)] = Raw::weak(2);
        d[at(2, 0, 1)] = Raw::strict(-3);
        assert!(!close(&mut d, 2));
        assert!(is_empty(&d, 2));
    }

    #[test]
    fn close_ij_matches_full_close() {
        let dim = 4;
        let mut d = vec![inf(); dim * dim];
        init(&mut d, dim);
        d[at(dim, 1, 0)] = Raw::weak(10);
        d[at(dim, 2, 0)] = Raw::weak(10);
        d[at(dim, 3, 0)] = Raw::weak(10);
        assert!(close(&mut d, dim));

        let mut a = d.clone();
        a[at(dim, 2, 1)] = Raw::strict(-4);
        let mut b = a.clone();
        close_ij(&mut a, dim, 2, 1);
        assert!(close(&mut b, dim));
        assert_eq!(a, b);
    }

    #[test]
    fn unclosed_dbm_is_not_valid() {
        let mut d = vec![Raw::LE_ZERO; 9];
        init(&mut d, 3);
        d[at(3, 1, 0)] = Raw::weak(3);
        d[at(3, 2, 1)] = Raw::weak(2);
        assert!(!is_closed(&d, 3));
        assert!(!is_valid(&d, 3));
    }

    #[test]
    fn close_touched_on_subset() {
        let dim = 3;
        let mut d = vec![inf(); dim * dim];
        init(&mut d, dim);
        d[at(dim, 1, 0)] = Raw::weak(3);
        let mut touched = ClockSet::new(dim);
        touched.insert(0);
        touched.insert(1);
        assert!(close_touched(&mut d, dim, &touched));
        assert!(is_closed(&d, dim));
    }
}
