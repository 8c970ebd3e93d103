//! Zone extrapolations.
//!
//! Each variant takes per-clock constants indexed by DBM index (entry 0 is
//! ignored). A constant of `-INFINITY` marks a clock that is not compared
//! anywhere and may be freed entirely. The DBM is re-closed if anything
//! changed.

use zonefed_core::{Raw, INFINITY};

use crate::close::{at, close};

/// Lower bound written when `x0 - xj < -bound` must be widened.
fn lower_widen(bound: i32) -> Raw {
    if bound >= 0 {
        Raw::strict(-bound)
    } else {
        Raw::LE_ZERO
    }
}

/// Classical extrapolation with maximal constants.
pub fn extrapolate_max_bounds(dbm: &mut [Raw], dim: usize, max: &[i32]) {
    classic(dbm, dim, max, max);
}

/// Extrapolation with separate lower and upper constants.
pub fn extrapolate_lu_bounds(dbm: &mut [Raw], dim: usize, lower: &[i32], upper: &[i32]) {
    classic(dbm, dim, lower, upper);
}

fn classic(dbm: &mut [Raw], dim: usize, lower: &[i32], upper: &[i32]) {
    let mut changed = false;

    for j in 1..dim {
        if dbm[at(dim, 0, j)].bound() < -upper[j] {
            dbm[at(dim, 0, j)] = lower_widen(upper[j]);
            changed |= upper[j] > -INFINITY;
        }
    }

    for i in 1..dim {
        for j in 0..dim {
            if i == j {
                continue;
            }
            if upper[j] == -INFINITY {
                dbm[at(dim, i, j)] = dbm[at(dim, i, 0)];
                continue;
            }
            let bound = dbm[at(dim, i, j)].bound();
            if bound > lower[i] && bound != INFINITY {
                dbm[at(dim, i, j)] = Raw::LS_INFINITY;
                changed |= lower[i] > -INFINITY;
            } else if bound < -upper[j] {
                dbm[at(dim, i, j)] = Raw::strict(-upper[j]);
                changed = true;
            }
        }
    }

    if changed {
        close(dbm, dim);
    }
}

/// Diagonal extrapolation with maximal constants.
pub fn diagonal_extrapolate_max_bounds(dbm: &mut [Raw], dim: usize, max: &[i32]) {
    let mut changed = false;
    for i in 1..dim {
        if dbm[at(dim, 0, i)].bound() < -max[i] {
            dbm[at(dim, i, 0)] = Raw::LS_INFINITY;
            dbm[at(dim, 0, i)] = lower_widen(max[i]);
            for j in 1..dim {
                if i != j {
                    dbm[at(dim, i, j)] = Raw::LS_INFINITY;
                    changed |= !dbm[at(dim, j, i)].is_infinity();
                    dbm[at(dim, j, i)] = Raw::LS_INFINITY;
                }
            }
        } else {
            for j in 0..dim {
                if i == j {
                    continue;
                }
                let c = dbm[at(dim, i, j)];
                if !c.is_infinity() && c.bound() > max[i] {
                    dbm[at(dim, i, j)] = Raw::LS_INFINITY;
                    changed = true;
                }
            }
        }
    }
    if changed {
        close(dbm, dim);
    }
}

/// Diagonal extrapolation with separate lower and upper constants.
pub fn diagonal_extrapolate_lu_bounds(dbm: &mut [Raw], dim: usize, lower: &[i32], upper: &[i32]) {
    let mut changed = false;

    // The first row is rewritten last: the tests below read its unmodified
    // values.
    for i in 1..dim {
        let free_row = dbm[at(dim, 0, i)].bound() < -lower[i];
        for j in 0..dim {
            if i == j {
                continue;
            }
            let c = dbm[at(dim, i, j)];
            if free_row || c.bound() > lower[i] || dbm[at(dim, 0, j)].bound() < -upper[j] {
                if !free_row {
                    changed |= !c.is_infinity();
                }
                dbm[at(dim, i, j)] = Raw::LS_INFINITY;
            }
        }
    }

    for j in 1..dim {
        if dbm[at(dim, 0, j)].bound() < -upper[j] {
            dbm[at(dim, 0, j)] = lower_widen(upper[j]);
        }
    }

    if changed {
        close(dbm, dim);
    }
}
