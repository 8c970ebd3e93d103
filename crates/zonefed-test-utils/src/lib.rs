//! Zone fixtures and proptest strategies for zonefed development.
//!
//! Federation-level helpers live next to the tests that need them; this
//! crate only deals in single [`Dbm`] values so it can be a dev-dependency
//! of every crate above the kernel.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use proptest::prelude::*;
use zonefed_core::{Constraint, Raw};
use zonefed_dbm::Dbm;

/// Unconstrained zone tightened by weak constraints `xi - xj <= c`.
///
/// # Panics
///
/// Panics if the constraints are unsatisfiable.
pub fn zone(dim: usize, bounds: &[(usize, usize, i32)]) -> Dbm {
    let constraints: Vec<Constraint> = bounds
        .iter()
        .map(|&(i, j, c)| Constraint::new(i, j, Raw::weak(c)))
        .collect();
    Dbm::from_constraints(dim, &constraints).expect("fixture zone is empty")
}

/// Like [`zone`], with explicit raw bounds (for strict constraints).
pub fn zone_raw(dim: usize, bounds: &[(usize, usize, Raw)]) -> Dbm {
    let constraints: Vec<Constraint> = bounds
        .iter()
        .map(|&(i, j, value)| Constraint::new(i, j, value))
        .collect();
    Dbm::from_constraints(dim, &constraints).expect("fixture zone is empty")
}

/// Every valuation with `x0 = 0` and the other clocks on the half-integer
/// grid `{0, 0.5, ..., max}`.
pub fn grid(dim: usize, max: i32) -> Vec<Vec<f64>> {
    let steps = (2 * max + 1) as usize;
    let mut points = vec![vec![0.0; dim]];
    for clock in 1..dim {
        let mut next = Vec::with_capacity(points.len() * steps);
        for p in &points {
            for s in 0..steps {
                let mut q = p.clone();
                q[clock] = s as f64 / 2.0;
                next.push(q);
            }
        }
        points = next;
    }
    points
}

/// Non-empty zones of dimension `dim` with constants in `[-max, max]`.
///
/// Upper bounds against the reference clock are kept non-negative and
/// lower bounds non-positive, so most draws are satisfiable.
pub fn arb_zone(dim: usize, max: i32) -> impl Strategy<Value = Dbm> {
    let one = (0..dim, 0..dim, 0..=max, any::<bool>());
    prop::collection::vec(one, 0..=2 * dim).prop_filter_map("unsatisfiable zone", move |raw| {
        let constraints: Vec<Constraint> = raw
            .into_iter()
            .filter(|&(i, j, _, _)| i != j)
            .map(|(i, j, c, strict)| {
                let bound = if i == 0 {
                    -c
                } else if j == 0 {
                    c
                } else {
                    c - max / 2
                };
                let value = if strict {
                    Raw::strict(bound)
                } else {
                    Raw::weak(bound)
                };
                Constraint::new(i, j, value)
            })
            .collect();
        Dbm::from_constraints(dim, &constraints)
    })
}
