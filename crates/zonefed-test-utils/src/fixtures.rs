//! Named zones shared by integration tests and benchmarks.

use zonefed_core::Raw;
use zonefed_dbm::Dbm;

use crate::zone;

/// `0 <= xi <= size` for every clock.
pub fn cube(dim: usize, size: i32) -> Dbm {
    let bounds: Vec<(usize, usize, i32)> = (1..dim).map(|i| (i, 0, size)).collect();
    zone(dim, &bounds)
}

/// `lo <= xi <= hi` for every clock.
pub fn box_zone(dim: usize, lo: i32, hi: i32) -> Dbm {
    let mut bounds = Vec::with_capacity(2 * dim);
    for i in 1..dim {
        bounds.push((i, 0, hi));
        bounds.push((0, i, -lo));
    }
    zone(dim, &bounds)
}

/// `lo <= x1 <= hi`, other clocks free.
pub fn band(dim: usize, lo: i32, hi: i32) -> Dbm {
    zone(dim, &[(1, 0, hi), (0, 1, -lo)])
}

/// `n` overlapping diagonal slabs `k <= xi - xj < k + 2` for consecutive
/// clocks, inside a cube large enough to hold them all. Members are pairwise
/// incomparable, so nothing is pruned by a union.
pub fn staircase(dim: usize, n: usize) -> Vec<Dbm> {
    assert!(dim >= 3, "needs two clocks");
    let side = (2 * n * (dim - 1)) as i32;
    (0..n as i32)
        .map(|k| {
            let mut z = cube(dim, side);
            for i in 1..dim - 1 {
                z = z
                    .with(i, i + 1, Raw::strict(k + 2))
                    .and_then(|z| z.with(i + 1, i, Raw::weak(-k)))
                    .expect("slab inside the cube");
            }
            z
        })
        .collect()
}
