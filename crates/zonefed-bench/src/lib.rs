//! Benchmark workloads for zonefed.
//!
//! - [`staircase_fed`]: a federation of pairwise-incomparable slabs
//! - [`punctured_cube`]: a cube with a staircase subtracted, the typical
//!   fragmented result of reachability analysis
//! - [`shifting_clocks`]: a cycle of active-clock sets for clock churn

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use zonefed_algebra::{FedList, SubtractOptions};
use zonefed_arena::{AllocError, DbmAllocator};
use zonefed_core::ClockSet;
use zonefed_test_utils::fixtures::{cube, staircase};

/// `n` staircase slabs over `dim` clocks.
pub fn staircase_fed(alloc: &mut DbmAllocator, dim: usize, n: usize) -> Result<FedList, AllocError> {
    let mut fed = FedList::new(dim);
    for z in staircase(dim, n) {
        if let Err(e) = fed.add_dbm(z.as_slice(), alloc) {
            fed.release(alloc);
            return Err(e);
        }
    }
    Ok(fed)
}

/// A cube of side `2·n·dim` minus `n` staircase slabs.
pub fn punctured_cube(
    alloc: &mut DbmAllocator,
    dim: usize,
    n: usize,
    opts: SubtractOptions,
) -> Result<FedList, AllocError> {
    let side = (2 * n * dim) as i32;
    let mut fed = FedList::new(dim);
    fed.add_dbm(cube(dim, side).as_slice(), alloc)?;
    let mut holes = staircase_fed(alloc, dim, n)?;
    let result = fed.subtract_fed(&holes, opts, alloc);
    holes.release(alloc);
    match result {
        Ok(()) => Ok(fed),
        Err(e) => {
            fed.release(alloc);
            Err(e)
        }
    }
}

/// Active-clock sets over `capacity` global clocks, each `width` clocks
/// wide and shifted by one from the previous, always with the reference
/// clock.
pub fn shifting_clocks(capacity: usize, width: usize) -> Vec<ClockSet> {
    assert!(width < capacity, "window wider than the clock range");
    (1..capacity - width + 1)
        .map(|start| {
            ClockSet::from_indices(capacity, std::iter::once(0).chain(start..start + width))
        })
        .collect()
}
