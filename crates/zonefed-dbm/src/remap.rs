//! Copying a DBM across a change of active clocks.

use zonefed_core::{Raw, NO_SOURCE};

use crate::close::at;

/// Write into `dst` (dimension `dim_dst`) the DBM `src` (dimension
/// `dim_src`) remapped through `cols`: row and column `i` of the result come
/// from `cols[i]` of the source, or are unconstrained when `cols[i]` is
/// [`NO_SOURCE`].
///
/// A new clock keeps the lower bounds implied by the reference clock, so the
/// result is closed whenever the source is.
pub fn update_dbm(dst: &mut [Raw], src: &[Raw], dim_dst: usize, dim_src: usize, cols: &[usize]) {
    dst[0] = Raw::LE_ZERO;
    if dim_dst <= 1 {
        return;
    }

    for j in 1..dim_dst {
        debug_assert!(cols[j] == NO_SOURCE || cols[j] < dim_src);
        dst[j] = if cols[j] == NO_SOURCE {
            Raw::LE_ZERO
        } else {
            src[cols[j]]
        };
    }

    for i in 1..dim_dst {
        let row = at(dim_dst, i, 0);
        if cols[i] == NO_SOURCE {
            dst[row..row + dim_dst].fill(Raw::LS_INFINITY);
        } else {
            let src_row = at(dim_src, cols[i], 0);
            let upper = src[src_row];
            dst[row] = upper;
            for j in 1..dim_dst {
                dst[row + j] = if cols[j] == NO_SOURCE {
                    upper
                } else {
                    src[src_row + cols[j]]
                };
            }
        }
        dst[at(dim_dst, i, i)] = Raw::LE_ZERO;
    }
}
