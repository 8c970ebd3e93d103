//! Minimal constraint graph of a closed DBM.
//!
//! Clocks whose difference is fixed (`dbm[i][j] + dbm[j][i] == <=0`) form
//! zero-cycle classes. Each class is kept as one cycle through its members
//! in increasing index order. Between class leaders an edge survives only
//! if no third leader yields an equal or tighter path. Re-closing exactly
//! the surviving constraints reproduces the DBM.

use smallvec::SmallVec;
use zonefed_core::Raw;

use crate::close::at;

/// Set of `(i, j)` positions of a DBM, stored as a `dim × dim` bit matrix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MinimalGraph {
    dim: usize,
    bits: Vec<u32>,
    len: usize,
}

impl MinimalGraph {
    fn new(dim: usize) -> Self {
        Self {
            dim,
            bits: vec![0; (dim * dim).div_ceil(32)],
            len: 0,
        }
    }

    fn insert(&mut self, i: usize, j: usize) {
        let n = at(self.dim, i, j);
        let mask = 1 << (n % 32);
        if self.bits[n / 32] & mask == 0 {
            self.bits[n / 32] |= mask;
            self.len += 1;
        }
    }

    /// Dimension of the analysed DBM.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of constraints in the graph.
    pub fn len(&self) -> usize {
        self.len
    }

    /// `true` if no constraint is needed, which only happens for `dim <= 1`.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether `(i, j)` is part of the graph.
    pub fn contains(&self, i: usize, j: usize) -> bool {
        let n = at(self.dim, i, j);
        self.bits[n / 32] & (1 << (n % 32)) != 0
    }

    /// Positions in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let dim = self.dim;
        (0..dim * dim)
            .filter(move |&n| self.bits[n / 32] & (1 << (n % 32)) != 0)
            .map(move |n| (n / dim, n % dim))
    }
}

/// Compute the minimal constraint graph of a closed, non-empty DBM.
pub fn analyze_minimal(dbm: &[Raw], dim: usize) -> MinimalGraph {
    let mut graph = MinimalGraph::new(dim);
    if dim <= 1 {
        return graph;
    }

    // leader[i] is the smallest index in the zero-cycle class of i.
    let mut leader: SmallVec<[usize; 32]> = (0..dim).collect();
    for i in 0..dim {
        if leader[i] != i {
            continue;
        }
        let mut prev = i;
        for j in i + 1..dim {
            if leader[j] == j && is_zero_cycle(dbm, dim, i, j) {
                leader[j] = i;
                graph.insert(prev, j);
                prev = j;
            }
        }
        if prev != i {
            graph.insert(prev, i);
        }
    }

    let leaders: SmallVec<[usize; 32]> = (0..dim).filter(|&i| leader[i] == i).collect();
    for &i in &leaders {
        for &j in &leaders {
            if i == j {
                continue;
            }
            let ij = dbm[at(dim, i, j)];
            if ij.is_infinity() {
                continue;
            }
            let redundant = leaders.iter().any(|&k| {
                k != i && k != j && dbm[at(dim, i, k)].add(dbm[at(dim, k, j)]) <= ij
            });
            if !redundant {
                graph.insert(i, j);
            }
        }
    }
    graph
}

fn is_zero_cycle(dbm: &[Raw], dim: usize, i: usize, j: usize) -> bool {
    let ij = dbm[at(dim, i, j)];
    let ji = dbm[at(dim, j, i)];
    !ij.is_infinity() && !ji.is_infinity() && ij.add(ji) == Raw::LE_ZERO
}
