//! Active-clock bit strings and index remapping tables.
//!
//! A [`ClockSet`] marks which global clocks a federation currently tracks.
//! Bit 0 is the reference clock and is always expected to be set. The
//! physical DBM index of an active clock is its rank among the set bits.

use smallvec::SmallVec;

/// Marker for "no index": a clock absent from a set, or a destination clock
/// with no counterpart in the source.
pub const NO_SOURCE: usize = usize::MAX;

const WORD_BITS: usize = 32;

/// Fixed-capacity bit string over global clock ids.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ClockSet {
    words: SmallVec<[u32; 2]>,
}

impl ClockSet {
    /// Empty set able to hold clock ids `0..capacity` (rounded up to a
    /// multiple of 32).
    pub fn new(capacity: usize) -> Self {
        let n = capacity.div_ceil(WORD_BITS).max(1);
        Self {
            words: SmallVec::from_elem(0, n),
        }
    }

    /// Set containing the clocks `0..dim`: the layout of a DBM whose
    /// physical indices are the clock ids.
    pub fn first_n(capacity: usize, dim: usize) -> Self {
        let mut set = Self::new(capacity.max(dim));
        for i in 0..dim {
            set.insert(i);
        }
        set
    }

    /// Set built from an iterator of clock ids.
    pub fn from_indices(capacity: usize, indices: impl IntoIterator<Item = usize>) -> Self {
        let mut set = Self::new(capacity);
        for i in indices {
            set.insert(i);
        }
        set
    }

    /// Number of clock ids this set can hold.
    pub fn capacity(&self) -> usize {
        self.words.len() * WORD_BITS
    }

    /// Underlying 32-bit words, least significant clock first.
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// Mark `clock` active.
    ///
    /// # Panics
    ///
    /// Panics if `clock >= self.capacity()`.
    pub fn insert(&mut self, clock: usize) {
        assert!(clock < self.capacity(), "clock {clock} out of capacity");
        self.words[clock / WORD_BITS] |= 1 << (clock % WORD_BITS);
    }

    /// Mark `clock` inactive.
    pub fn remove(&mut self, clock: usize) {
        if clock < self.capacity() {
            self.words[clock / WORD_BITS] &= !(1 << (clock % WORD_BITS));
        }
    }

    /// Whether `clock` is active.
    pub fn contains(&self, clock: usize) -> bool {
        clock < self.capacity() && self.words[clock / WORD_BITS] & (1 << (clock % WORD_BITS)) != 0
    }

    /// Number of active clocks, i.e. the DBM dimension this set describes.
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Active clock ids in increasing order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(k, &w)| {
            let mut bits = w;
            std::iter::from_fn(move || {
                if bits == 0 {
                    return None;
                }
                let tz = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                Some(k * WORD_BITS + tz)
            })
        })
    }

    /// Dense index table: entry `c` is the physical index of clock `c`, or
    /// [`NO_SOURCE`] if `c` is inactive.
    pub fn index_table(&self) -> Vec<usize> {
        let mut table = vec![NO_SOURCE; self.capacity()];
        for (rank, clock) in self.iter().enumerate() {
            table[clock] = rank;
        }
        table
    }
}

/// Remapping tables for moving DBMs from one active-clock set to another.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexTables {
    /// Indexed by global clock id: new physical index of every clock active
    /// in the destination set, [`NO_SOURCE`] elsewhere.
    pub table: Vec<usize>,
    /// Indexed by new physical index: the old physical index to copy from,
    /// or [`NO_SOURCE`] for a clock that was not active before.
    pub cols: Vec<usize>,
    /// Dimension of the destination DBMs.
    pub dim: usize,
}

/// Compute the remapping from `src` to `dst`.
///
/// # Panics
///
/// Panics if either set lacks the reference clock.
pub fn compute_tables(src: &ClockSet, dst: &ClockSet) -> IndexTables {
    assert!(
        src.contains(0) && dst.contains(0),
        "reference clock must be active"
    );
    let capacity = src.capacity().max(dst.capacity());
    let mut table = vec![NO_SOURCE; capacity];
    let mut cols = Vec::with_capacity(dst.count());
    let mut old = 0;
    for clock in 0..capacity {
        let in_src = src.contains(clock);
        if dst.contains(clock) {
            table[clock] = cols.len();
            cols.push(if in_src { old } else { NO_SOURCE });
        }
        if in_src {
            old += 1;
        }
    }
    debug_assert_eq!(cols[0], 0);
    let dim = cols.len();
    IndexTables { table, cols, dim }
}
