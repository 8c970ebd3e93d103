//! The fixed-block-size DBM allocator.

use tracing::{debug, trace, warn};
use zonefed_core::Raw;

use crate::config::AllocatorConfig;
use crate::error::AllocError;
use crate::handle::{AllocatorId, BlockId};

/// One allocator slot.
#[derive(Debug)]
struct Slot {
    /// Matrix storage, `max_dim²` bounds. `None` once released by
    /// [`DbmAllocator::clear`].
    storage: Option<Box<[Raw]>>,
    /// Bumped on every deallocation so old handles go stale.
    generation: u32,
    /// Owned by some [`BlockId`] right now.
    live: bool,
}

/// Free-list allocator of `max_dim × max_dim` matrix blocks.
///
/// Deallocated blocks keep their storage and are pushed on a LIFO free
/// list, so the most recently freed block is handed out next. Storage is
/// only returned to the system by [`clear`](Self::clear) or on drop.
///
/// Every block access validates the handle: a handle from another
/// allocator, or one whose slot has been recycled since, panics.
#[derive(Debug)]
pub struct DbmAllocator {
    id: AllocatorId,
    config: AllocatorConfig,
    slots: Vec<Slot>,
    /// Slots with storage, available for reuse. Top of stack is reused first.
    free: Vec<u32>,
    /// Slots whose storage was released.
    vacant: Vec<u32>,
    live: usize,
}

impl DbmAllocator {
    /// Create an allocator.
    ///
    /// # Panics
    ///
    /// Panics if `config.max_dim == 0`.
    pub fn new(config: AllocatorConfig) -> Self {
        assert!(config.max_dim >= 1, "max_dim must be at least 1");
        Self {
            id: AllocatorId::next(),
            config,
            slots: Vec::new(),
            free: Vec::new(),
            vacant: Vec::new(),
            live: 0,
        }
    }

    /// Create an unbounded allocator for the given maximum dimension.
    pub fn with_max_dim(max_dim: usize) -> Self {
        Self::new(AllocatorConfig::new(max_dim))
    }

    /// Unique id of this allocator.
    pub fn id(&self) -> AllocatorId {
        self.id
    }

    /// Configuration this allocator was built with.
    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    /// Largest supported DBM dimension.
    pub fn max_dim(&self) -> usize {
        self.config.max_dim
    }

    /// Blocks currently owned by a handle.
    pub fn live_blocks(&self) -> usize {
        self.live
    }

    /// Blocks cached on the free list.
    pub fn free_blocks(&self) -> usize {
        self.free.len()
    }

    /// Blocks holding storage, live or free.
    pub fn backed_blocks(&self) -> usize {
        self.slots.len() - self.vacant.len()
    }

    /// Hand out a block. Its contents are unspecified.
    pub fn allocate(&mut self) -> Result<BlockId, AllocError> {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            debug_assert!(!slot.live && slot.storage.is_some());
            slot.live = true;
            self.live += 1;
            return Ok(BlockId {
                allocator: self.id,
                index,
                generation: slot.generation,
            });
        }

        if let Some(capacity) = self.config.max_blocks {
            let requested = self.backed_blocks() + 1;
            if requested > capacity as usize {
                warn!(requested, capacity, "dbm allocator block budget exhausted");
                return Err(AllocError::CapacityExceeded {
                    requested,
                    capacity: capacity as usize,
                });
            }
        }

        let storage = self.fresh_storage()?;
        let index = match self.vacant.pop() {
            Some(index) => {
                self.slots[index as usize].storage = Some(storage);
                index
            }
            None => {
                let bytes = std::mem::size_of::<Slot>();
                self.slots.try_reserve(1).map_err(|_| {
                    warn!(bytes, "dbm allocator could not grow its slot table");
                    AllocError::OutOfMemory { bytes }
                })?;
                self.slots.push(Slot {
                    storage: Some(storage),
                    generation: 0,
                    live: false,
                });
                (self.slots.len() - 1) as u32
            }
        };
        trace!(index, "dbm allocator backed a new block");

        let slot = &mut self.slots[index as usize];
        slot.live = true;
        self.live += 1;
        Ok(BlockId {
            allocator: self.id,
            index,
            generation: slot.generation,
        })
    }

    fn fresh_storage(&self) -> Result<Box<[Raw]>, AllocError> {
        let len = self.config.block_len();
        let mut cells: Vec<Raw> = Vec::new();
        if cells.try_reserve_exact(len).is_err() {
            let bytes = self.config.block_bytes();
            warn!(bytes, "dbm allocator out of memory");
            return Err(AllocError::OutOfMemory { bytes });
        }
        cells.resize(len, Raw::LS_INFINITY);
        Ok(cells.into_boxed_slice())
    }

    /// Return a block to the head of the free list.
    pub fn deallocate(&mut self, id: BlockId) {
        let index = self.checked_index(&id);
        let slot = &mut self.slots[index];
        slot.live = false;
        slot.generation = slot.generation.wrapping_add(1);
        self.live -= 1;
        self.free.push(id.index);
    }

    /// Return a whole list of blocks. The first block of `ids` ends up at
    /// the head of the free list, followed by the rest in order, followed
    /// by whatever was free before.
    pub fn deallocate_list(&mut self, ids: Vec<BlockId>) {
        for id in ids.into_iter().rev() {
            self.deallocate(id);
        }
    }

    /// Release the storage of every free block to the system. Live blocks
    /// are untouched. Returns the number of blocks released.
    pub fn clear(&mut self) -> usize {
        let released = self.free.len();
        for index in self.free.drain(..) {
            self.slots[index as usize].storage = None;
            self.vacant.push(index);
        }
        debug!(released, live = self.live, "dbm allocator cleared free list");
        released
    }

    /// Whether `id` is a live handle of this allocator.
    pub fn owns(&self, id: &BlockId) -> bool {
        id.allocator == self.id
            && self
                .slots
                .get(id.index as usize)
                .is_some_and(|s| s.live && s.generation == id.generation)
    }

    fn checked_index(&self, id: &BlockId) -> usize {
        assert_eq!(
            id.allocator, self.id,
            "{id} used with allocator {}",
            self.id
        );
        let index = id.index as usize;
        match self.slots.get(index) {
            Some(slot) if slot.live && slot.generation == id.generation => index,
            _ => panic!("stale block handle {id}"),
        }
    }

    fn storage(&self, index: usize) -> &[Raw] {
        match self.slots[index].storage.as_deref() {
            Some(cells) => cells,
            None => panic!("live slot {index} has no storage"),
        }
    }

    fn storage_mut(&mut self, index: usize) -> &mut [Raw] {
        match self.slots[index].storage.as_deref_mut() {
            Some(cells) => cells,
            None => panic!("live slot {index} has no storage"),
        }
    }

    /// The whole `max_dim²` block.
    pub fn block(&self, id: &BlockId) -> &[Raw] {
        let index = self.checked_index(id);
        self.storage(index)
    }

    /// The whole `max_dim²` block, mutably.
    pub fn block_mut(&mut self, id: &BlockId) -> &mut [Raw] {
        let index = self.checked_index(id);
        self.storage_mut(index)
    }

    /// The `dim²` prefix holding a DBM of dimension `dim`.
    pub fn dbm(&self, id: &BlockId, dim: usize) -> &[Raw] {
        assert!(dim <= self.config.max_dim, "dimension {dim} too large");
        &self.block(id)[..dim * dim]
    }

    /// The `dim²` prefix holding a DBM of dimension `dim`, mutably.
    pub fn dbm_mut(&mut self, id: &BlockId, dim: usize) -> &mut [Raw] {
        assert!(dim <= self.config.max_dim, "dimension {dim} too large");
        &mut self.block_mut(id)[..dim * dim]
    }

    /// Borrow two distinct blocks at once.
    pub fn pair_mut(&mut self, dst: &BlockId, src: &BlockId) -> (&mut [Raw], &[Raw]) {
        let d = self.checked_index(dst);
        let s = self.checked_index(src);
        assert_ne!(d, s, "pair_mut on a single block");
        let (lo, hi) = self.slots.split_at_mut(d.max(s));
        let (dst_slot, src_slot) = if d < s {
            (&mut lo[d], &hi[0])
        } else {
            (&mut hi[0], &lo[s])
        };
        match (dst_slot.storage.as_deref_mut(), src_slot.storage.as_deref()) {
            (Some(a), Some(b)) => (a, b),
            _ => panic!("live slot without storage"),
        }
    }

    /// Copy the `dim²` prefix of `src` into `dst`.
    pub fn copy_block(&mut self, dst: &BlockId, src: &BlockId, dim: usize) {
        if dst == src {
            return;
        }
        let n = dim * dim;
        let (d, s) = self.pair_mut(dst, src);
        d[..n].copy_from_slice(&s[..n]);
    }

    /// New block holding a copy of the DBM in `src`.
    pub fn duplicate(&mut self, src: &BlockId, dim: usize) -> Result<BlockId, AllocError> {
        let copy = self.allocate()?;
        self.copy_block(&copy, src, dim);
        Ok(copy)
    }

    /// New block holding a copy of `cells` (a row-major DBM prefix).
    pub fn allocate_from(&mut self, cells: &[Raw]) -> Result<BlockId, AllocError> {
        assert!(cells.len() <= self.config.block_len(), "matrix too large");
        let id = self.allocate()?;
        self.block_mut(&id)[..cells.len()].copy_from_slice(cells);
        Ok(id)
    }

    /// Structural self-check of the free list, for debugging: every entry
    /// in range, backed by storage, not live, and listed once.
    pub fn check_free_list(&self) -> bool {
        let mut seen = vec![false; self.slots.len()];
        for &index in &self.free {
            let i = index as usize;
            let Some(slot) = self.slots.get(i) else {
                return false;
            };
            if seen[i] || slot.live || slot.storage.is_none() {
                return false;
            }
            seen[i] = true;
        }
        let live = self.slots.iter().filter(|s| s.live).count();
        live == self.live && self.free.len() + self.vacant.len() + live == self.slots.len()
    }
}
