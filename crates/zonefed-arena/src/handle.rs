//! Allocator identities and block handles.
//!
//! A [`BlockId`] names one block of one allocator. It is neither `Clone`
//! nor `Copy`: holding it is owning the block, and handing it back through
//! [`DbmAllocator::deallocate`](crate::DbmAllocator::deallocate) consumes
//! it. The allocator id and slot generation let the allocator reject
//! handles from another allocator or from a slot that was recycled.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for unique [`AllocatorId`] allocation.
static ALLOCATOR_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique per-instance identifier of a [`DbmAllocator`](crate::DbmAllocator).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AllocatorId(u64);

impl AllocatorId {
    /// Allocate a fresh id, never returned before in this process.
    pub fn next() -> Self {
        Self(ALLOCATOR_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for AllocatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Owning handle to one matrix block.
#[derive(Debug, PartialEq, Eq, Hash)]
#[must_use = "dropping a BlockId leaks its block until the allocator is dropped"]
pub struct BlockId {
    pub(crate) allocator: AllocatorId,
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl BlockId {
    /// Allocator that issued this handle.
    pub fn allocator(&self) -> AllocatorId {
        self.allocator
    }

    /// Slot index inside the allocator.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Generation of the slot when this handle was issued.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BlockId(alloc={}, idx={}, gen={})",
            self.allocator, self.index, self.generation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocator_ids_are_unique() {
        let a = AllocatorId::next();
        let b = AllocatorId::next();
        assert_ne!(a, b);
    }
}
