//! Allocator configuration parameters.

use zonefed_core::Raw;

/// Configuration for a [`DbmAllocator`](crate::DbmAllocator).
///
/// Every block the allocator hands out holds a `max_dim × max_dim` matrix,
/// whatever dimension it is later interpreted as. Immutable after the
/// allocator is built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllocatorConfig {
    /// Largest DBM dimension (reference clock included) any federation
    /// bound to this allocator may use.
    ///
    /// Must be at least 1.
    pub max_dim: usize,

    /// Upper bound on the number of blocks backed by storage (live plus
    /// cached on the free list). `None` means unbounded.
    pub max_blocks: Option<u32>,
}

impl AllocatorConfig {
    /// Default maximum dimension.
    pub const DEFAULT_MAX_DIM: usize = 32;

    /// Config for the given maximum dimension, with no block budget.
    pub fn new(max_dim: usize) -> Self {
        Self {
            max_dim,
            max_blocks: None,
        }
    }

    /// Same config with a block budget.
    pub fn with_max_blocks(mut self, max_blocks: u32) -> Self {
        self.max_blocks = Some(max_blocks);
        self
    }

    /// Number of raw bounds in one block.
    pub fn block_len(&self) -> usize {
        self.max_dim * self.max_dim
    }

    /// Size of one block's matrix storage in bytes.
    pub fn block_bytes(&self) -> usize {
        self.block_len() * std::mem::size_of::<Raw>()
    }
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_DIM)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_size_is_square_of_max_dim() {
        let config = AllocatorConfig::new(10);
        assert_eq!(config.block_len(), 100);
        assert_eq!(config.block_bytes(), 400);
    }

    #[test]
    fn default_is_unbounded() {
        let config = AllocatorConfig::default();
        assert_eq!(config.max_dim, AllocatorConfig::DEFAULT_MAX_DIM);
        assert_eq!(config.max_blocks, None);
        assert_eq!(config.with_max_blocks(4).max_blocks, Some(4));
    }
}
