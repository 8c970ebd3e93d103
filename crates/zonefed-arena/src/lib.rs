//! Fixed-block-size allocator for difference bound matrices.
//!
//! Every block holds a `max_dim × max_dim` matrix of raw bounds. A DBM of
//! a smaller dimension lives in the prefix of a block, so one allocator
//! serves every federation whose dimension fits under its `max_dim`.
//!
//! # Ownership
//!
//! ```text
//! DbmAllocator
//! ├── slots: Vec<Slot>       (storage + generation + live flag)
//! ├── free:  Vec<u32>        (LIFO stack of reusable slots)
//! └── vacant: Vec<u32>       (slots whose storage was released)
//! ```
//!
//! A [`BlockId`] is the only way to reach a block. It is not `Clone`, so
//! exactly one owner exists for each live block: a federation list, or a
//! local variable inside an algorithm step. Handles carry the issuing
//! allocator's id and the slot generation, so using a handle with the
//! wrong allocator or after the block was freed panics instead of aliasing.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod allocator;
pub mod config;
pub mod error;
pub mod handle;

pub use allocator::DbmAllocator;
pub use config::AllocatorConfig;
pub use error::AllocError;
pub use handle::{AllocatorId, BlockId};
