//! Federation-list algebra.
//!
//! A [`FedList`] is a union of closed, non-empty DBMs of one dimension,
//! each held in a block of a [`zonefed_arena::DbmAllocator`]. The list does
//! not carry its allocator; every operation borrows it, and operations that
//! need new blocks return `Result<_, AllocError>`.
//!
//! # Ownership
//!
//! ```text
//! DbmAllocator ── owns storage ──► blocks
//!      ▲                              ▲
//!      │ borrowed per call            │ BlockId (not Clone)
//! FedList { dim, Vec<BlockId> } ──────┘
//! ```
//!
//! A block is owned by exactly one list, the allocator's free list, or a
//! local in the middle of an operation. Operations that fail release every
//! block they allocated; the few that leave a partial result say so.
//!
//! # Operation families
//!
//! - [`union`](FedList::union), [`reduce`](FedList::reduce),
//!   [`expensive_reduce`](FedList::expensive_reduce)
//! - [`intersection`](FedList::intersection) and the in-place forms
//! - subtraction, see [`subtract`] and [`SubtractOptions`]
//! - [`relation`](FedList::relation) (exact) and
//!   [`partial_relation`](FedList::partial_relation) (member-wise)
//! - [`predt`](FedList::predt), [`shrink_expand`](FedList::shrink_expand),
//!   the four extrapolations

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod fedlist;
mod intersect;
pub mod relation;
pub mod subtract;
mod transform;
mod union;

#[cfg(test)]
mod testing;

pub use fedlist::FedList;
pub use relation::{is_included_in, is_really_included_in};
pub use subtract::{subtract_dbm_from_dbm, subtract_fed_from_dbm, SplitStrategy, SubtractOptions};
pub use zonefed_arena::AllocError;
