//! # Virtual Memory Support
//!
//! The vocabulary the frame allocator and the page-fault path share with the
//! page-table code, without depending on how page tables are walked:
//!
//! - [`PhysicalAddress`]/[`VirtualAddress`] newtypes (u64) to avoid mixing
//!   address kinds, with page rounding helpers.
//! - [`PageEntryBits`], a leaf page-table entry in Sv39 layout including the
//!   software copy-on-write marker.
//! - The [`PageTable`] trait: lookup, map, unmap and in-place update of leaf
//!   entries of one address space.
//!
//! ## Leaf entry
//!
//! ```text
//! | 63‒54    | 53‒10 | 9   | 8   | 7 | 6 | 5 | 4 | 3 | 2 | 1 | 0 |
//! | reserved |  PPN  | RSW | COW | D | A | G | U | X | W | R | V |
//! ```
//!
//! A page table is owned by exactly one process and only mutated by the core
//! running that process, so the trait takes `&mut self` and has no locking of
//! its own.

#![cfg_attr(not(any(test, doctest)), no_std)]

mod addresses;
mod page_entry_bits;
mod page_table;

pub use crate::addresses::{PAGE_SIZE, PhysicalAddress, VirtualAddress};
pub use crate::page_entry_bits::PageEntryBits;
pub use crate::page_table::{MapError, PageTable};
