//! # User Page-Fault Handling
//!
//! Resolves page faults taken from user mode using the frame allocator's
//! shared ownership:
//!
//! ```text
//!            trap (page fault: va, cause)
//!                        │
//!              ┌─────────▼──────────┐
//!              │  FaultDispatcher   │
//!              └─┬───────┬────────┬─┘
//!   write + COW  │       │ VMA    │ otherwise
//!          ┌─────▼─┐ ┌───▼────┐ ┌─▼─────────┐
//!          │  cow  │ │  mmap  │ │ lazy heap │──▶ none: terminate process
//!          └───┬───┘ └───┬────┘ └─────┬─────┘
//!              └─────────┼────────────┘
//!                 ┌──────▼────────┐
//!                 │ FrameAllocator│
//!                 └───────────────┘
//! ```
//!
//! The copy-on-write check comes first so a mapped shared page is never
//! taken for an unmapped one; the VMA check precedes lazy heap growth so a
//! file-backed region is never treated as heap.
//!
//! Page tables, VMAs, files and heap growth are reached through the
//! [`Process`] trait; see [`process`].

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod cause;
pub mod cow;
mod dispatcher;
mod error;
pub mod mmap;
pub mod process;
mod stats;

pub use crate::cause::{AccessKind, FaultCause};
pub use crate::dispatcher::{FaultDispatcher, FaultResolution};
pub use crate::error::FaultError;
pub use crate::process::{BackingFile, Process, Protection, Vma};
pub use crate::stats::{FaultCounts, FaultStats};
