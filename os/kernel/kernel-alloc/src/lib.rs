//! # Kernel Physical Frame Allocation
//!
//! Owns every physical frame registered at startup and hands them out to
//! the cores, tracking how many owners each allocated frame has so that
//! address spaces can share frames copy-on-write.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │               Allocator Facade                      │
//! │    • allocate / free / dup_reference                │
//! │    • cross-core stealing                            │
//! │    • statistics                                     │
//! └───────────┬─────────────────────────┬───────────────┘
//!             │                         │
//! ┌───────────▼───────────┐ ┌───────────▼───────────────┐
//! │   Per-Core Pools      │ │   Reference Table         │
//! │  • one lock per core  │ │  • one count per frame    │
//! │  • index-linked LIFO  │ │  • one global lock        │
//! └───────────┬───────────┘ └───────────────────────────┘
//!             │
//! ┌───────────▼─────────────────────────────────────────┐
//! │                 Frame Arena                         │
//! │    • contiguous range of 4 KiB frames               │
//! │    • preallocated backing store, index ⇄ address    │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//!
//! * A frame is on exactly one pool's free list iff its reference count is 0.
//! * [`FrameAllocator::allocate`] returns frames with a count of exactly 1.
//! * With no operation in flight, free frames plus referenced frames equal
//!   the number of registered frames.
//!
//! ## Lock order
//!
//! Pool → Table. No operation holds two pool locks at once.
//!
//! ## Usage
//!
//! ```
//! use kernel_alloc::{FrameAllocator, FrameArena, Registration, Release};
//! use kernel_sync::{sim::SimulatedCore, CoreId};
//! use kernel_vmem::PhysicalAddress;
//!
//! let arena = FrameArena::new(
//!     PhysicalAddress::new(0x8000_0000),
//!     PhysicalAddress::new(0x8000_0000 + 16 * 4096),
//! );
//! let frames = FrameAllocator::new(arena, 2, Registration::Spread);
//! let cpu = SimulatedCore::new(CoreId::new(0));
//!
//! let frame = frames.allocate(&cpu).unwrap();
//! assert_eq!(frames.reference_count(&cpu, frame), 1);
//! assert_eq!(frames.free(&cpu, frame), Ok(Release::Reclaimed));
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

extern crate alloc;

mod arena;
mod frame;
pub mod frame_alloc;
mod free_list;
mod pool;
mod refcount;

pub use crate::arena::{FrameArena, InvalidFrame};
pub use crate::frame::Frame;
pub use crate::frame_alloc::{AllocatorStats, FrameAllocator, FrameError, Registration, Release};
