//! # Kernel Configuration
//!
//! This crate is the single source of truth for the compile-time constants the
//! physical memory subsystem is built around: the frame geometry, the physical
//! range handed to the frame allocator at startup, the number of cores the
//! per-core pools are sized for, and the byte patterns written into frames as
//! they change hands.
//!
//! ## Physical Memory Layout
//!
//! ```text
//! Physical Memory Layout:
//! ARENA_BASE  ┌─────────────────────────────────┐ 0x8000_0000
//!             │       Kernel Image              │
//!             │   (Text, Data, BSS)             │
//!             ├─────────────────────────────────┤ end of image (rounded up)
//!             │    Frame Arena                  │
//!             │  (Managed by the frame          │
//!             │   allocator, FRAME_SIZE each)   │
//! ARENA_END   └─────────────────────────────────┘ 0x8800_0000
//! ```
//!
//! ## Modules
//!
//! * [`memory`]: frame size, arena bounds and junk patterns.
//! * [`cpu`]: the upper bound on the number of cores.
//!
//! All values are `const` and validated by compile-time assertions, so an
//! inconsistent configuration fails the build rather than the boot.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod cpu;
pub mod memory;
