//! # Kernel synchronization primitives
//!
//! Everything here assumes one thread of control per physical core. A core is
//! identified through the [`CpuCore`] trait, which also owns the core's
//! interrupt nesting state. Locks take the core explicitly:
//!
//! ```
//! # #[cfg(feature = "simulated-cores")] {
//! use kernel_sync::{CoreId, SpinLock};
//! use kernel_sync::sim::SimulatedCore;
//!
//! let core = SimulatedCore::new(CoreId::new(0));
//! let counter = SpinLock::new("counter", 0_u32);
//! {
//!     let mut g = counter.lock(&core);
//!     *g += 1;
//!     assert!(!core.interrupts_enabled());
//! }
//! assert!(core.interrupts_enabled());
//! # }
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod cpu;
pub mod irq;
#[cfg(feature = "simulated-cores")]
pub mod sim;
mod spin_lock;

pub use cpu::{CoreId, CpuCore};
pub use irq::{InterruptFlag, IrqGuard, IrqNesting};
pub use spin_lock::{LockStats, SpinLock, SpinLockGuard};
