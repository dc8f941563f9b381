//! Software cores for running multi-core code on a hosted target.
//!
//! A [`SimulatedCore`] carries an identity and a soft interrupt-enable flag.
//! Give every thread its own core with a distinct [`CoreId`] to model
//! symmetric multiprocessing.

use crate::{CoreId, CpuCore, InterruptFlag, IrqNesting};
use core::sync::atomic::{AtomicBool, Ordering};

struct SoftInterrupts(AtomicBool);

impl InterruptFlag for SoftInterrupts {
    fn enabled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn disable(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    fn enable(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

/// A core whose interrupt flag is a plain boolean. Interrupts start enabled.
pub struct SimulatedCore {
    id: CoreId,
    interrupts: SoftInterrupts,
    nesting: IrqNesting,
}

impl SimulatedCore {
    #[must_use]
    pub const fn new(id: CoreId) -> Self {
        Self {
            id,
            interrupts: SoftInterrupts(AtomicBool::new(true)),
            nesting: IrqNesting::new(),
        }
    }

    #[must_use]
    pub fn interrupts_enabled(&self) -> bool {
        self.interrupts.enabled()
    }

    /// Number of critical sections currently open on this core.
    #[must_use]
    pub fn nesting_depth(&self) -> usize {
        self.nesting.depth()
    }
}

impl CpuCore for SimulatedCore {
    fn id(&self) -> CoreId {
        self.id
    }

    fn push_off(&self) {
        self.nesting.push_off(&self.interrupts);
    }

    fn pop_off(&self) {
        self.nesting.pop_off(&self.interrupts);
    }
}
