use crate::CpuCore;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Access to the local interrupt-enable flag of one core.
///
/// On hardware this is `sstatus.SIE` or `RFLAGS.IF`; the architecture layer
/// provides the implementation.
pub trait InterruptFlag {
    fn enabled(&self) -> bool;
    fn disable(&self);
    fn enable(&self);
}

/// Per-core interrupt nesting record.
///
/// Tracks how many critical sections are open on the core and whether
/// interrupts were enabled before the outermost one began, so that nested
/// sections compose: only the last [`pop_off`](Self::pop_off) restores the
/// original state, and it does so exactly once.
///
/// The record is only touched by its own core with interrupts masked; the
/// atomics exist so the record can live in a shared per-core table.
pub struct IrqNesting {
    depth: AtomicUsize,
    were_enabled: AtomicBool,
}

impl Default for IrqNesting {
    fn default() -> Self {
        Self::new()
    }
}

impl IrqNesting {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            depth: AtomicUsize::new(0),
            were_enabled: AtomicBool::new(false),
        }
    }

    /// Number of currently open critical sections.
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }

    /// Masks interrupts and opens one nesting level.
    pub fn push_off(&self, flag: &impl InterruptFlag) {
        let enabled = flag.enabled();
        flag.disable();
        if self.depth.load(Ordering::Relaxed) == 0 {
            self.were_enabled.store(enabled, Ordering::Relaxed);
        }
        self.depth.fetch_add(1, Ordering::Relaxed);
    }

    /// Closes one nesting level.
    ///
    /// # Panics
    /// If interrupts are enabled inside the section, or if there is no open
    /// section to close. Both indicate a broken critical section on this core.
    pub fn pop_off(&self, flag: &impl InterruptFlag) {
        if flag.enabled() {
            log::error!("pop_off: interrupts enabled inside a critical section");
            panic!("pop_off: interruptible");
        }

        let depth = self.depth.load(Ordering::Relaxed);
        if depth == 0 {
            log::error!("pop_off: no critical section is open");
            panic!("pop_off: unbalanced");
        }

        self.depth.store(depth - 1, Ordering::Relaxed);
        if depth == 1 && self.were_enabled.load(Ordering::Relaxed) {
            flag.enable();
        }
    }
}

/// RAII guard that masks interrupts on creation and restores them on drop.
///
/// `IrqGuard::new()` calls [`CpuCore::push_off`]; dropping it calls
/// [`CpuCore::pop_off`] on the same core. Guards nest.
///
/// # Examples
///
/// ```
/// # #[cfg(feature = "simulated-cores")] {
/// use kernel_sync::{CoreId, IrqGuard};
/// use kernel_sync::sim::SimulatedCore;
///
/// let core = SimulatedCore::new(CoreId::new(1));
/// {
///     let _outer = IrqGuard::new(&core);
///     {
///         let _inner = IrqGuard::new(&core);
///     }
///     // still masked: the outer section is open
///     assert!(!core.interrupts_enabled());
/// }
/// assert!(core.interrupts_enabled());
/// # }
/// ```
pub struct IrqGuard<'a> {
    cpu: &'a dyn CpuCore,
}

impl<'a> IrqGuard<'a> {
    #[inline]
    #[must_use]
    pub fn new(cpu: &'a dyn CpuCore) -> Self {
        cpu.push_off();
        Self { cpu }
    }
}

impl Drop for IrqGuard<'_> {
    fn drop(&mut self) {
        self.cpu.pop_off();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    struct Flag(Cell<bool>);

    impl InterruptFlag for Flag {
        fn enabled(&self) -> bool {
            self.0.get()
        }
        fn disable(&self) {
            self.0.set(false);
        }
        fn enable(&self) {
            self.0.set(true);
        }
    }

    #[test]
    fn nested_sections_restore_once() {
        let flag = Flag(Cell::new(true));
        let n = IrqNesting::new();

        n.push_off(&flag);
        n.push_off(&flag);
        assert_eq!(n.depth(), 2);
        assert!(!flag.enabled());

        n.pop_off(&flag);
        assert!(!flag.enabled(), "inner pop must not re-enable");
        n.pop_off(&flag);
        assert!(flag.enabled());
        assert_eq!(n.depth(), 0);
    }

    #[test]
    fn disabled_stays_disabled() {
        let flag = Flag(Cell::new(false));
        let n = IrqNesting::new();

        n.push_off(&flag);
        n.pop_off(&flag);
        assert!(!flag.enabled());
    }

    #[test]
    #[should_panic(expected = "unbalanced")]
    fn unbalanced_pop_panics() {
        let flag = Flag(Cell::new(false));
        IrqNesting::new().pop_off(&flag);
    }

    #[test]
    #[should_panic(expected = "interruptible")]
    fn pop_with_interrupts_enabled_panics() {
        let flag = Flag(Cell::new(true));
        let n = IrqNesting::new();
        n.push_off(&flag);
        flag.enable();
        n.pop_off(&flag);
    }
}
