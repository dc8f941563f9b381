use core::fmt;
use kernel_info::cpu::MAX_CORES;

/// Index of a physical core, `0..MAX_CORES`.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct CoreId(usize);

impl CoreId {
    /// # Panics
    /// If `index` is not below [`MAX_CORES`].
    #[must_use]
    pub const fn new(index: usize) -> Self {
        assert!(index < MAX_CORES, "core index out of range");
        Self(index)
    }

    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for CoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cpu{}", self.0)
    }
}

impl fmt::Debug for CoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// The core that is currently executing.
///
/// Implementations pair an identity with the core's interrupt nesting record.
/// Every [`push_off`](CpuCore::push_off) must be matched by exactly one
/// [`pop_off`](CpuCore::pop_off) on the same core; [`IrqGuard`](crate::IrqGuard)
/// does this pairing for you.
pub trait CpuCore {
    /// Identity of the executing core.
    fn id(&self) -> CoreId;

    /// Masks local interrupts, remembering whether they were enabled
    /// when the outermost critical section began.
    fn push_off(&self);

    /// Undoes one [`push_off`](CpuCore::push_off). Interrupts are re-enabled
    /// only when the outermost section ends and they were enabled before it.
    fn pop_off(&self);
}
