use alloc::boxed::Box;
use kernel_sync::{CpuCore, LockStats, SpinLock};

/// A decrement found the count already at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Underflow;

/// Owner counts for every frame of the arena, behind one global lock.
///
/// Each operation is atomic with respect to every other; that is all the
/// sharing protocol relies on. A count read through [`get`](Self::get) may be
/// stale as soon as the lock is dropped.
pub(crate) struct ReferenceTable {
    counts: SpinLock<Box<[u32]>>,
}

impl ReferenceTable {
    pub(crate) fn new(frames: usize) -> Self {
        Self {
            counts: SpinLock::new("refcnt", (0..frames).map(|_| 0).collect()),
        }
    }

    pub(crate) fn get(&self, cpu: &dyn CpuCore, index: usize) -> u32 {
        self.counts.lock(cpu)[index]
    }

    /// Sets the count of a frame leaving a free list to one.
    pub(crate) fn initialize(&self, cpu: &dyn CpuCore, index: usize) {
        let mut counts = self.counts.lock(cpu);
        debug_assert_eq!(counts[index], 0, "allocated frame was referenced");
        counts[index] = 1;
    }

    /// Adds an owner to a referenced frame; returns the new count, or `None`
    /// (leaving the count at zero) if the frame has no owner.
    pub(crate) fn increment_referenced(&self, cpu: &dyn CpuCore, index: usize) -> Option<u32> {
        let mut counts = self.counts.lock(cpu);
        let count = &mut counts[index];
        if *count == 0 {
            return None;
        }
        *count += 1;
        Some(*count)
    }

    /// Drops an owner; returns the remaining count.
    ///
    /// A count already at zero stays at zero and is reported as [`Underflow`].
    pub(crate) fn decrement(&self, cpu: &dyn CpuCore, index: usize) -> Result<u32, Underflow> {
        let mut counts = self.counts.lock(cpu);
        let count = &mut counts[index];
        if *count == 0 {
            return Err(Underflow);
        }
        *count -= 1;
        Ok(*count)
    }

    /// Number of frames with at least one owner.
    pub(crate) fn referenced(&self, cpu: &dyn CpuCore) -> usize {
        self.counts.lock(cpu).iter().filter(|&&c| c > 0).count()
    }

    pub(crate) fn lock_stats(&self) -> LockStats {
        self.counts.stats()
    }
}
