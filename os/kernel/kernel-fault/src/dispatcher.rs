use crate::cow::{self, CowResolution};
use crate::process::Process;
use crate::stats::{FaultCounts, FaultStats};
use crate::{AccessKind, FaultCause, FaultError, mmap};
use kernel_alloc::FrameAllocator;
use kernel_sync::CpuCore;
use kernel_vmem::{PageTable, VirtualAddress};

/// Outcome of a page fault for the faulting process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum FaultResolution {
    /// The access can be retried.
    Resolved,
    /// The process was marked killed.
    Terminate,
}

/// Routes user page faults to the copy-on-write, demand-mmap and lazy-heap
/// handlers, in that order. The first handler that claims a fault decides it.
///
/// A fault no handler claims, or one whose handler fails, terminates the
/// faulting process and nothing else. The one exception is a reference-count
/// inconsistency in the frame allocator, which is fatal for the kernel.
pub struct FaultDispatcher<'a> {
    frames: &'a FrameAllocator,
    stats: FaultStats,
}

impl<'a> FaultDispatcher<'a> {
    #[must_use]
    pub const fn new(frames: &'a FrameAllocator) -> Self {
        Self {
            frames,
            stats: FaultStats::new(),
        }
    }

    #[must_use]
    pub fn stats(&self) -> FaultCounts {
        self.stats.snapshot()
    }

    /// Handles a page fault of `process` at `va` on the calling core.
    ///
    /// # Panics
    /// If a handler finds a frame whose reference count is already zero.
    pub fn handle_page_fault<P: Process + ?Sized>(
        &self,
        cpu: &dyn CpuCore,
        process: &mut P,
        va: VirtualAddress,
        cause: FaultCause,
    ) -> FaultResolution {
        self.stats.incr_total();
        let access = cause.access();
        log::trace!(
            "pid {}: page fault at {va} ({access:?}): {}",
            process.pid(),
            cause.explain()
        );

        if access == AccessKind::Write
            && process
                .page_table()
                .lookup(va.page_down())
                .is_some_and(|e| e.is_cow())
        {
            return match cow::resolve_write(self.frames, cpu, process.page_table(), va) {
                Ok(CowResolution::Reused(_)) => {
                    self.stats.incr_cow_in_place();
                    FaultResolution::Resolved
                }
                Ok(CowResolution::Copied { .. }) => {
                    self.stats.incr_cow_copies();
                    FaultResolution::Resolved
                }
                Err(e) => self.terminate(process, va, e),
            };
        }

        if let Some(vma) = process.find_vma(va) {
            return match mmap::fill_page(self.frames, cpu, process.page_table(), &vma, va, access)
            {
                Ok(_) => {
                    self.stats.incr_mmap_fills();
                    FaultResolution::Resolved
                }
                Err(e) => self.terminate(process, va, e),
            };
        }

        if process.try_grow_heap(self.frames, cpu, va, access == AccessKind::Write) {
            self.stats.incr_lazy_grows();
            return FaultResolution::Resolved;
        }

        self.terminate(process, va, FaultError::Unclaimed)
    }

    fn terminate<P: Process + ?Sized>(
        &self,
        process: &mut P,
        va: VirtualAddress,
        error: FaultError,
    ) -> FaultResolution {
        if let FaultError::Frame(e) = error {
            log::error!("pid {}: page fault at {va}: {e}", process.pid());
            panic!("page fault at {va}: {e}");
        }

        log::warn!("pid {}: page fault at {va}: {error}; killed", process.pid());
        process.set_killed();
        self.stats.incr_terminations();
        FaultResolution::Terminate
    }
}
