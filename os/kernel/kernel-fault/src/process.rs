//! What the fault path needs from the rest of the kernel.

use crate::AccessKind;
use bitfield_struct::bitfield;
use kernel_alloc::FrameAllocator;
use kernel_sync::CpuCore;
use kernel_vmem::{PageEntryBits, PageTable, VirtualAddress};

/// Protection of a mapped region, as requested by `mmap`.
#[bitfield(u8)]
#[derive(PartialEq, Eq)]
pub struct Protection {
    pub read: bool,
    pub write: bool,
    pub exec: bool,
    #[bits(5)]
    __: u8,
}

impl Protection {
    #[must_use]
    pub const fn allows(&self, access: AccessKind) -> bool {
        match access {
            AccessKind::Read => self.read(),
            AccessKind::Write => self.write(),
            AccessKind::Execute => self.exec(),
        }
    }

    /// User leaf-entry permissions for pages of a region with this protection.
    #[must_use]
    pub const fn entry_flags(&self) -> PageEntryBits {
        PageEntryBits::new()
            .with_user(true)
            .with_readable(self.read())
            .with_writable(self.write())
            .with_executable(self.exec())
    }
}

/// An open file a region is mapped from.
pub trait BackingFile {
    /// The file was opened for reading.
    fn readable(&self) -> bool;

    /// The file was opened for writing.
    fn writable(&self) -> bool;

    /// Reads up to `buf.len()` bytes at `offset`; returns how many were read.
    /// Zero at or past the end of the file.
    fn read_at(&self, buf: &mut [u8], offset: u64) -> usize;

    /// Whether the open mode permits `access` to a mapped page.
    /// Instruction fetches read the file.
    fn permits(&self, access: AccessKind) -> bool {
        match access {
            AccessKind::Read | AccessKind::Execute => self.readable(),
            AccessKind::Write => self.writable(),
        }
    }
}

/// A live file-backed virtual memory area.
#[derive(Debug, Clone)]
pub struct Vma<F> {
    pub start: VirtualAddress,
    pub len: u64,
    pub prot: Protection,
    pub file: F,
    /// File offset mapped at `start`.
    pub offset: u64,
}

impl<F> Vma<F> {
    #[must_use]
    pub const fn contains(&self, va: VirtualAddress) -> bool {
        va.as_u64() >= self.start.as_u64() && va.as_u64() - self.start.as_u64() < self.len
    }

    /// File offset backing the page that contains `va`.
    #[must_use]
    pub const fn file_offset(&self, va: VirtualAddress) -> u64 {
        self.offset + (va.page_down().as_u64() - self.start.as_u64())
    }
}

/// The faulting process, as far as fault handling is concerned.
pub trait Process {
    type Table: PageTable;
    type File: BackingFile + Clone;

    fn pid(&self) -> u32;

    fn page_table(&mut self) -> &mut Self::Table;

    /// The live VMA containing `va`, if any.
    fn find_vma(&self, va: VirtualAddress) -> Option<Vma<Self::File>>;

    /// Maps a fresh zero-filled frame at `va` if it lies in the process's
    /// legitimate heap range. Returns whether the fault was resolved.
    fn try_grow_heap(
        &mut self,
        frames: &FrameAllocator,
        cpu: &dyn CpuCore,
        va: VirtualAddress,
        is_write: bool,
    ) -> bool;

    /// Marks the process for termination at its next return to user mode.
    fn set_killed(&mut self);
}
