//! Demand paging of file-backed regions.

use crate::process::{BackingFile, Vma};
use crate::{AccessKind, FaultError};
use kernel_alloc::{Frame, FrameAllocator};
use kernel_sync::CpuCore;
use kernel_vmem::{PAGE_SIZE, PageTable, VirtualAddress};

/// Fills the page containing `va` from the file behind `vma` and maps it.
///
/// The page is zeroed first, so a short read (or none, past the end of
/// the file) leaves the rest of the page zero.
///
/// # Errors
/// - [`FaultError::AccessDenied`] if `access` is not allowed by both the
///   region's protection and the file's open mode.
/// - [`FaultError::OutOfMemory`] if no frame is available.
/// - [`FaultError::Map`] if the page can't be mapped; the frame is freed.
pub fn fill_page<T, F>(
    frames: &FrameAllocator,
    cpu: &dyn CpuCore,
    table: &mut T,
    vma: &Vma<F>,
    va: VirtualAddress,
    access: AccessKind,
) -> Result<Frame, FaultError>
where
    T: PageTable + ?Sized,
    F: BackingFile,
{
    debug_assert!(vma.contains(va));
    if !vma.prot.allows(access) || !vma.file.permits(access) {
        return Err(FaultError::AccessDenied);
    }

    let frame = frames.allocate(cpu).ok_or(FaultError::OutOfMemory)?;
    // Safety: freshly allocated, not mapped anywhere yet.
    let bytes = unsafe { frames.arena().bytes_mut(frame) };
    bytes.fill(0);
    let read = vma.file.read_at(bytes, vma.file_offset(va));
    log::trace!("mmap: {read} bytes into {frame} at {va}");

    let page = va.page_down();
    if let Err(e) = table.map(page, PAGE_SIZE, frame.base(), vma.prot.entry_flags()) {
        let _ = frames.free(cpu, frame);
        return Err(e.into());
    }
    Ok(frame)
}
