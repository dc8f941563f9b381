//! Copy-on-write: sharing frames between address spaces at fork, and
//! breaking the sharing when one of them writes.

use crate::FaultError;
use kernel_alloc::{Frame, FrameAllocator};
use kernel_sync::CpuCore;
use kernel_vmem::{MapError, PAGE_SIZE, PageEntryBits, PageTable, VirtualAddress};

/// How a copy-on-write fault was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CowResolution {
    /// The faulting mapping was the last owner; it was made writable in place.
    Reused(Frame),
    /// The content was copied into a new private frame.
    Copied { from: Frame, to: Frame },
}

/// Resolves a write to the copy-on-write page containing `va`.
///
/// A frame with one owner left is made writable in place. Otherwise a new
/// frame receives a full copy, the entry is repointed to it, and this
/// address space's share of the original is released.
///
/// # Errors
/// - [`FaultError::NotCopyOnWrite`] if the page isn't mapped copy-on-write.
/// - [`FaultError::OutOfMemory`] if no frame is left for the copy.
/// - [`FaultError::Map`] if the entry can't be updated.
/// - [`FaultError::Frame`] if the original frame had no owner left.
pub fn resolve_write<T: PageTable + ?Sized>(
    frames: &FrameAllocator,
    cpu: &dyn CpuCore,
    table: &mut T,
    va: VirtualAddress,
) -> Result<CowResolution, FaultError> {
    let page = va.page_down();
    let entry = table
        .lookup(page)
        .filter(PageEntryBits::is_cow)
        .ok_or(FaultError::NotCopyOnWrite)?;
    let original = Frame::from_address(entry.physical_address());

    if frames.reference_count(cpu, original) == 1 {
        table.update(page, entry.into_private_writable())?;
        return Ok(CowResolution::Reused(original));
    }

    let copy = frames.allocate(cpu).ok_or(FaultError::OutOfMemory)?;
    // Safety: `original` is mapped read-only everywhere while shared, and
    // `copy` was just allocated to us.
    unsafe { frames.arena().copy(original, copy) };

    let private = entry
        .into_private_writable()
        .with_physical_address(copy.base());
    if let Err(e) = table.update(page, private) {
        let _ = frames.free(cpu, copy);
        return Err(e.into());
    }

    let _ = frames.free(cpu, original)?;
    Ok(CowResolution::Copied {
        from: original,
        to: copy,
    })
}

/// Shares the page at `va` of `parent` with `child`.
///
/// A writable or already copy-on-write page becomes read-only copy-on-write
/// in both tables. A page that is read-only to begin with is shared as is.
/// The frame gains its new owner before the child's entry is installed.
///
/// # Errors
/// - [`FaultError::Map`] with [`MapError::NotMapped`]
///   if `parent` has no mapping at `va`, or whatever the child's `map` reports.
///   The extra reference is released again in that case.
/// - [`FaultError::Frame`] if the mapped frame has no owner.
pub fn share_page<P, C>(
    frames: &FrameAllocator,
    cpu: &dyn CpuCore,
    parent: &mut P,
    child: &mut C,
    va: VirtualAddress,
) -> Result<(), FaultError>
where
    P: PageTable + ?Sized,
    C: PageTable + ?Sized,
{
    let page = va.page_down();
    let entry = parent
        .lookup(page)
        .filter(|e| e.valid())
        .ok_or(MapError::NotMapped(page))?;
    let frame = Frame::from_address(entry.physical_address());

    let shared = if entry.writable() || entry.copy_on_write() {
        let cow = entry.into_cow();
        if cow != entry {
            parent.update(page, cow)?;
        }
        cow
    } else {
        entry
    };

    frames.dup_reference(cpu, frame)?;
    if let Err(e) = child.map(page, PAGE_SIZE, frame.base(), shared.flags()) {
        let _ = frames.free(cpu, frame)?;
        return Err(e.into());
    }
    Ok(())
}

/// Shares every mapped page of `[start, start + len)` with `child`.
///
/// Unmapped pages are skipped. Stops at the first error; pages shared up to
/// that point stay shared and are the caller's to tear down.
///
/// Returns the number of pages shared.
///
/// # Errors
/// See [`share_page`].
pub fn share_range<P, C>(
    frames: &FrameAllocator,
    cpu: &dyn CpuCore,
    parent: &mut P,
    child: &mut C,
    start: VirtualAddress,
    len: u64,
) -> Result<usize, FaultError>
where
    P: PageTable + ?Sized,
    C: PageTable + ?Sized,
{
    let first = start.page_down().as_u64();
    let end = start.as_u64().saturating_add(len);
    let mut shared = 0;
    for addr in (first..end).step_by(PAGE_SIZE as usize) {
        let va = VirtualAddress::new(addr);
        if parent.lookup(va).is_some_and(|e| e.valid()) {
            share_page(frames, cpu, parent, child, va)?;
            shared += 1;
        }
    }
    Ok(shared)
}
