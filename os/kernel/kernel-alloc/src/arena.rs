//! The fixed range of physical memory managed by the frame allocator.

use crate::Frame;
use alloc::boxed::Box;
use core::cell::UnsafeCell;
use core::ptr::copy_nonoverlapping;
use kernel_info::memory::FRAME_SIZE;
use kernel_vmem::PhysicalAddress;

/// Backing storage of one frame.
#[repr(C, align(4096))]
struct FrameSlot(UnsafeCell<[u8; FRAME_SIZE]>);

// Safety: access to a slot's bytes is governed by frame ownership (see the
// `unsafe` accessors on `FrameArena`), never by the slot itself.
unsafe impl Sync for FrameSlot {}

impl FrameSlot {
    const fn new() -> Self {
        Self(UnsafeCell::new([0; FRAME_SIZE]))
    }
}

const _: () = assert!(align_of::<FrameSlot>() == FRAME_SIZE);

/// Why a frame handed to the allocator is not one of its frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InvalidFrame {
    #[error("{0} is not frame aligned")]
    Misaligned(PhysicalAddress),
    #[error("{0} is outside the frame arena")]
    OutOfArena(PhysicalAddress),
}

/// One contiguous physical range, divided into [`FRAME_SIZE`] frames.
///
/// The arena owns a preallocated store with one slot per frame; frame `i`
/// has the physical address `base + i * FRAME_SIZE`. Frames are never
/// created or destroyed after registration.
///
/// Reading or writing a frame's bytes is `unsafe`: the arena can't know who
/// owns a frame, the caller has to.
pub struct FrameArena {
    base: PhysicalAddress,
    slots: Box<[FrameSlot]>,
}

impl FrameArena {
    /// Registers the whole frames in `[start, end)`.
    ///
    /// `start` is rounded up to a frame boundary; a partial frame at the end
    /// is ignored.
    ///
    /// # Panics
    /// If the range holds more frames than a free list can index.
    #[must_use]
    pub fn new(start: PhysicalAddress, end: PhysicalAddress) -> Self {
        let base = start.page_up();
        let bytes = end.as_u64().saturating_sub(base.as_u64());
        let frames = usize::try_from(bytes / FRAME_SIZE as u64).unwrap_or(usize::MAX);
        assert!(
            u32::try_from(frames).is_ok_and(|n| n < u32::MAX),
            "frame arena too large"
        );

        let slots = (0..frames).map(|_| FrameSlot::new()).collect();
        Self { base, slots }
    }

    /// Base address of the first frame.
    #[inline]
    #[must_use]
    pub const fn base(&self) -> PhysicalAddress {
        self.base
    }

    /// Exclusive end of the last frame.
    #[inline]
    #[must_use]
    pub fn end(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.base.as_u64() + (self.slots.len() * FRAME_SIZE) as u64)
    }

    #[inline]
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.slots.len()
    }

    /// Index of `frame` in this arena.
    ///
    /// # Errors
    /// If `frame` is misaligned or not inside the arena.
    pub fn index_of(&self, frame: Frame) -> Result<usize, InvalidFrame> {
        let pa = frame.base();
        if !pa.is_page_aligned() {
            return Err(InvalidFrame::Misaligned(pa));
        }
        if pa < self.base || pa >= self.end() {
            return Err(InvalidFrame::OutOfArena(pa));
        }
        let offset = (pa.as_u64() - self.base.as_u64()) / FRAME_SIZE as u64;
        usize::try_from(offset).map_err(|_| InvalidFrame::OutOfArena(pa))
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, frame: Frame) -> bool {
        self.index_of(frame).is_ok()
    }

    /// # Panics
    /// If `index` is not below [`frame_count`](Self::frame_count).
    #[inline]
    #[must_use]
    pub fn frame_at(&self, index: usize) -> Frame {
        assert!(index < self.slots.len(), "frame index out of range");
        Frame::from_address(PhysicalAddress::new(
            self.base.as_u64() + (index * FRAME_SIZE) as u64,
        ))
    }

    /// Shared view of a frame's bytes.
    ///
    /// # Safety
    /// Nobody may write the frame while the returned reference is alive.
    ///
    /// # Panics
    /// If `frame` is not a frame of this arena.
    #[must_use]
    pub unsafe fn bytes(&self, frame: Frame) -> &[u8; FRAME_SIZE] {
        let slot = &self.slots[self.expect_index(frame)];
        unsafe { &*slot.0.get() }
    }

    /// Exclusive view of a frame's bytes.
    ///
    /// # Safety
    /// The caller must be the frame's only owner and hold no other
    /// reference to its bytes while the returned one is alive.
    ///
    /// # Panics
    /// If `frame` is not a frame of this arena.
    #[allow(clippy::mut_from_ref)]
    #[must_use]
    pub unsafe fn bytes_mut(&self, frame: Frame) -> &mut [u8; FRAME_SIZE] {
        let slot = &self.slots[self.expect_index(frame)];
        unsafe { &mut *slot.0.get() }
    }

    /// Copies the full contents of `src` into `dst`.
    ///
    /// # Safety
    /// Nobody may write `src` during the copy, and the caller must be the
    /// only owner of `dst`.
    ///
    /// # Panics
    /// If either frame is not in this arena, or both are the same frame.
    pub unsafe fn copy(&self, src: Frame, dst: Frame) {
        assert_ne!(src, dst, "copy onto itself");
        let from = self.slots[self.expect_index(src)].0.get().cast::<u8>();
        let to = self.slots[self.expect_index(dst)].0.get().cast::<u8>();
        unsafe { copy_nonoverlapping(from, to, FRAME_SIZE) };
    }

    /// Fills the frame at `index` with `byte`.
    ///
    /// # Safety
    /// The caller must own the frame exclusively.
    pub(crate) unsafe fn fill(&self, index: usize, byte: u8) {
        unsafe { (*self.slots[index].0.get()).fill(byte) };
    }

    /// Fills every frame with `byte`; `&mut self` rules out any owner.
    pub(crate) fn fill_all(&mut self, byte: u8) {
        for slot in self.slots.iter_mut() {
            slot.0.get_mut().fill(byte);
        }
    }

    fn expect_index(&self, frame: Frame) -> usize {
        match self.index_of(frame) {
            Ok(index) => index,
            Err(e) => panic!("frame arena: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: u64 = 0x8000_0000;

    #[test]
    fn registers_whole_frames_only() {
        let arena = FrameArena::new(
            PhysicalAddress::new(BASE + 10),
            PhysicalAddress::new(BASE + 5 * FRAME_SIZE as u64 + 100),
        );
        assert_eq!(arena.base().as_u64(), BASE + FRAME_SIZE as u64);
        assert_eq!(arena.frame_count(), 4);
        assert_eq!(arena.end().as_u64(), BASE + 5 * FRAME_SIZE as u64);
    }

    #[test]
    fn empty_when_end_precedes_start() {
        let arena = FrameArena::new(PhysicalAddress::new(BASE), PhysicalAddress::new(BASE - 1));
        assert_eq!(arena.frame_count(), 0);
    }

    #[test]
    fn index_validation() {
        let arena = FrameArena::new(
            PhysicalAddress::new(BASE),
            PhysicalAddress::new(BASE + 2 * FRAME_SIZE as u64),
        );
        let second = arena.frame_at(1);
        assert_eq!(arena.index_of(second), Ok(1));

        let misaligned = Frame::from_address(PhysicalAddress::new(BASE + 8));
        assert!(matches!(
            arena.index_of(misaligned),
            Err(InvalidFrame::Misaligned(_))
        ));

        let past_end = Frame::from_address(arena.end());
        assert!(matches!(
            arena.index_of(past_end),
            Err(InvalidFrame::OutOfArena(_))
        ));

        let below = Frame::from_address(PhysicalAddress::new(BASE - FRAME_SIZE as u64));
        assert!(!arena.contains(below));
    }

    #[test]
    fn copy_moves_full_contents() {
        let mut arena = FrameArena::new(
            PhysicalAddress::new(BASE),
            PhysicalAddress::new(BASE + 2 * FRAME_SIZE as u64),
        );
        arena.fill_all(0xAA);
        let (a, b) = (arena.frame_at(0), arena.frame_at(1));
        unsafe {
            arena.bytes_mut(a)[FRAME_SIZE - 1] = 0x42;
            arena.copy(a, b);
            assert_eq!(arena.bytes(b)[FRAME_SIZE - 1], 0x42);
            assert!(arena.bytes(b)[..FRAME_SIZE - 1].iter().all(|&x| x == 0xAA));
        }
    }
}
