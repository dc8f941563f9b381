//! # Memory Layout

/// log2 of [`FRAME_SIZE`].
pub const FRAME_SHIFT: u32 = 12;

/// Size of one physical frame in bytes.
pub const FRAME_SIZE: usize = 1 << FRAME_SHIFT;

/// Start of the physical range the kernel is loaded at.
///
/// The frame allocator manages whole frames from the end of the kernel
/// image up to [`ARENA_END`].
pub const ARENA_BASE: u64 = 0x8000_0000;

/// Exclusive end of usable physical memory (128 MiB after [`ARENA_BASE`]).
pub const ARENA_END: u64 = ARENA_BASE + 128 * 1024 * 1024;

/// Byte pattern written into every frame handed out by the allocator.
///
/// Code that reads a fresh frame before initializing it sees `0x05` bytes.
pub const ALLOC_JUNK: u8 = 0x05;

/// Byte pattern written into every frame returned to a free list.
///
/// Dangling readers of a freed frame see `0x01` bytes.
pub const FREE_JUNK: u8 = 0x01;

const _: () = {
    assert!(FRAME_SIZE.is_power_of_two());
    assert!(ARENA_BASE.is_multiple_of(FRAME_SIZE as u64));
    assert!(ARENA_END.is_multiple_of(FRAME_SIZE as u64));
    assert!(ARENA_END > ARENA_BASE);
    assert!(ALLOC_JUNK != FREE_JUNK);
    assert!(ALLOC_JUNK != 0 && FREE_JUNK != 0);
};
