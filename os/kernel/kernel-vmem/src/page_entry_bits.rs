use crate::PhysicalAddress;
use bitfield_struct::bitfield;
use kernel_info::memory::FRAME_SHIFT;

/// A leaf page-table entry in its raw bitfield form.
///
/// ### Bit layout
///
/// | Bits   | Name  | Meaning |
/// |--------|-------|---------|
/// | 0      | `V`   | Valid entry if set |
/// | 1      | `R`   | Readable |
/// | 2      | `W`   | Writable |
/// | 3      | `X`   | Executable |
/// | 4      | `U`   | User-mode accessible |
/// | 5      | `G`   | Global mapping |
/// | 6      | `A`   | Accessed |
/// | 7      | `D`   | Dirty |
/// | 8      | `COW` | Software: frame is shared copy-on-write |
/// | 9      | `RSW` | Software: reserved |
/// | 10–53  | `PPN` | Physical frame number |
/// | 54–63  | –     | Reserved, zero |
///
/// ### Copy-on-write
/// A COW entry is valid, **not** writable and has `copy_on_write` set. Every
/// entry that maps a frame with more than one owner must look like this; an
/// entry with `writable` set implies its frame has exactly one owner.
///
/// ### Example
/// ```rust
/// # use kernel_vmem::{PageEntryBits, PhysicalAddress};
/// let e = PageEntryBits::user_rw(PhysicalAddress::new(0x8020_3000)).into_cow();
/// assert!(e.is_cow());
/// assert!(!e.writable());
/// assert_eq!(e.physical_address().as_u64(), 0x8020_3000);
/// ```
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct PageEntryBits {
    /// Valid (V, bit 0).
    pub valid: bool,

    /// Readable (R, bit 1).
    pub readable: bool,

    /// Writable (W, bit 2).
    pub writable: bool,

    /// Executable (X, bit 3).
    pub executable: bool,

    /// User (U, bit 4): accessible from user mode.
    pub user: bool,

    /// Global (G, bit 5).
    pub global: bool,

    /// Accessed (A, bit 6).
    pub accessed: bool,

    /// Dirty (D, bit 7).
    pub dirty: bool,

    /// Copy-on-write marker (RSW bit 8).
    ///
    /// Ignored by hardware. Set on both sides when a frame is shared between
    /// address spaces; cleared when the fault handler gives the faulting side
    /// a private, writable frame.
    pub copy_on_write: bool,

    /// Second software bit (RSW bit 9); unused by the memory subsystem.
    pub os_reserved: bool,

    /// Physical frame number (bits 10..=53).
    #[bits(44)]
    ppn: u64,

    #[bits(10)]
    __: u16,
}

impl PageEntryBits {
    /// A valid, user-accessible, readable and writable leaf for `pa`.
    #[inline]
    #[must_use]
    pub const fn user_rw(pa: PhysicalAddress) -> Self {
        Self::new()
            .with_valid(true)
            .with_user(true)
            .with_readable(true)
            .with_writable(true)
            .with_physical_address(pa)
    }

    /// A valid, user-accessible, read-only leaf for `pa`.
    #[inline]
    #[must_use]
    pub const fn user_ro(pa: PhysicalAddress) -> Self {
        Self::new()
            .with_valid(true)
            .with_user(true)
            .with_readable(true)
            .with_physical_address(pa)
    }

    #[inline]
    #[must_use]
    pub const fn physical_address(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.ppn() << FRAME_SHIFT)
    }

    /// Replaces the mapped frame, keeping all flag bits.
    #[inline]
    #[must_use]
    pub const fn with_physical_address(self, pa: PhysicalAddress) -> Self {
        self.with_ppn(pa.as_u64() >> FRAME_SHIFT)
    }

    /// Valid and carrying the copy-on-write marker.
    #[inline]
    #[must_use]
    pub const fn is_cow(&self) -> bool {
        self.valid() && self.copy_on_write()
    }

    /// The same mapping, write-protected and marked copy-on-write.
    #[inline]
    #[must_use]
    pub const fn into_cow(self) -> Self {
        self.with_writable(false).with_copy_on_write(true)
    }

    /// The same mapping, writable and no longer copy-on-write.
    #[inline]
    #[must_use]
    pub const fn into_private_writable(self) -> Self {
        self.with_writable(true).with_copy_on_write(false)
    }

    /// Only the flag bits, with the frame number cleared.
    #[inline]
    #[must_use]
    pub const fn flags(self) -> Self {
        self.with_ppn(0)
    }
}
