use core::fmt;
use kernel_info::memory::FRAME_SIZE;

/// Size of a virtual page; equal to the frame size.
pub const PAGE_SIZE: u64 = FRAME_SIZE as u64;

const PAGE_MASK: u64 = PAGE_SIZE - 1;

/// A physical memory address.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalAddress(u64);

impl PhysicalAddress {
    #[inline]
    #[must_use]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn is_page_aligned(self) -> bool {
        self.0 & PAGE_MASK == 0
    }

    /// Rounds up to the next page boundary, saturating at the last page.
    #[inline]
    #[must_use]
    pub const fn page_up(self) -> Self {
        Self(self.0.saturating_add(PAGE_MASK) & !PAGE_MASK)
    }

    #[inline]
    #[must_use]
    pub const fn page_down(self) -> Self {
        Self(self.0 & !PAGE_MASK)
    }
}

/// A virtual address in some process's address space.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VirtualAddress(u64);

impl VirtualAddress {
    #[inline]
    #[must_use]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn is_page_aligned(self) -> bool {
        self.0 & PAGE_MASK == 0
    }

    /// Base of the page containing this address.
    #[inline]
    #[must_use]
    pub const fn page_down(self) -> Self {
        Self(self.0 & !PAGE_MASK)
    }

    #[inline]
    #[must_use]
    pub const fn checked_add(self, bytes: u64) -> Option<Self> {
        match self.0.checked_add(bytes) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }
}

impl fmt::Display for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018X}", self.0)
    }
}

impl fmt::Debug for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhysicalAddress({:#018X})", self.0)
    }
}

impl fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018X}", self.0)
    }
}

impl fmt::Debug for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VirtualAddress({:#018X})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding() {
        let va = VirtualAddress::new(0x4000_1234);
        assert_eq!(va.page_down().as_u64(), 0x4000_1000);
        assert!(!va.is_page_aligned());
        assert!(va.page_down().is_page_aligned());

        let pa = PhysicalAddress::new(0x8000_0001);
        assert_eq!(pa.page_up().as_u64(), 0x8000_1000);
        assert_eq!(pa.page_down().as_u64(), 0x8000_0000);
        assert_eq!(PhysicalAddress::new(0x8000_0000).page_up().as_u64(), 0x8000_0000);
    }

    #[test]
    fn page_up_saturates() {
        let top = PhysicalAddress::new(u64::MAX);
        assert!(top.page_up().is_page_aligned());
    }

    #[test]
    fn display_is_hex() {
        assert_eq!(
            VirtualAddress::new(0x1000).to_string(),
            "0x0000000000001000"
        );
    }
}
