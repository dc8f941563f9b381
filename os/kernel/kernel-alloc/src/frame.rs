use core::fmt;
use kernel_vmem::PhysicalAddress;

/// A physical frame, identified by its base address.
///
/// Constructing a `Frame` does not validate it; the allocator checks that a
/// frame handed back to it is aligned and belongs to its arena.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Frame(PhysicalAddress);

impl Frame {
    #[inline]
    #[must_use]
    pub const fn from_address(base: PhysicalAddress) -> Self {
        Self(base)
    }

    #[inline]
    #[must_use]
    pub const fn base(self) -> PhysicalAddress {
        self.0
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame {}", self.0)
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame({:#018X})", self.0.as_u64())
    }
}

impl From<Frame> for PhysicalAddress {
    fn from(frame: Frame) -> Self {
        frame.0
    }
}
