use crate::{PageEntryBits, PhysicalAddress, VirtualAddress};

/// One address space's page table, as seen by the memory subsystem.
///
/// Addresses passed in are page aligned unless stated otherwise. Only leaf
/// mappings of single pages are described; how intermediate tables are
/// allocated is up to the implementation.
pub trait PageTable {
    /// The leaf entry mapping the page that contains `va`, if any.
    fn lookup(&self, va: VirtualAddress) -> Option<PageEntryBits>;

    /// Maps `[va, va + len)` to consecutive frames starting at `pa`.
    ///
    /// `flags` carries the permission bits; the frame number in it is
    /// ignored and the valid bit is implied.
    ///
    /// # Errors
    /// [`MapError::AlreadyMapped`] if any page in the range is mapped,
    /// [`MapError::OutOfMemory`] if an intermediate table can't be allocated.
    fn map(
        &mut self,
        va: VirtualAddress,
        len: u64,
        pa: PhysicalAddress,
        flags: PageEntryBits,
    ) -> Result<(), MapError>;

    /// Removes `pages` leaf mappings starting at `va`. Frames are not freed.
    fn unmap(&mut self, va: VirtualAddress, pages: u64);

    /// Replaces the existing leaf entry for the page at `va`.
    ///
    /// # Errors
    /// [`MapError::NotMapped`] if there is no valid entry to replace.
    fn update(&mut self, va: VirtualAddress, entry: PageEntryBits) -> Result<(), MapError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
    #[error("out of memory for page-table pages")]
    OutOfMemory,
    #[error("{0} is already mapped")]
    AlreadyMapped(VirtualAddress),
    #[error("{0} is not mapped")]
    NotMapped(VirtualAddress),
    #[error("{0} is not page aligned")]
    Unaligned(VirtualAddress),
}
