use bitfield_struct::bitfield;

/// Page-fault error code as delivered by the trap entry.
///
/// Each bit describes the condition that caused the page fault.
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct FaultCause {
    /// 0 = non-present page.
    /// 1 = protection violation (page present but access disallowed).
    pub present: bool, // bit 0

    /// 0 = read or execute.
    /// 1 = write access.
    pub write: bool, // bit 1

    /// 0 = supervisor.
    /// 1 = user mode.
    pub user: bool, // bit 2

    /// 1 = caused by reserved bit set in a paging structure.
    pub reserved_bit: bool, // bit 3

    /// 1 = instruction fetch (execute access).
    pub instruction_fetch: bool, // bit 4

    #[bits(59)]
    __: u64,
}

/// The kind of access that faulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    Read,
    Write,
    Execute,
}

impl FaultCause {
    /// Cause of a user-mode load; `present` tells whether the page was mapped.
    #[must_use]
    pub const fn user_read(present: bool) -> Self {
        Self::new().with_user(true).with_present(present)
    }

    /// Cause of a user-mode store.
    #[must_use]
    pub const fn user_write(present: bool) -> Self {
        Self::new()
            .with_user(true)
            .with_present(present)
            .with_write(true)
    }

    /// Cause of a user-mode instruction fetch.
    #[must_use]
    pub const fn user_fetch(present: bool) -> Self {
        Self::new()
            .with_user(true)
            .with_present(present)
            .with_instruction_fetch(true)
    }

    /// Write wins over instruction fetch; everything else is a read.
    #[must_use]
    pub const fn access(&self) -> AccessKind {
        if self.write() {
            AccessKind::Write
        } else if self.instruction_fetch() {
            AccessKind::Execute
        } else {
            AccessKind::Read
        }
    }

    #[must_use]
    pub const fn explain(&self) -> &'static str {
        if !self.present() {
            "Non-present page (page not mapped)"
        } else if self.instruction_fetch() {
            "Instruction fetch on protected page"
        } else if self.write() {
            "Write access to protected page"
        } else {
            "Read access to protected page"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_kind_prefers_write() {
        let both = FaultCause::user_fetch(true).with_write(true);
        assert_eq!(both.access(), AccessKind::Write);
        assert_eq!(FaultCause::user_fetch(false).access(), AccessKind::Execute);
        assert_eq!(FaultCause::user_read(false).access(), AccessKind::Read);
    }

    #[test]
    fn raw_error_code_decodes() {
        let cause = FaultCause::from_bits(0b0_0111);
        assert!(cause.present());
        assert!(cause.write());
        assert!(cause.user());
        assert!(!cause.instruction_fetch());
        assert_eq!(cause.explain(), "Write access to protected page");
    }
}
