use core::sync::atomic::{AtomicU64, Ordering};

/// Fault counters of one dispatcher.
#[derive(Debug, Default)]
pub struct FaultStats {
    /// Total faults
    total: AtomicU64,
    /// Copy-on-write faults resolved by copying
    cow_copies: AtomicU64,
    /// Copy-on-write faults resolved without a copy
    cow_in_place: AtomicU64,
    /// Pages filled from a mapped file
    mmap_fills: AtomicU64,
    /// Faults resolved by growing the heap
    lazy_grows: AtomicU64,
    /// Processes marked for termination
    terminations: AtomicU64,
}

/// Point-in-time copy of [`FaultStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FaultCounts {
    pub total: u64,
    pub cow_copies: u64,
    pub cow_in_place: u64,
    pub mmap_fills: u64,
    pub lazy_grows: u64,
    pub terminations: u64,
}

impl FaultStats {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            total: AtomicU64::new(0),
            cow_copies: AtomicU64::new(0),
            cow_in_place: AtomicU64::new(0),
            mmap_fills: AtomicU64::new(0),
            lazy_grows: AtomicU64::new(0),
            terminations: AtomicU64::new(0),
        }
    }

    pub(crate) fn incr_total(&self) {
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn incr_cow_copies(&self) {
        self.cow_copies.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn incr_cow_in_place(&self) {
        self.cow_in_place.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn incr_mmap_fills(&self) {
        self.mmap_fills.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn incr_lazy_grows(&self) {
        self.lazy_grows.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn incr_terminations(&self) {
        self.terminations.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> FaultCounts {
        FaultCounts {
            total: self.total.load(Ordering::Relaxed),
            cow_copies: self.cow_copies.load(Ordering::Relaxed),
            cow_in_place: self.cow_in_place.load(Ordering::Relaxed),
            mmap_fills: self.mmap_fills.load(Ordering::Relaxed),
            lazy_grows: self.lazy_grows.load(Ordering::Relaxed),
            terminations: self.terminations.load(Ordering::Relaxed),
        }
    }
}
