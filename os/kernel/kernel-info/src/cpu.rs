//! # Processor Limits

/// Maximum number of cores the kernel brings up.
///
/// Per-core structures (frame pools, interrupt nesting records) are sized
/// for at most this many cores.
pub const MAX_CORES: usize = 8;

const _: () = {
    assert!(MAX_CORES > 0);
    assert!(MAX_CORES <= u16::MAX as usize);
};
