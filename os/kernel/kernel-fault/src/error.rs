use kernel_alloc::FrameError;
use kernel_vmem::MapError;

/// Why a page fault could not be resolved for the faulting process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FaultError {
    #[error("out of physical frames")]
    OutOfMemory,
    #[error("page is not mapped copy-on-write")]
    NotCopyOnWrite,
    #[error("access not permitted by the mapping")]
    AccessDenied,
    #[error("no handler claimed the fault")]
    Unclaimed,
    #[error(transparent)]
    Map(#[from] MapError),
    /// The reference table disagrees with the page tables.
    #[error(transparent)]
    Frame(#[from] FrameError),
}
