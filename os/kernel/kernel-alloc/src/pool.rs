use crate::free_list::FreeList;
use kernel_info::cpu::MAX_CORES;
use kernel_sync::{CoreId, SpinLock};

const POOL_LOCK_NAMES: [&str; MAX_CORES] = [
    "kmem.0", "kmem.1", "kmem.2", "kmem.3", "kmem.4", "kmem.5", "kmem.6", "kmem.7",
];

/// One core's free frames and the lock guarding them.
///
/// The owning core pops and pushes here for ordinary allocation and
/// freeing; any core may lock it to steal from it.
pub(crate) struct FramePool {
    core: CoreId,
    pub(crate) list: SpinLock<FreeList>,
}

impl FramePool {
    pub(crate) const fn new(core: CoreId) -> Self {
        Self {
            core,
            list: SpinLock::new(POOL_LOCK_NAMES[core.index()], FreeList::new()),
        }
    }

    pub(crate) const fn core(&self) -> CoreId {
        self.core
    }
}
