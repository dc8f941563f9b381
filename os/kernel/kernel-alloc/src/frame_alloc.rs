//! Per-core physical frame allocator with cross-core stealing and shared
//! ownership of frames.

use crate::arena::FrameArena;
use crate::free_list::FreeLinks;
use crate::pool::FramePool;
use crate::refcount::{ReferenceTable, Underflow};
use crate::Frame;
use alloc::boxed::Box;
use core::iter::once;
use core::sync::atomic::{AtomicU64, Ordering};
use kernel_info::cpu::MAX_CORES;
use kernel_info::memory::{ALLOC_JUNK, FRAME_SIZE, FREE_JUNK};
use kernel_sync::{CoreId, CpuCore, LockStats};

/// Where registered frames start out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// Every frame goes to one core's pool; the others fill up by stealing.
    BootCore(CoreId),
    /// Frames are split into contiguous, equally sized runs, one per core.
    Spread,
}

/// Result of a successful [`FrameAllocator::free`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Release {
    /// Other owners remain; the frame stays allocated.
    Shared { remaining: u32 },
    /// The last owner is gone; the frame is back on a free list.
    Reclaimed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// A frame was released more often than it was referenced.
    #[error("reference count of {0} dropped below zero")]
    NegativeRefcount(Frame),
    /// A new owner was added to a frame that has none.
    #[error("{0} is not allocated")]
    NotAllocated(Frame),
}

/// Snapshot of the allocator's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocatorStats {
    pub allocations: u64,
    /// Frees that returned a frame to a free list.
    pub reclaimed: u64,
    /// Frees that only dropped one of several owners.
    pub shared_releases: u64,
    /// Successful steal operations.
    pub steals: u64,
    /// Frames moved between pools by stealing.
    pub stolen_frames: u64,
    pub out_of_memory: u64,
    pub negative_refcounts: u64,
}

#[derive(Default)]
struct Counters {
    allocations: AtomicU64,
    reclaimed: AtomicU64,
    shared_releases: AtomicU64,
    steals: AtomicU64,
    stolen_frames: AtomicU64,
    out_of_memory: AtomicU64,
    negative_refcounts: AtomicU64,
}

/// Victim scans per steal. A further scan only happens when frames were
/// pushed to some pool during the previous one.
const STEAL_PASSES: usize = 2;

#[inline]
fn bump(counter: &AtomicU64, by: u64) {
    counter.fetch_add(by, Ordering::Relaxed);
}

/// The physical frame allocator.
///
/// Owns the [`FrameArena`], one free-frame pool per core and the global
/// reference table. A frame is on some pool's free list exactly when its
/// reference count is zero.
///
/// ## Locking
/// - Pool locks are never held two at a time. Stealing detaches frames
///   under the victim's lock, drops it, then attaches them under the
///   caller's own lock.
/// - The table lock may be taken while holding a pool lock (to initialize a
///   count in [`allocate`](Self::allocate)), never the other way around.
pub struct FrameAllocator {
    arena: FrameArena,
    links: FreeLinks,
    pools: Box<[FramePool]>,
    table: ReferenceTable,
    counters: Counters,
    /// Bumped under a pool lock whenever frames are pushed to a pool.
    refills: AtomicU64,
}

impl FrameAllocator {
    /// Takes ownership of every frame in `arena` and places them into the
    /// pools of cores `0..cores` according to `registration`.
    ///
    /// Registered frames are filled with [`FREE_JUNK`].
    ///
    /// # Panics
    /// If `cores` is zero or above [`MAX_CORES`], or the boot core is not
    /// one of them.
    #[must_use]
    pub fn new(mut arena: FrameArena, cores: usize, registration: Registration) -> Self {
        assert!(
            (1..=MAX_CORES).contains(&cores),
            "core count {cores} outside 1..={MAX_CORES}"
        );
        if let Registration::BootCore(boot) = registration {
            assert!(boot.index() < cores, "boot core {boot} not among {cores} cores");
        }

        let frames = arena.frame_count();
        arena.fill_all(FREE_JUNK);

        let links = FreeLinks::new(frames);
        let mut pools: Box<[FramePool]> = (0..cores).map(|i| FramePool::new(CoreId::new(i))).collect();
        let per_core = frames.div_ceil(cores).max(1);

        // Push in reverse so each pool hands out ascending addresses.
        for index in (0..frames).rev() {
            let pool = match registration {
                Registration::BootCore(boot) => boot.index(),
                Registration::Spread => index / per_core,
            };
            #[allow(clippy::cast_possible_truncation)]
            pools[pool].list.get_mut().push(&links, index as u32);
        }

        log::info!(
            "frame arena {}..{}: {frames} frames of {FRAME_SIZE} bytes on {cores} cores ({registration:?})",
            arena.base(),
            arena.end(),
        );

        Self {
            table: ReferenceTable::new(frames),
            arena,
            links,
            pools,
            counters: Counters::default(),
            refills: AtomicU64::new(0),
        }
    }

    #[inline]
    #[must_use]
    pub const fn arena(&self) -> &FrameArena {
        &self.arena
    }

    #[inline]
    #[must_use]
    pub fn cores(&self) -> usize {
        self.pools.len()
    }

    #[inline]
    #[must_use]
    pub fn total_frames(&self) -> usize {
        self.arena.frame_count()
    }

    /// Allocates one frame for the calling core.
    ///
    /// Pops the core's own pool; if that is empty, steals half of the first
    /// non-empty pool found scanning the other cores upwards from the caller,
    /// then pops again. The frame comes back filled with [`ALLOC_JUNK`] and
    /// with a reference count of exactly one.
    ///
    /// Returns `None` when every pool is empty.
    ///
    /// # Panics
    /// If the calling core has no pool.
    pub fn allocate(&self, cpu: &dyn CpuCore) -> Option<Frame> {
        let me = self.pool_of(cpu);
        let Some(index) = self.pop_local(cpu, me).or_else(|| self.steal(cpu, me)) else {
            bump(&self.counters.out_of_memory, 1);
            log::trace!("{}: out of frames", cpu.id());
            return None;
        };

        // Safety: the frame just left the free list with count one; nobody
        // else has seen it.
        unsafe { self.arena.fill(index, ALLOC_JUNK) };
        bump(&self.counters.allocations, 1);
        Some(self.arena.frame_at(index))
    }

    fn pop_local(&self, cpu: &dyn CpuCore, me: usize) -> Option<usize> {
        let mut list = self.pools[me].list.lock(cpu);
        let index = list.pop(&self.links)? as usize;
        self.table.initialize(cpu, index);
        Some(index)
    }

    fn steal(&self, cpu: &dyn CpuCore, me: usize) -> Option<usize> {
        for _ in 0..STEAL_PASSES {
            let seen = self.refills.load(Ordering::Acquire);
            if let Some(index) = self.steal_pass(cpu, me) {
                return Some(index);
            }
            // No pool was refilled while scanning.
            if self.refills.load(Ordering::Acquire) == seen {
                break;
            }
        }
        None
    }

    fn steal_pass(&self, cpu: &dyn CpuCore, me: usize) -> Option<usize> {
        let cores = self.pools.len();
        for offset in 1..cores {
            let victim = &self.pools[(me + offset) % cores];
            let chain = {
                let mut list = victim.list.lock(cpu);
                list.split_half(&self.links)
            };
            let Some(chain) = chain else {
                continue;
            };

            let moved = chain.len();
            bump(&self.counters.steals, 1);
            bump(&self.counters.stolen_frames, moved as u64);
            log::debug!("{}: stole {moved} frames from {}", cpu.id(), victim.core());

            let mut list = self.pools[me].list.lock(cpu);
            list.append(&self.links, chain);
            self.refills.fetch_add(1, Ordering::Release);
            let index = list.pop(&self.links)? as usize;
            self.table.initialize(cpu, index);
            return Some(index);
        }
        None
    }

    /// Releases one owner of `frame`.
    ///
    /// If owners remain, returns [`Release::Shared`]. Otherwise the frame is
    /// filled with [`FREE_JUNK`] and pushed onto the calling core's pool.
    ///
    /// # Errors
    /// [`FrameError::NegativeRefcount`] if the frame had no owner left, e.g.
    /// on a double free. The count stays at zero and the frame is not pushed
    /// a second time.
    ///
    /// # Panics
    /// If `frame` is misaligned or outside the arena, or the calling core
    /// has no pool.
    pub fn free(&self, cpu: &dyn CpuCore, frame: Frame) -> Result<Release, FrameError> {
        let index = self.checked_index(frame, "free");
        match self.table.decrement(cpu, index) {
            Ok(0) => {}
            Ok(remaining) => {
                bump(&self.counters.shared_releases, 1);
                return Ok(Release::Shared { remaining });
            }
            Err(Underflow) => {
                bump(&self.counters.negative_refcounts, 1);
                log::error!("free: reference count of {frame} is negative, clamped to 0");
                return Err(FrameError::NegativeRefcount(frame));
            }
        }

        // Safety: the last owner just let go; the frame is ours until pushed.
        unsafe { self.arena.fill(index, FREE_JUNK) };

        let me = self.pool_of(cpu);
        {
            let mut list = self.pools[me].list.lock(cpu);
            #[allow(clippy::cast_possible_truncation)]
            list.push(&self.links, index as u32);
            self.refills.fetch_add(1, Ordering::Release);
        }
        bump(&self.counters.reclaimed, 1);
        Ok(Release::Reclaimed)
    }

    /// Adds an owner to an allocated frame; returns the new count.
    ///
    /// Call this before installing the additional mapping.
    ///
    /// # Errors
    /// [`FrameError::NotAllocated`] if the frame is free.
    ///
    /// # Panics
    /// If `frame` is misaligned or outside the arena.
    pub fn dup_reference(&self, cpu: &dyn CpuCore, frame: Frame) -> Result<u32, FrameError> {
        let index = self.checked_index(frame, "dup_reference");
        self.table.increment_referenced(cpu, index).ok_or_else(|| {
            log::error!("dup_reference: {frame} has no owner");
            FrameError::NotAllocated(frame)
        })
    }

    /// Current number of owners of `frame`; may be stale on return.
    ///
    /// # Panics
    /// If `frame` is misaligned or outside the arena.
    #[must_use]
    pub fn reference_count(&self, cpu: &dyn CpuCore, frame: Frame) -> u32 {
        let index = self.checked_index(frame, "reference_count");
        self.table.get(cpu, index)
    }

    /// Number of frames with at least one owner.
    #[must_use]
    pub fn referenced_frames(&self, cpu: &dyn CpuCore) -> usize {
        self.table.referenced(cpu)
    }

    /// Free frames in `core`'s pool.
    ///
    /// # Panics
    /// If `core` has no pool.
    #[must_use]
    pub fn free_frames_on(&self, cpu: &dyn CpuCore, core: CoreId) -> usize {
        self.pools[core.index()].list.lock(cpu).len()
    }

    /// Free frames across all pools, locking one pool at a time.
    #[must_use]
    pub fn free_frames(&self, cpu: &dyn CpuCore) -> usize {
        self.pools
            .iter()
            .map(|pool| pool.list.lock(cpu).len())
            .sum()
    }

    /// Bytes currently free across all pools.
    #[must_use]
    pub fn free_bytes(&self, cpu: &dyn CpuCore) -> u64 {
        (self.free_frames(cpu) * FRAME_SIZE) as u64
    }

    #[must_use]
    pub fn stats(&self) -> AllocatorStats {
        let c = &self.counters;
        let get = |a: &AtomicU64| a.load(Ordering::Relaxed);
        AllocatorStats {
            allocations: get(&c.allocations),
            reclaimed: get(&c.reclaimed),
            shared_releases: get(&c.shared_releases),
            steals: get(&c.steals),
            stolen_frames: get(&c.stolen_frames),
            out_of_memory: get(&c.out_of_memory),
            negative_refcounts: get(&c.negative_refcounts),
        }
    }

    /// Contention counters of every pool lock, then the table lock.
    pub fn lock_stats(&self) -> impl Iterator<Item = LockStats> + '_ {
        self.pools
            .iter()
            .map(|pool| pool.list.stats())
            .chain(once(self.table.lock_stats()))
    }

    fn pool_of(&self, cpu: &dyn CpuCore) -> usize {
        let id = cpu.id();
        assert!(
            id.index() < self.pools.len(),
            "{id} has no frame pool ({} cores registered)",
            self.pools.len()
        );
        id.index()
    }

    fn checked_index(&self, frame: Frame, op: &str) -> usize {
        match self.arena.index_of(frame) {
            Ok(index) => index,
            Err(e) => {
                log::error!("{op}: {e}");
                panic!("{op}: invalid frame: {e}");
            }
        }
    }
}
