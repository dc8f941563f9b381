use alloc::boxed::Box;
use core::sync::atomic::{AtomicU32, Ordering};

/// End-of-list marker.
const NIL: u32 = u32::MAX;

/// Successor links for every frame of the arena.
///
/// Entry `i` is meaningful only while frame `i` sits on a free list, and is
/// only read or written by whoever holds that list's pool lock. A frame is on
/// at most one list, so no entry is ever touched under two different locks
/// at the same time. The lock's fences order the relaxed accesses.
pub(crate) struct FreeLinks {
    next: Box<[AtomicU32]>,
}

impl FreeLinks {
    pub(crate) fn new(frames: usize) -> Self {
        Self {
            next: (0..frames).map(|_| AtomicU32::new(NIL)).collect(),
        }
    }

    #[inline]
    fn next(&self, index: u32) -> u32 {
        self.next[index as usize].load(Ordering::Relaxed)
    }

    #[inline]
    fn set_next(&self, index: u32, next: u32) {
        self.next[index as usize].store(next, Ordering::Relaxed);
    }
}

/// A run of linked frames detached from one list, to be attached to another.
///
/// Holds no lock; only the links of its own frames, which nobody else can
/// reach while the chain is in flight.
#[derive(Debug)]
#[must_use]
pub(crate) struct Chain {
    head: u32,
    tail: u32,
    len: usize,
}

impl Chain {
    pub(crate) const fn len(&self) -> usize {
        self.len
    }
}

/// A LIFO list of free frame indices threaded through [`FreeLinks`].
///
/// Push and pop are O(1). Splitting off half the list walks the half it
/// removes.
///
/// # Invariants
/// - `len` is the number of frames reachable from `head`.
/// - The last frame's link is `NIL`.
#[derive(Debug)]
pub(crate) struct FreeList {
    head: u32,
    len: usize,
}

impl Default for FreeList {
    fn default() -> Self {
        Self::new()
    }
}

impl FreeList {
    pub(crate) const fn new() -> Self {
        Self { head: NIL, len: 0 }
    }

    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    pub(crate) const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn push(&mut self, links: &FreeLinks, index: u32) {
        debug_assert_ne!(index, NIL);
        links.set_next(index, self.head);
        self.head = index;
        self.len += 1;
    }

    pub(crate) fn pop(&mut self, links: &FreeLinks) -> Option<u32> {
        if self.head == NIL {
            return None;
        }
        let index = self.head;
        self.head = links.next(index);
        links.set_next(index, NIL);
        self.len -= 1;
        Some(index)
    }

    /// Detaches the first half of the list (at least one frame).
    pub(crate) fn split_half(&mut self, links: &FreeLinks) -> Option<Chain> {
        if self.is_empty() {
            return None;
        }

        let take = (self.len / 2).max(1);
        let head = self.head;
        let mut tail = head;
        for _ in 1..take {
            tail = links.next(tail);
        }

        self.head = links.next(tail);
        links.set_next(tail, NIL);
        self.len -= take;
        Some(Chain {
            head,
            tail,
            len: take,
        })
    }

    /// Prepends a detached chain.
    pub(crate) fn append(&mut self, links: &FreeLinks, chain: Chain) {
        links.set_next(chain.tail, self.head);
        self.head = chain.head;
        self.len += chain.len;
    }
}
