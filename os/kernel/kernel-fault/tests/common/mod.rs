#![allow(dead_code)]

use kernel_alloc::{Frame, FrameAllocator, FrameArena, Registration};
use kernel_fault::{BackingFile, Process, Protection, Vma};
use kernel_info::memory::{ARENA_BASE, FRAME_SIZE};
use kernel_sync::{CoreId, CpuCore};
use kernel_vmem::{
    MapError, PAGE_SIZE, PageEntryBits, PageTable, PhysicalAddress, VirtualAddress,
};
use std::collections::BTreeMap;
use std::sync::Arc;

pub fn allocator(frames: u64, cores: usize) -> FrameAllocator {
    let arena = FrameArena::new(
        PhysicalAddress::new(ARENA_BASE),
        PhysicalAddress::new(ARENA_BASE + frames * FRAME_SIZE as u64),
    );
    FrameAllocator::new(arena, cores, Registration::BootCore(CoreId::new(0)))
}

/// Leaf entries keyed by page address.
#[derive(Default)]
pub struct FakePageTable {
    entries: BTreeMap<u64, PageEntryBits>,
    /// Makes every `map` call fail.
    pub fail_maps: bool,
}

impl FakePageTable {
    /// A table whose `map` always runs out of memory.
    pub fn failing() -> Self {
        Self {
            fail_maps: true,
            ..Self::default()
        }
    }

    pub fn frame_at(&self, va: VirtualAddress) -> Option<Frame> {
        self.lookup(va)
            .map(|e| Frame::from_address(e.physical_address()))
    }
}

impl PageTable for FakePageTable {
    fn lookup(&self, va: VirtualAddress) -> Option<PageEntryBits> {
        self.entries.get(&va.page_down().as_u64()).copied()
    }

    fn map(
        &mut self,
        va: VirtualAddress,
        len: u64,
        pa: PhysicalAddress,
        flags: PageEntryBits,
    ) -> Result<(), MapError> {
        if !va.is_page_aligned() {
            return Err(MapError::Unaligned(va));
        }
        if self.fail_maps {
            return Err(MapError::OutOfMemory);
        }
        let pages = len.div_ceil(PAGE_SIZE);
        for i in 0..pages {
            let page = va.as_u64() + i * PAGE_SIZE;
            if self.entries.contains_key(&page) {
                return Err(MapError::AlreadyMapped(VirtualAddress::new(page)));
            }
        }
        for i in 0..pages {
            let entry = flags
                .with_valid(true)
                .with_physical_address(PhysicalAddress::new(pa.as_u64() + i * PAGE_SIZE));
            self.entries.insert(va.as_u64() + i * PAGE_SIZE, entry);
        }
        Ok(())
    }

    fn unmap(&mut self, va: VirtualAddress, pages: u64) {
        for i in 0..pages {
            self.entries.remove(&(va.as_u64() + i * PAGE_SIZE));
        }
    }

    fn update(&mut self, va: VirtualAddress, entry: PageEntryBits) -> Result<(), MapError> {
        match self.entries.get_mut(&va.as_u64()) {
            Some(e) if e.valid() => {
                *e = entry;
                Ok(())
            }
            _ => Err(MapError::NotMapped(va)),
        }
    }
}

#[derive(Clone)]
pub struct FakeFile {
    content: Arc<Vec<u8>>,
    pub readable: bool,
    pub writable: bool,
}

impl FakeFile {
    pub fn new(content: &[u8]) -> Self {
        Self {
            content: Arc::new(content.to_vec()),
            readable: true,
            writable: false,
        }
    }
}

impl BackingFile for FakeFile {
    fn readable(&self) -> bool {
        self.readable
    }

    fn writable(&self) -> bool {
        self.writable
    }

    fn read_at(&self, buf: &mut [u8], offset: u64) -> usize {
        let Ok(start) = usize::try_from(offset) else {
            return 0;
        };
        if start >= self.content.len() {
            return 0;
        }
        let n = buf.len().min(self.content.len() - start);
        buf[..n].copy_from_slice(&self.content[start..start + n]);
        n
    }
}

/// Heap is `[0, heap_end)`; VMAs must lie above it.
pub struct FakeProcess {
    pub pid: u32,
    pub table: FakePageTable,
    pub vmas: Vec<Vma<FakeFile>>,
    pub heap_end: u64,
    pub killed: bool,
}

impl FakeProcess {
    pub fn new(pid: u32) -> Self {
        Self {
            pid,
            table: FakePageTable::default(),
            vmas: Vec::new(),
            heap_end: 0,
            killed: false,
        }
    }
}

impl Process for FakeProcess {
    type Table = FakePageTable;
    type File = FakeFile;

    fn pid(&self) -> u32 {
        self.pid
    }

    fn page_table(&mut self) -> &mut FakePageTable {
        &mut self.table
    }

    fn find_vma(&self, va: VirtualAddress) -> Option<Vma<FakeFile>> {
        self.vmas.iter().find(|v| v.contains(va)).cloned()
    }

    fn try_grow_heap(
        &mut self,
        frames: &FrameAllocator,
        cpu: &dyn CpuCore,
        va: VirtualAddress,
        _is_write: bool,
    ) -> bool {
        let page = va.page_down();
        if va.as_u64() >= self.heap_end || self.table.lookup(page).is_some() {
            return false;
        }
        let Some(frame) = frames.allocate(cpu) else {
            return false;
        };
        unsafe { frames.arena().bytes_mut(frame).fill(0) };
        if self
            .table
            .map(page, PAGE_SIZE, frame.base(), PageEntryBits::user_rw(frame.base()).flags())
            .is_err()
        {
            let _ = frames.free(cpu, frame);
            return false;
        }
        true
    }

    fn set_killed(&mut self) {
        self.killed = true;
    }
}

pub fn read_only() -> Protection {
    Protection::new().with_read(true)
}

pub fn read_write() -> Protection {
    Protection::new().with_read(true).with_write(true)
}
