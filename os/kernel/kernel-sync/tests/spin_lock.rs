use kernel_sync::{CoreId, CpuCore, InterruptFlag, IrqNesting, SpinLock};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::{panic, thread};

/// One thread of control standing in for a physical core.
struct TestCore {
    id: CoreId,
    flag: Flag,
    nesting: IrqNesting,
}

struct Flag(AtomicBool);

impl InterruptFlag for Flag {
    fn enabled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
    fn disable(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
    fn enable(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

impl TestCore {
    fn new(id: usize) -> Self {
        Self {
            id: CoreId::new(id),
            flag: Flag(AtomicBool::new(true)),
            nesting: IrqNesting::new(),
        }
    }

    fn interrupts_enabled(&self) -> bool {
        self.flag.enabled()
    }
}

impl CpuCore for TestCore {
    fn id(&self) -> CoreId {
        self.id
    }
    fn push_off(&self) {
        self.nesting.push_off(&self.flag);
    }
    fn pop_off(&self) {
        self.nesting.pop_off(&self.flag);
    }
}

#[test]
fn basic_lock_and_raii() {
    let cpu = TestCore::new(0);
    let l = SpinLock::new("basic", 0_u32);

    // take the lock, mutate, and drop
    {
        let mut g = l.lock(&cpu);
        *g = 41;
    }

    // lock again; previous drop must have unlocked
    {
        let mut g = l.lock(&cpu);
        *g += 1;
        assert_eq!(*g, 42);
    }
}

#[test]
fn interrupts_masked_while_held() {
    let cpu = TestCore::new(0);
    let a = SpinLock::new("a", ());
    let b = SpinLock::new("b", ());

    assert!(cpu.interrupts_enabled());
    {
        let _ga = a.lock(&cpu);
        assert!(!cpu.interrupts_enabled());
        {
            let _gb = b.lock(&cpu);
            assert_eq!(cpu.nesting.depth(), 2);
        }
        // releasing the inner lock must not unmask
        assert!(!cpu.interrupts_enabled());
    }
    assert!(cpu.interrupts_enabled());
    assert_eq!(cpu.nesting.depth(), 0);
}

#[test]
fn try_lock_semantics() {
    let cpu0 = TestCore::new(0);
    let cpu1 = TestCore::new(1);
    let l = SpinLock::new("try", 1u8);

    // first try_lock should succeed
    let g1 = l.try_lock(&cpu0);
    assert!(g1.is_some());
    assert_eq!(**g1.as_ref().unwrap(), 1);
    assert!(l.is_held_by(cpu0.id()));

    // while held, try_lock from another core must fail and leave its
    // interrupt state untouched
    assert!(l.try_lock(&cpu1).is_none());
    assert!(cpu1.interrupts_enabled());

    // dropping guard allows another try_lock
    drop(g1);
    let g3 = l.try_lock(&cpu1);
    assert!(g3.is_some());
}

#[test]
fn relock_on_same_core_is_fatal() {
    let cpu = TestCore::new(3);
    let l = SpinLock::new("reentrant", 0u8);

    let res = panic::catch_unwind(panic::AssertUnwindSafe(|| {
        let _g = l.lock(&cpu);
        let _again = l.lock(&cpu);
    }));
    let err = res.expect_err("re-acquiring a held lock must panic");
    let msg = err
        .downcast_ref::<String>()
        .cloned()
        .unwrap_or_default();
    assert!(msg.contains("reentrant"), "unexpected message: {msg}");

    // both guards unwound: lock free, interrupts restored
    assert!(cpu.interrupts_enabled());
    assert_eq!(l.with_lock(&cpu, |v| *v), 0);
}

#[test]
fn with_lock_works_and_unlocks() {
    let cpu = TestCore::new(0);
    let l = SpinLock::new("string", String::from("a"));
    let len = l.with_lock(&cpu, |s| {
        s.push('b');
        s.len()
    });
    assert_eq!(len, 2);

    // lock must be free now
    let got = l.with_lock(&cpu, |s| s.clone());
    assert_eq!(got, "ab");
}

#[test]
fn get_mut_allows_direct_mutation() {
    let cpu = TestCore::new(0);
    let mut l = SpinLock::new("vec", vec![1, 2, 3]);
    // &mut self guarantees no contention; we should get a plain &mut T
    l.get_mut().push(4);
    assert_eq!(l.lock(&cpu).as_slice(), &[1, 2, 3, 4]);
}

#[test]
fn stats_count_acquisitions() {
    let cpu = TestCore::new(0);
    let l = SpinLock::new("stats", 0u32);
    for _ in 0..5 {
        l.with_lock(&cpu, |v| *v += 1);
    }
    let stats = l.stats();
    assert_eq!(stats.name, "stats");
    assert_eq!(stats.acquisitions, 5);
    assert_eq!(stats.contended_spins, 0);
    assert_eq!(stats.to_string(), "lock: stats: #spins 0 #acquire 5");
}

#[test]
fn contended_increments_are_exact_and_exclusive() {
    let threads = 8; // keep small for determinism
    let iters = 5_000; // likewise

    let lock = Arc::new(SpinLock::new("contended", 0usize));
    let in_cs = Arc::new(AtomicUsize::new(0));
    let start = Arc::new(Barrier::new(threads));

    let mut handles = Vec::with_capacity(threads);
    for id in 0..threads {
        let lock = Arc::clone(&lock);
        let in_cs = Arc::clone(&in_cs);
        let start = Arc::clone(&start);
        handles.push(thread::spawn(move || {
            let cpu = TestCore::new(id);
            start.wait();
            for _ in 0..iters {
                lock.with_lock(&cpu, |v| {
                    let prev = in_cs.fetch_add(1, Ordering::SeqCst);
                    assert_eq!(prev, 0, "mutual exclusion violated");
                    *v += 1;
                    in_cs.fetch_sub(1, Ordering::SeqCst);
                });

                // yield only AFTER releasing the lock to reduce convoy effects
                thread::yield_now();
            }
            assert!(cpu.interrupts_enabled());
        }));
    }

    for h in handles {
        h.join().unwrap();
    }

    let cpu = TestCore::new(0);
    let total = lock.with_lock(&cpu, |v| *v);
    assert_eq!(total, threads * iters);
    assert_eq!(in_cs.load(Ordering::SeqCst), 0);
    assert_eq!(lock.stats().acquisitions, (threads * iters + 1) as u64);
}

#[test]
fn lock_is_released_on_panic() {
    let cpu = TestCore::new(0);
    let l = SpinLock::new("panicky", 0u32);

    let res = panic::catch_unwind(panic::AssertUnwindSafe(|| {
        l.with_lock(&cpu, |v| {
            *v = 123;
            panic!("boom");
        });
    }));
    assert!(res.is_err(), "expected panic");

    // We should be able to lock again right away.
    let val = l.with_lock(&cpu, |v| *v);
    assert_eq!(val, 123);
    assert!(cpu.interrupts_enabled());
}

/// Spot-check a concrete instantiation compiles as Sync.
#[test]
fn spinlock_is_sync_for_send_t() {
    // If this compiles, SpinLock<u8> is Sync.
    fn takes_sync<S: Sync>(_s: &S) {}
    let l = SpinLock::new("sync", 0u8);
    takes_sync(&l);
}
