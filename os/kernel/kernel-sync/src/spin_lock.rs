use crate::{CoreId, CpuCore, IrqGuard};
use core::{
    cell::UnsafeCell,
    fmt,
    hint::spin_loop,
    ops::{Deref, DerefMut},
    sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering, fence},
};

const NO_HOLDER: usize = usize::MAX;

/// A mutual-exclusion spin lock that masks local interrupts while held.
///
/// Acquisition disables interrupts on the acquiring core first (via
/// [`IrqGuard`]), then busy-waits; it never yields. A full fence is issued
/// after acquiring and before releasing, so stores made inside the critical
/// section are visible to the next holder on any core.
///
/// The lock records which core holds it. Acquiring it again on that core
/// would spin forever, so it is treated as a fatal error instead.
pub struct SpinLock<T> {
    name: &'static str,
    /// lock state
    /// * `false`: unlocked
    /// * `true`: locked
    locked: AtomicBool,
    /// [`CoreId::index`] of the holder, or `NO_HOLDER`.
    holder: AtomicUsize,
    acquisitions: AtomicU64,
    contended_spins: AtomicU64,
    inner: UnsafeCell<T>,
}

// Safety: mutual exclusion; only T: Send may cross cores.
unsafe impl<T: Send> Sync for SpinLock<T> {}

/// Contention counters of one [`SpinLock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockStats {
    pub name: &'static str,
    /// Number of successful acquisitions.
    pub acquisitions: u64,
    /// Number of spin iterations spent waiting for another holder.
    pub contended_spins: u64,
}

impl fmt::Display for LockStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "lock: {}: #spins {} #acquire {}",
            self.name, self.contended_spins, self.acquisitions
        )
    }
}

impl<T> SpinLock<T> {
    pub const fn new(name: &'static str, inner: T) -> Self {
        Self {
            name,
            locked: AtomicBool::new(false),
            holder: AtomicUsize::new(NO_HOLDER),
            acquisitions: AtomicU64::new(0),
            contended_spins: AtomicU64::new(0),
            inner: UnsafeCell::new(inner),
        }
    }

    /// Whether `core` currently holds this lock.
    ///
    /// Only meaningful when asked by `core` itself with interrupts masked;
    /// the answer about another core may be stale.
    #[inline]
    #[must_use]
    pub fn is_held_by(&self, core: CoreId) -> bool {
        self.locked.load(Ordering::Relaxed) && self.holder.load(Ordering::Relaxed) == core.index()
    }

    #[inline]
    #[must_use]
    pub fn stats(&self) -> LockStats {
        LockStats {
            name: self.name,
            acquisitions: self.acquisitions.load(Ordering::Relaxed),
            contended_spins: self.contended_spins.load(Ordering::Relaxed),
        }
    }

    /// Spin until acquired (TATAS), then return a guard.
    ///
    /// # Panics
    /// If `cpu` already holds this lock.
    #[inline]
    pub fn lock<'a>(&'a self, cpu: &'a dyn CpuCore) -> SpinLockGuard<'a, T> {
        let irq = IrqGuard::new(cpu);
        self.check_not_held(cpu.id());

        // Fast path: take the lock if it looks free.
        while self
            .locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            // Contended path: spin on a read, then retry CAS.
            while self.locked.load(Ordering::Relaxed) {
                self.contended_spins.fetch_add(1, Ordering::Relaxed);
                spin_loop();
            }
        }

        self.enter(cpu.id());
        SpinLockGuard { lock: self, _irq: irq }
    }

    /// Try once; returns immediately.
    ///
    /// # Panics
    /// If `cpu` already holds this lock.
    #[inline]
    pub fn try_lock<'a>(&'a self, cpu: &'a dyn CpuCore) -> Option<SpinLockGuard<'a, T>> {
        let irq = IrqGuard::new(cpu);
        self.check_not_held(cpu.id());

        if self
            .locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            self.enter(cpu.id());
            Some(SpinLockGuard { lock: self, _irq: irq })
        } else {
            None
        }
    }

    /// Closure convenience, built on the guard.
    #[inline]
    pub fn with_lock<R>(&self, cpu: &dyn CpuCore, f: impl FnOnce(&mut T) -> R) -> R {
        let mut g = self.lock(cpu);
        f(&mut g)
    }

    /// Mutable access when you have `&mut self` (no contention possible).
    #[inline]
    pub const fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut()
    }

    fn check_not_held(&self, core: CoreId) {
        if self.is_held_by(core) {
            log::error!("{}: already held by {core}", self.name);
            panic!("{}: lock re-acquired by its holder", self.name);
        }
    }

    fn enter(&self, core: CoreId) {
        fence(Ordering::SeqCst);
        self.holder.store(core.index(), Ordering::Relaxed);
        self.acquisitions.fetch_add(1, Ordering::Relaxed);
    }
}

/// Holds a [`SpinLock`] and keeps interrupts masked on the acquiring core.
///
/// Dropping the guard releases the lock first and then closes the
/// interrupt section.
pub struct SpinLockGuard<'a, T> {
    lock: &'a SpinLock<T>,
    _irq: IrqGuard<'a>,
}

impl<T> Deref for SpinLockGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { &*self.lock.inner.get() }
    }
}

impl<T> DerefMut for SpinLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.lock.inner.get() }
    }
}

impl<T> Drop for SpinLockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.holder.store(NO_HOLDER, Ordering::Relaxed);
        fence(Ordering::SeqCst);
        // Release publishes the critical section.
        self.lock.locked.store(false, Ordering::Release);
        // `_irq` drops after this body and restores the interrupt state.
    }
}
