//! The registry-wide register lock.
//!
//! A single lock guards every register read-modify-write for every node in
//! the tree. Clock changes are rare and each one is a handful of register
//! accesses, so there is one lock for the whole controller rather than one
//! per node or per bank.
use core::cell::RefCell;

use critical_section::Mutex;

use crate::{
    regs::{RegisterIo, Window},
    wait::{Delay, LockWait, SpinDelay},
};

/// Owns the register-I/O collaborator behind the registry lock.
pub struct Cru<Io, D = SpinDelay> {
    io: Mutex<RefCell<Io>>,
    delay: D,
    lock_wait: LockWait,
}

impl<Io: RegisterIo> Cru<Io> {
    #[must_use]
    pub fn new(io: Io) -> Self {
        Self::with_delay(io, SpinDelay::new(100))
    }
}

impl<Io: RegisterIo, D: Delay> Cru<Io, D> {
    #[must_use]
    pub fn with_delay(io: Io, delay: D) -> Self {
        Self {
            io: Mutex::new(RefCell::new(io)),
            delay,
            lock_wait: LockWait::DEFAULT,
        }
    }

    #[must_use]
    pub fn with_lock_wait(self, lock_wait: LockWait) -> Self {
        Self { lock_wait, ..self }
    }

    pub fn lock_wait(&self) -> &LockWait {
        &self.lock_wait
    }

    pub fn delay(&self) -> &D {
        &self.delay
    }

    /// Runs `f` with the lock held and a register window onto `base`.
    ///
    /// `f` must not call back into the `Cru`.
    pub fn locked<R>(&self, base: usize, f: impl FnOnce(&mut Window<'_>) -> R) -> R {
        critical_section::with(|cs| {
            let mut io = self.io.borrow_ref_mut(cs);
            let mut window = Window::new(&mut *io, base);
            f(&mut window)
        })
    }

    /// Direct access to the collaborator, with the lock held. Intended for
    /// simulation and inspection.
    pub fn with_io<R>(&self, f: impl FnOnce(&mut Io) -> R) -> R {
        critical_section::with(|cs| f(&mut self.io.borrow_ref_mut(cs)))
    }

    pub fn into_io(self) -> Io {
        self.io.into_inner().into_inner()
    }
}

/// A node's view of the controller: its name, its resolved bank base, and the
/// shared lock.
pub struct Hw<'a, Io, D> {
    cru: &'a Cru<Io, D>,
    name: &'a str,
    base: usize,
    lock_base: usize,
}

impl<'a, Io: RegisterIo, D: Delay> Hw<'a, Io, D> {
    pub(crate) fn new(cru: &'a Cru<Io, D>, name: &'a str, base: usize) -> Self {
        Self {
            cru,
            name,
            base,
            lock_base: base,
        }
    }

    /// Base of the bank holding a PLL's lock-status register, when it is not
    /// the node's own bank.
    pub(crate) fn with_lock_base(self, lock_base: usize) -> Self {
        Self { lock_base, ..self }
    }

    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn base(&self) -> usize {
        self.base
    }

    /// Lock the registry and access this node's bank.
    pub fn locked<R>(&self, f: impl FnOnce(&mut Window<'_>) -> R) -> R {
        self.cru.locked(self.base, f)
    }

    /// Lock the registry and access another bank (e.g. a PLL's lock-status
    /// register, which lives outside the PLL's own bank).
    pub fn locked_at<R>(&self, base: usize, f: impl FnOnce(&mut Window<'_>) -> R) -> R {
        self.cru.locked(base, f)
    }

    pub fn lock_base(&self) -> usize {
        self.lock_base
    }

    pub fn delay(&self) -> &D {
        &self.cru.delay
    }

    pub fn lock_wait(&self) -> &LockWait {
        &self.cru.lock_wait
    }
}
