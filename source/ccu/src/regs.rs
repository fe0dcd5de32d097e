//! Register banks, the register-I/O collaborator, and bitfield access.
//!
//! Every register access the engine performs goes through [`RegisterIo`].
//! Nodes never see absolute addresses: they are handed a [`Window`] onto
//! their bank, already resolved from the node's [`Bank`] selector by the
//! registry at build time.
use core::fmt;

use serde::{Deserialize, Serialize};

/// Register bank selector.
///
/// Each variant is one memory-mapped block of the SoC's clock/power
/// controller. The concrete base address is supplied by the platform
/// description through an [`AddressMap`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Bank {
    /// Main PMU.
    Mpmu,
    /// Application subsystem PMU.
    Apmu,
    /// APB peripheral clock controller.
    Apbc,
    /// APB spare registers (PLL tuning and PLL output gates).
    Apbs,
    Ciu,
    Dciu,
    Ddrc,
    AudioCtrl,
    Apbc2,
    Rcpu,
}

impl Bank {
    pub const ALL: [Bank; 10] = [
        Bank::Mpmu,
        Bank::Apmu,
        Bank::Apbc,
        Bank::Apbs,
        Bank::Ciu,
        Bank::Dciu,
        Bank::Ddrc,
        Bank::AudioCtrl,
        Bank::Apbc2,
        Bank::Rcpu,
    ];

    const fn index(self) -> usize {
        self as usize
    }
}

/// Maps each [`Bank`] to the base address it is mapped at.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AddressMap {
    bases: [Option<usize>; Bank::ALL.len()],
}

impl AddressMap {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bases: [None; Bank::ALL.len()],
        }
    }

    #[must_use]
    pub const fn with(mut self, bank: Bank, base: usize) -> Self {
        self.bases[bank.index()] = Some(base);
        self
    }

    pub fn set(&mut self, bank: Bank, base: usize) {
        self.bases[bank.index()] = Some(base);
    }

    pub fn base(&self, bank: Bank) -> Option<usize> {
        self.bases[bank.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Bank, usize)> + '_ {
        Bank::ALL
            .iter()
            .filter_map(|&bank| Some((bank, self.base(bank)?)))
    }
}

/// The register-I/O collaborator.
///
/// `base` is a bank base address from the [`AddressMap`], `offset` a byte
/// offset within that bank. Implementations are not expected to be
/// thread-safe: the registry serializes every access through its lock.
pub trait RegisterIo {
    fn read32(&mut self, base: usize, offset: u32) -> u32;
    fn write32(&mut self, base: usize, offset: u32, value: u32);
}

impl<T: RegisterIo + ?Sized> RegisterIo for &mut T {
    fn read32(&mut self, base: usize, offset: u32) -> u32 {
        (**self).read32(base, offset)
    }

    fn write32(&mut self, base: usize, offset: u32, value: u32) {
        (**self).write32(base, offset, value)
    }
}

/// Volatile access to memory-mapped registers.
pub struct Mmio {
    _priv: (),
}

impl Mmio {
    /// # Safety
    ///
    /// Every base address later passed to [`RegisterIo`] methods (that is,
    /// every base in the [`AddressMap`] the registry is built with) must be
    /// a valid, mapped, 4-byte aligned register block covering all offsets
    /// the clock table uses.
    #[must_use]
    pub const unsafe fn new() -> Self {
        Self { _priv: () }
    }
}

impl RegisterIo for Mmio {
    fn read32(&mut self, base: usize, offset: u32) -> u32 {
        let addr = (base + offset as usize) as *const u32;
        // SAFETY: upheld by the contract of `Mmio::new`.
        unsafe { core::ptr::read_volatile(addr) }
    }

    fn write32(&mut self, base: usize, offset: u32, value: u32) {
        let addr = (base + offset as usize) as *mut u32;
        // SAFETY: upheld by the contract of `Mmio::new`.
        unsafe { core::ptr::write_volatile(addr, value) }
    }
}

/// A bitfield within a 32-bit register, described by its shift and width.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    pub shift: u8,
    pub width: u8,
}

impl Field {
    #[must_use]
    pub const fn new(shift: u8, width: u8) -> Self {
        Self { shift, width }
    }

    /// The unshifted mask, i.e. the largest value the field can hold.
    #[must_use]
    pub const fn mask(&self) -> u32 {
        if self.width >= 32 {
            u32::MAX
        } else {
            (1 << self.width) - 1
        }
    }

    /// The mask in register position.
    #[must_use]
    pub const fn reg_mask(&self) -> u32 {
        self.mask() << self.shift
    }

    #[must_use]
    pub const fn get(&self, reg: u32) -> u32 {
        (reg >> self.shift) & self.mask()
    }

    /// Returns `reg` with this field replaced by `value`. Bits of `value`
    /// beyond the field width are dropped.
    #[must_use]
    pub const fn set(&self, reg: u32, value: u32) -> u32 {
        (reg & !self.reg_mask()) | ((value & self.mask()) << self.shift)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lo = self.shift as u32;
        let hi = lo + (self.width as u32).saturating_sub(1);
        write!(f, "[{hi}:{lo}]")
    }
}

/// Reads `field` out of the register at `base + offset`.
///
/// Not synchronized; the caller holds the registry lock.
pub fn read_field(io: &mut (impl RegisterIo + ?Sized), base: usize, offset: u32, field: Field) -> u32 {
    field.get(io.read32(base, offset))
}

/// Read-modify-write of `field` in the register at `base + offset`.
///
/// Not synchronized; the caller holds the registry lock.
pub fn write_field(
    io: &mut (impl RegisterIo + ?Sized),
    base: usize,
    offset: u32,
    field: Field,
    value: u32,
) {
    let reg = io.read32(base, offset);
    io.write32(base, offset, field.set(reg, value));
}

/// Register access scoped to one bank, handed out while the registry lock is
/// held.
pub struct Window<'a> {
    io: &'a mut dyn RegisterIo,
    base: usize,
}

impl<'a> Window<'a> {
    pub(crate) fn new(io: &'a mut dyn RegisterIo, base: usize) -> Self {
        Self { io, base }
    }

    pub fn base(&self) -> usize {
        self.base
    }

    pub fn read(&mut self, offset: u32) -> u32 {
        self.io.read32(self.base, offset)
    }

    pub fn write(&mut self, offset: u32, value: u32) {
        tracing::trace!(base = self.base, offset, value, "write");
        self.io.write32(self.base, offset, value)
    }

    /// Read-modify-write of a whole register. Returns the value written.
    pub fn modify(&mut self, offset: u32, f: impl FnOnce(u32) -> u32) -> u32 {
        let old = self.read(offset);
        let new = f(old);
        tracing::trace!(base = self.base, offset, old, new, "modify");
        self.io.write32(self.base, offset, new);
        new
    }

    pub fn read_field(&mut self, offset: u32, field: Field) -> u32 {
        read_field(&mut *self.io, self.base, offset, field)
    }

    pub fn write_field(&mut self, offset: u32, field: Field, value: u32) {
        tracing::trace!(base = self.base, offset, %field, value, "write field");
        write_field(&mut *self.io, self.base, offset, field, value)
    }
}
