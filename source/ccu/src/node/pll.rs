use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use super::{ClockOps, PllControllable, Regs};
use crate::{
    cru::Hw,
    regs::{Bank, RegisterIo, Window},
    wait::Delay,
    Error,
};

/// One supported PLL output rate and the tuning values that produce it.
///
/// `values[0..3]` go to the node's `ctrl`, `sel` and `xtc` registers.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PllEntry {
    pub rate: u64,
    pub values: [u32; 3],
}

impl PllEntry {
    #[must_use]
    pub const fn new(rate: u64, ctrl: u32, sel: u32, xtc: u32) -> Self {
        Self {
            rate,
            values: [ctrl, sel, xtc],
        }
    }
}

/// Where a PLL reports lock.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LockStatus {
    pub bank: Bank,
    pub offset: u32,
    pub bit: u32,
}

/// A PLL's rate table.
///
/// `masks[i]` selects the bits of tuning register `i` the table owns; the
/// rest of the register is preserved on write and ignored on decode. A zero
/// mask means the register is not used.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PllControl {
    pub table: Vec<PllEntry>,
    #[serde(default = "PllControl::full_masks")]
    pub masks: [u32; 3],
}

impl PllControl {
    const fn full_masks() -> [u32; 3] {
        [u32::MAX; 3]
    }

    #[must_use]
    pub fn new(table: impl Into<Vec<PllEntry>>) -> Self {
        Self {
            table: table.into(),
            masks: Self::full_masks(),
        }
    }

    #[must_use]
    pub fn with_masks(self, masks: [u32; 3]) -> Self {
        Self { masks, ..self }
    }

    fn tuning_regs(regs: &Regs) -> [u32; 3] {
        [regs.ctrl, regs.sel, regs.xtc]
    }
}

impl PllControllable for PllControl {
    fn entry_for(&self, rate: u64) -> Option<usize> {
        self.table.iter().position(|e| e.rate == rate)
    }

    fn rate_of(&self, index: usize) -> Option<u64> {
        self.table.get(index).map(|e| e.rate)
    }

    fn program_entry(&self, w: &mut Window<'_>, regs: &Regs, index: usize) {
        let Some(entry) = self.table.get(index) else {
            return;
        };
        for ((offset, mask), value) in Self::tuning_regs(regs)
            .into_iter()
            .zip(self.masks)
            .zip(entry.values)
        {
            if mask == 0 {
                continue;
            }
            w.modify(offset, |reg| (reg & !mask) | (value & mask));
        }
    }

    fn decode_entry(&self, w: &mut Window<'_>, regs: &Regs) -> Option<usize> {
        let mut current = [0u32; 3];
        for (i, offset) in Self::tuning_regs(regs).into_iter().enumerate() {
            if self.masks[i] != 0 {
                current[i] = w.read(offset) & self.masks[i];
            }
        }
        self.table.iter().position(|entry| {
            entry
                .values
                .iter()
                .zip(self.masks)
                .zip(current)
                .all(|((&value, mask), reg)| value & mask == reg)
        })
    }
}

/// A PLL node.
///
/// Only the rates in the table can be set. After programming the tuning
/// registers, `set_rate` waits for the lock bit, polling with backoff and
/// taking the registry lock for each individual read only. Enabling a PLL is
/// the same lock wait; there is no separate gate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Pll {
    pub regs: Regs,
    pub pll: PllControl,
    pub lock: LockStatus,
    /// Table index last programmed through `set_rate`.
    #[serde(skip)]
    latched: Option<usize>,
}

impl Pll {
    #[must_use]
    pub fn new(regs: Regs, pll: PllControl, lock: LockStatus) -> Self {
        Self {
            regs,
            pll,
            lock,
            latched: None,
        }
    }

    pub fn latched(&self) -> Option<usize> {
        self.latched
    }

    fn is_locked<Io: RegisterIo, D: Delay>(&self, hw: &Hw<'_, Io, D>) -> bool {
        hw.locked_at(hw.lock_base(), |w| w.read(self.lock.offset) & self.lock.bit != 0)
    }

    fn wait_for_lock<Io: RegisterIo, D: Delay>(&self, hw: &Hw<'_, Io, D>) -> Result<(), Error> {
        match hw.lock_wait().poll(hw.delay(), || self.is_locked(hw)) {
            Some(polls) => {
                tracing::trace!(pll = hw.name(), polls, "locked");
                Ok(())
            }
            None => {
                tracing::warn!(pll = hw.name(), "timed out waiting for lock");
                Err(Error::LockTimeout {
                    name: hw.name().into(),
                })
            }
        }
    }
}

impl ClockOps for Pll {
    fn recalc_rate<Io: RegisterIo, D: Delay>(&self, hw: &Hw<'_, Io, D>, _: u64) -> u64 {
        let index = match self.latched {
            Some(index) => Some(index),
            None => hw.locked(|w| self.pll.decode_entry(w, &self.regs)),
        };
        index.and_then(|i| self.pll.rate_of(i)).unwrap_or(0)
    }

    /// The table rate nearest `target`, ties going to the lower rate.
    fn round_rate<Io: RegisterIo, D: Delay>(&self, _: &Hw<'_, Io, D>, _: u64, target: u64) -> u64 {
        self.pll
            .table
            .iter()
            .map(|e| e.rate)
            .min_by_key(|&rate| (rate.abs_diff(target), rate))
            .unwrap_or(0)
    }

    fn set_rate<Io: RegisterIo, D: Delay>(
        &mut self,
        hw: &Hw<'_, Io, D>,
        _: u64,
        target: u64,
    ) -> Result<(), Error> {
        let Some(index) = self.pll.entry_for(target) else {
            return Err(Error::UnsupportedRate {
                name: hw.name().into(),
                rate: target,
            });
        };
        hw.locked(|w| self.pll.program_entry(w, &self.regs, index));
        self.latched = Some(index);
        self.wait_for_lock(hw)
    }

    fn enable<Io: RegisterIo, D: Delay>(&self, hw: &Hw<'_, Io, D>) -> Result<(), Error> {
        self.wait_for_lock(hw)
    }

    fn is_enabled<Io: RegisterIo, D: Delay>(&self, hw: &Hw<'_, Io, D>) -> bool {
        self.is_locked(hw)
    }
}
