use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use super::{ClockOps, FractionalDivisible, GateControl, Gateable, Regs};
use crate::{
    cru::Hw,
    rate,
    regs::{Field, RegisterIo, Window},
    wait::Delay,
    Error,
};

/// Field layout of a numerator/denominator divider.
///
/// Masks are unshifted. `rate = parent * den / (num * factor)`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DdnInfo {
    pub factor: u32,
    pub num_mask: u32,
    pub num_shift: u8,
    pub den_mask: u32,
    pub den_shift: u8,
}

impl DdnInfo {
    fn num_field(&self) -> Field {
        Field::new(self.num_shift, mask_width(self.num_mask))
    }

    fn den_field(&self) -> Field {
        Field::new(self.den_shift, mask_width(self.den_mask))
    }
}

const fn mask_width(mask: u32) -> u8 {
    (u32::BITS - mask.leading_zeros()) as u8
}

/// A table-driven fractional divider.
///
/// `table` holds the `(num, den)` pairs the divider may be programmed with,
/// ordered by increasing resulting rate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DdnControl {
    pub info: DdnInfo,
    pub table: Vec<(u32, u32)>,
}

impl DdnControl {
    pub(super) fn validate(&self) -> Result<(), &'static str> {
        if self.table.is_empty() {
            return Err("fractional divider table is empty");
        }
        if self.info.factor == 0 || self.table.iter().any(|&(num, _)| num == 0) {
            return Err("fractional divider divides by zero");
        }
        Ok(())
    }

    fn entry_rate(&self, parent: u64, (num, den): (u32, u32)) -> u64 {
        rate::ddn_rate(parent, num, den, self.info.factor)
    }

    /// Walks the table until an entry's rate exceeds `target`.
    ///
    /// Returns the index the walk stopped at (`table.len()` if no entry
    /// exceeds the target) and that entry's rate (the last entry's rate when
    /// the walk ran off the end).
    fn search(&self, parent: u64, target: u64) -> (usize, u64) {
        let mut rate = 0;
        for (i, &entry) in self.table.iter().enumerate() {
            rate = self.entry_rate(parent, entry);
            if rate > target {
                return (i, rate);
            }
        }
        (self.table.len(), rate)
    }
}

impl FractionalDivisible for DdnControl {
    fn recalc_fractional(&self, w: &mut Window<'_>, regs: &Regs, parent: u64) -> u64 {
        let reg = w.read(regs.ctrl);
        let num = self.info.num_field().get(reg);
        let den = self.info.den_field().get(reg);
        if den == 0 {
            return 0;
        }
        rate::ddn_rate(parent, num, den, self.info.factor)
    }

    /// The first and last table entries are returned as-is; between them, the
    /// nearer of the two entries straddling `target` wins, ties going to the
    /// upper one.
    fn round_fractional(&self, parent: u64, target: u64) -> u64 {
        let (stop, rate) = self.search(parent, target);
        if stop == 0 || stop == self.table.len() {
            return rate;
        }
        let prev = self.entry_rate(parent, self.table[stop - 1]);
        if target - prev >= rate - target {
            rate
        } else {
            prev
        }
    }

    /// Programs the entry just below the one the round-rate walk stopped at.
    /// For targets between two entries this can be one entry lower than what
    /// [`FractionalDivisible::round_fractional`] reports.
    fn program_fractional(&self, w: &mut Window<'_>, regs: &Regs, parent: u64, target: u64) {
        let (stop, _) = self.search(parent, target);
        let Some(&(num, den)) = self.table.get(stop.saturating_sub(1)) else {
            return;
        };
        let num_field = self.info.num_field();
        let den_field = self.info.den_field();
        w.modify(regs.ctrl, |reg| den_field.set(num_field.set(reg, num), den));
    }
}

/// A fractional divider node, optionally gated through its select register.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Ddn {
    pub regs: Regs,
    pub ddn: DdnControl,
    #[serde(default)]
    pub gate: Option<GateControl>,
}

impl ClockOps for Ddn {
    fn recalc_rate<Io: RegisterIo, D: Delay>(&self, hw: &Hw<'_, Io, D>, parent_rate: u64) -> u64 {
        hw.locked(|w| self.ddn.recalc_fractional(w, &self.regs, parent_rate))
    }

    fn round_rate<Io: RegisterIo, D: Delay>(
        &self,
        _: &Hw<'_, Io, D>,
        parent_rate: u64,
        target: u64,
    ) -> u64 {
        self.ddn.round_fractional(parent_rate, target)
    }

    fn set_rate<Io: RegisterIo, D: Delay>(
        &mut self,
        hw: &Hw<'_, Io, D>,
        parent_rate: u64,
        target: u64,
    ) -> Result<(), Error> {
        hw.locked(|w| self.ddn.program_fractional(w, &self.regs, parent_rate, target));
        Ok(())
    }

    fn enable<Io: RegisterIo, D: Delay>(&self, hw: &Hw<'_, Io, D>) -> Result<(), Error> {
        if let Some(gate) = &self.gate {
            hw.locked(|w| gate.gate_on(w, self.regs.sel));
        }
        Ok(())
    }

    fn disable<Io: RegisterIo, D: Delay>(&self, hw: &Hw<'_, Io, D>) {
        if let Some(gate) = &self.gate {
            hw.locked(|w| gate.gate_off(w, self.regs.sel));
        }
    }

    fn is_enabled<Io: RegisterIo, D: Delay>(&self, hw: &Hw<'_, Io, D>) -> bool {
        match &self.gate {
            Some(gate) => hw.locked(|w| gate.gate_is_on(w, self.regs.sel)),
            None => true,
        }
    }

    fn has_gate(&self) -> bool {
        self.gate.is_some()
    }
}
