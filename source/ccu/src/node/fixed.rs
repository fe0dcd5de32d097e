use serde::{Deserialize, Serialize};

use super::ClockOps;
use crate::{cru::Hw, rate, regs::RegisterIo, wait::Delay, Error};

/// A root clock of constant rate, such as a crystal oscillator.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixedRate {
    pub rate: u64,
}

impl FixedRate {
    #[must_use]
    pub const fn new(rate: u64) -> Self {
        Self { rate }
    }
}

impl ClockOps for FixedRate {
    fn recalc_rate<Io: RegisterIo, D: Delay>(&self, _: &Hw<'_, Io, D>, _: u64) -> u64 {
        self.rate
    }

    fn round_rate<Io: RegisterIo, D: Delay>(&self, _: &Hw<'_, Io, D>, _: u64, _: u64) -> u64 {
        self.rate
    }

    fn set_rate<Io: RegisterIo, D: Delay>(
        &mut self,
        hw: &Hw<'_, Io, D>,
        _: u64,
        target: u64,
    ) -> Result<(), Error> {
        if target == self.rate {
            Ok(())
        } else {
            Err(Error::UnsupportedRate {
                name: hw.name().into(),
                rate: target,
            })
        }
    }
}

/// A registerless fixed factor: `rate = parent * mul / div`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Factor {
    pub mul: u32,
    pub div: u32,
}

impl Factor {
    #[must_use]
    pub const fn new(mul: u32, div: u32) -> Self {
        Self { mul, div }
    }
}

impl ClockOps for Factor {
    fn recalc_rate<Io: RegisterIo, D: Delay>(&self, _: &Hw<'_, Io, D>, parent_rate: u64) -> u64 {
        rate::child_rate(parent_rate, self.mul, self.div)
    }

    fn round_rate<Io: RegisterIo, D: Delay>(
        &self,
        _: &Hw<'_, Io, D>,
        parent_rate: u64,
        _: u64,
    ) -> u64 {
        rate::child_rate(parent_rate, self.mul, self.div)
    }

    /// Nothing to program; the registry forwards the request to the parent
    /// for nodes flagged `SET_RATE_PARENT`.
    fn set_rate<Io: RegisterIo, D: Delay>(
        &mut self,
        _: &Hw<'_, Io, D>,
        _: u64,
        _: u64,
    ) -> Result<(), Error> {
        Ok(())
    }
}
