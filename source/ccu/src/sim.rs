//! A simulated register file.
//!
//! [`SimRegisters`] stands in for memory-mapped hardware when a clock table
//! is exercised offline. Registers read as zero until written. Two pieces of
//! hardware behaviour are modelled, since the engine depends on them:
//!
//! * *sticky* bits always read back as set (PLL lock-status bits of a
//!   simulated PLL that locks immediately);
//! * *self-clearing* bits are dropped right after a write (frequency-change
//!   handshake bits, which the hardware clears once the change is latched).
use alloc::{collections::BTreeMap, vec::Vec};

use crate::{
    node::NodeKind,
    regs::{AddressMap, RegisterIo},
    table::ClockDesc,
};

/// One recorded register access.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Access {
    Read { addr: usize, value: u32 },
    Write { addr: usize, value: u32 },
}

impl Access {
    pub fn addr(&self) -> usize {
        match *self {
            Self::Read { addr, .. } | Self::Write { addr, .. } => addr,
        }
    }

    pub fn is_write(&self) -> bool {
        matches!(self, Self::Write { .. })
    }
}

#[derive(Clone, Debug, Default)]
pub struct SimRegisters {
    regs: BTreeMap<usize, u32>,
    sticky: BTreeMap<usize, u32>,
    self_clearing: BTreeMap<usize, u32>,
    log: Option<Vec<Access>>,
}

impl SimRegisters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A register file preconfigured for `table`: every PLL's lock bit is
    /// sticky (the PLLs lock immediately) and every frequency-change bit is
    /// self-clearing. Nodes in banks missing from `map` are skipped.
    #[must_use]
    pub fn for_table(table: &[ClockDesc], map: &AddressMap) -> Self {
        let mut sim = Self::new();
        for desc in table {
            match &desc.kind {
                NodeKind::Pll(pll) => {
                    if let Some(base) = map.base(pll.lock.bank) {
                        sim.set_sticky(base + pll.lock.offset as usize, pll.lock.bit);
                    }
                }
                NodeKind::Mix(mix) => {
                    let (Some(fc), Some(base)) = (mix.regs.fc, map.base(mix.regs.bank)) else {
                        continue;
                    };
                    sim.set_self_clearing(base + mix.fc_offset() as usize, fc);
                }
                _ => {}
            }
        }
        sim
    }

    /// Start recording every access.
    #[must_use]
    pub fn recording(mut self) -> Self {
        self.log = Some(Vec::new());
        self
    }

    pub fn set_sticky(&mut self, addr: usize, mask: u32) {
        *self.sticky.entry(addr).or_default() |= mask;
    }

    pub fn clear_sticky(&mut self, addr: usize, mask: u32) {
        if let Some(bits) = self.sticky.get_mut(&addr) {
            *bits &= !mask;
        }
    }

    pub fn set_self_clearing(&mut self, addr: usize, mask: u32) {
        *self.self_clearing.entry(addr).or_default() |= mask;
    }

    /// Current value, without recording an access.
    pub fn peek(&self, addr: usize) -> u32 {
        self.regs.get(&addr).copied().unwrap_or(0) | self.sticky.get(&addr).copied().unwrap_or(0)
    }

    /// Overwrite a register, without recording an access.
    pub fn poke(&mut self, addr: usize, value: u32) {
        self.regs.insert(addr, value);
    }

    pub fn accesses(&self) -> &[Access] {
        self.log.as_deref().unwrap_or(&[])
    }

    pub fn writes(&self) -> impl Iterator<Item = &Access> + '_ {
        self.accesses().iter().filter(|a| a.is_write())
    }

    pub fn clear_log(&mut self) {
        if let Some(log) = self.log.as_mut() {
            log.clear();
        }
    }

    fn record(&mut self, access: Access) {
        if let Some(log) = self.log.as_mut() {
            log.push(access);
        }
    }
}

impl RegisterIo for SimRegisters {
    fn read32(&mut self, base: usize, offset: u32) -> u32 {
        let addr = base + offset as usize;
        let value = self.peek(addr);
        self.record(Access::Read { addr, value });
        value
    }

    fn write32(&mut self, base: usize, offset: u32, value: u32) {
        let addr = base + offset as usize;
        self.record(Access::Write { addr, value });
        let clear = self.self_clearing.get(&addr).copied().unwrap_or(0);
        self.regs.insert(addr, value & !clear);
    }
}
