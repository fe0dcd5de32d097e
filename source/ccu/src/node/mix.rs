use serde::{Deserialize, Serialize};

use super::{ClockOps, DividerControl, Divisible, GateControl, Gateable, MuxControl, Muxable, Regs};
use crate::{
    cru::Hw,
    rate,
    regs::{RegisterIo, Window},
    wait::Delay,
    Error,
};

/// A composite node: any combination of gate, divider and mux sharing one
/// control register (and, for two-register dividers, a select register).
///
/// Dividers and muxes in the same node share the node's frequency-change
/// bit: after either field is written, the bit is pulsed once. Completion is
/// not polled for; the hardware clears the bit itself when the change has
/// been latched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Mix {
    pub regs: Regs,
    #[serde(default)]
    pub gate: Option<GateControl>,
    #[serde(default)]
    pub div: Option<DividerControl>,
    #[serde(default)]
    pub mux: Option<MuxControl>,
}

impl Mix {
    #[must_use]
    pub const fn new(regs: Regs) -> Self {
        Self {
            regs,
            gate: None,
            div: None,
            mux: None,
        }
    }

    #[must_use]
    pub fn gate(self, gate: GateControl) -> Self {
        Self {
            gate: Some(gate),
            ..self
        }
    }

    #[must_use]
    pub fn div(self, div: DividerControl) -> Self {
        Self {
            div: Some(div),
            ..self
        }
    }

    #[must_use]
    pub fn mux(self, mux: MuxControl) -> Self {
        Self {
            mux: Some(mux),
            ..self
        }
    }

    pub(super) fn validate(&self, parents: usize) -> Result<(), &'static str> {
        if let Some(DividerControl::Fixed { div: 0, .. }) = self.div {
            return Err("fixed divisor is zero");
        }
        if let Some(mux) = &self.mux {
            if !mux.table_fits() {
                return Err("mux value does not fit the mux field");
            }
            if parents > mux.capacity() {
                return Err("more parents than the mux field can select");
            }
        }
        Ok(())
    }

    /// Register holding the frequency-change bit.
    pub fn fc_offset(&self) -> u32 {
        match self.div {
            Some(div) if div.uses_select_register() => self.regs.sel,
            _ => self.regs.ctrl,
        }
    }

    fn trigger_fc(&self, w: &mut Window<'_>) {
        if let Some(fc) = self.regs.fc {
            w.modify(self.fc_offset(), |reg| reg | fc);
        }
    }
}

impl ClockOps for Mix {
    fn recalc_rate<Io: RegisterIo, D: Delay>(&self, hw: &Hw<'_, Io, D>, parent_rate: u64) -> u64 {
        match &self.div {
            Some(div) => {
                let (mul, d) = hw.locked(|w| div.ratio(w, &self.regs));
                rate::child_rate(parent_rate, mul, d)
            }
            None => parent_rate,
        }
    }

    fn round_rate<Io: RegisterIo, D: Delay>(
        &self,
        _: &Hw<'_, Io, D>,
        parent_rate: u64,
        target: u64,
    ) -> u64 {
        match &self.div {
            Some(div) => div.round_divided(parent_rate, target),
            None => parent_rate,
        }
    }

    fn set_rate<Io: RegisterIo, D: Delay>(
        &mut self,
        hw: &Hw<'_, Io, D>,
        parent_rate: u64,
        target: u64,
    ) -> Result<(), Error> {
        let Some(div) = &self.div else {
            return Ok(());
        };
        if matches!(div, DividerControl::Fixed { .. }) {
            return Ok(());
        }
        hw.locked(|w| {
            div.program(w, &self.regs, parent_rate, target);
            self.trigger_fc(w);
        });
        Ok(())
    }

    fn enable<Io: RegisterIo, D: Delay>(&self, hw: &Hw<'_, Io, D>) -> Result<(), Error> {
        if let Some(gate) = &self.gate {
            hw.locked(|w| gate.gate_on(w, self.regs.ctrl));
        }
        Ok(())
    }

    fn disable<Io: RegisterIo, D: Delay>(&self, hw: &Hw<'_, Io, D>) {
        if let Some(gate) = &self.gate {
            hw.locked(|w| gate.gate_off(w, self.regs.ctrl));
        }
    }

    fn is_enabled<Io: RegisterIo, D: Delay>(&self, hw: &Hw<'_, Io, D>) -> bool {
        match &self.gate {
            Some(gate) => hw.locked(|w| gate.gate_is_on(w, self.regs.ctrl)),
            None => true,
        }
    }

    fn has_gate(&self) -> bool {
        self.gate.is_some()
    }

    fn parent_index<Io: RegisterIo, D: Delay>(&self, hw: &Hw<'_, Io, D>) -> usize {
        match &self.mux {
            Some(mux) => hw.locked(|w| mux.parent_index(w, &self.regs)),
            None => 0,
        }
    }

    fn set_parent_index<Io: RegisterIo, D: Delay>(
        &self,
        hw: &Hw<'_, Io, D>,
        index: usize,
    ) -> Result<(), Error> {
        let selected = match &self.mux {
            Some(mux) => hw.locked(|w| {
                let selected = mux.select(w, &self.regs, index);
                if selected {
                    self.trigger_fc(w);
                }
                selected
            }),
            None => index == 0,
        };
        if selected {
            Ok(())
        } else {
            Err(Error::InvalidParent {
                name: hw.name().into(),
                index,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cru::Cru, regs::Bank, sim::SimRegisters};

    const BASE: usize = 0xd428_2800;

    fn sdh0() -> Mix {
        Mix::new(Regs::new(Bank::Apmu, 0x54).with_fc(1 << 11))
            .gate(GateControl::new(0x12))
            .div(DividerControl::register(8, 3))
            .mux(MuxControl::new(5, 3))
    }

    #[test]
    fn divider_change_pulses_fc() {
        let mut sdh0 = sdh0();
        let cru = Cru::new(SimRegisters::new().recording());
        let hw = Hw::new(&cru, "sdh0_clk", BASE);

        sdh0.set_rate(&hw, 409_600_000, 204_800_000).unwrap();
        assert_eq!(sdh0.recalc_rate(&hw, 409_600_000), 204_800_000);

        let writes: alloc::vec::Vec<_> = cru.with_io(|io| io.writes().copied().collect());
        // divider field write, then the FC pulse on top of it
        assert_eq!(writes.len(), 2);
        assert_eq!(
            writes[1],
            crate::sim::Access::Write {
                addr: BASE + 0x54,
                value: (2 << 8) | (1 << 11)
            }
        );
    }

    #[test]
    fn mux_select_and_read_back() {
        let sdh0 = sdh0();
        let cru = Cru::new(SimRegisters::new());
        let hw = Hw::new(&cru, "sdh0_clk", BASE);

        sdh0.set_parent_index(&hw, 3).unwrap();
        assert_eq!(sdh0.parent_index(&hw), 3);
        assert_eq!(
            sdh0.set_parent_index(&hw, 9),
            Err(Error::InvalidParent {
                name: "sdh0_clk".into(),
                index: 9
            })
        );
    }

    #[test]
    fn gateless_node_is_always_enabled() {
        let cpu = Mix::new(Regs::new(Bank::Apmu, 0x38c)).mux(MuxControl::new(0, 3));
        let cru = Cru::new(SimRegisters::new());
        let hw = Hw::new(&cru, "cpu_c0_core_clk", BASE);

        assert!(cpu.is_enabled(&hw));
        cru.with_io(|io| io.poke(BASE + 0x38c, 0xffff_ffff));
        assert!(cpu.is_enabled(&hw));
        cpu.disable(&hw);
        assert!(cpu.is_enabled(&hw));
        assert!(!cpu.has_gate());
    }
}
