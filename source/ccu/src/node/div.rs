use serde::{Deserialize, Serialize};

use super::{Divisible, Regs};
use crate::{
    rate,
    regs::{Field, Window},
};

/// How a raw divider field maps to a divisor.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DividerEncoding {
    /// The field holds the divisor. A raw 0 reads as 1.
    #[default]
    OneBased,
    /// The field holds the divisor minus one.
    ZeroBased,
}

impl DividerEncoding {
    const fn decode(self, raw: u32) -> u32 {
        match self {
            Self::OneBased if raw == 0 => 1,
            Self::OneBased => raw,
            Self::ZeroBased => raw.saturating_add(1),
        }
    }

    const fn encode(self, div: u32) -> u32 {
        match self {
            Self::OneBased => div,
            Self::ZeroBased => div - 1,
        }
    }

    const fn max_divisor(self, max_raw: u32) -> u32 {
        match self {
            Self::OneBased => max_raw,
            Self::ZeroBased => max_raw.saturating_add(1),
        }
    }
}

/// Divider configuration.
///
/// A divider is either a compile-time constant ratio, a field in the node's
/// control register, or a field split across the control register (low
/// bits) and the select register (high bits). Whether a change is committed
/// with a frequency-change pulse is a property of the node (see
/// [`Regs::fc`]), shared with any mux in the same node.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DividerControl {
    /// `rate = parent * mul / div`, no register access.
    Fixed { mul: u32, div: u32 },
    /// Divisor field in the control register.
    Register {
        field: Field,
        #[serde(default)]
        encoding: DividerEncoding,
    },
    /// Divisor split across two registers: `low` in the control register,
    /// `high` in the select register.
    TwoRegister {
        low: Field,
        high: Field,
        #[serde(default)]
        encoding: DividerEncoding,
    },
}

impl DividerControl {
    #[must_use]
    pub const fn fixed(mul: u32, div: u32) -> Self {
        Self::Fixed { mul, div }
    }

    #[must_use]
    pub const fn register(shift: u8, width: u8) -> Self {
        Self::Register {
            field: Field::new(shift, width),
            encoding: DividerEncoding::OneBased,
        }
    }

    #[must_use]
    pub const fn two_register(low: Field, high: Field) -> Self {
        Self::TwoRegister {
            low,
            high,
            encoding: DividerEncoding::OneBased,
        }
    }

    #[must_use]
    pub const fn zero_based(self) -> Self {
        match self {
            Self::Register { field, .. } => Self::Register {
                field,
                encoding: DividerEncoding::ZeroBased,
            },
            Self::TwoRegister { low, high, .. } => Self::TwoRegister {
                low,
                high,
                encoding: DividerEncoding::ZeroBased,
            },
            fixed => fixed,
        }
    }

    /// Whether this divider lives partly in the select register. The node's
    /// frequency-change bit moves there too.
    #[must_use]
    pub const fn uses_select_register(&self) -> bool {
        matches!(self, Self::TwoRegister { .. })
    }

    /// Largest divisor the register(s) can represent.
    #[must_use]
    pub const fn max_divisor(&self) -> u32 {
        match *self {
            Self::Fixed { .. } => 1,
            Self::Register { field, encoding } => encoding.max_divisor(field.mask()),
            Self::TwoRegister {
                low,
                high,
                encoding,
            } => {
                let width = low.width as u32 + high.width as u32;
                let max_raw = if width >= 32 { u32::MAX } else { (1 << width) - 1 };
                encoding.max_divisor(max_raw)
            }
        }
    }

    fn read_divisor(&self, w: &mut Window<'_>, regs: &Regs) -> u32 {
        match *self {
            Self::Fixed { .. } => 1,
            Self::Register { field, encoding } => encoding.decode(w.read_field(regs.ctrl, field)),
            Self::TwoRegister {
                low,
                high,
                encoding,
            } => {
                let lo = w.read_field(regs.ctrl, low);
                let hi = w.read_field(regs.sel, high);
                encoding.decode((hi << low.width) | lo)
            }
        }
    }

    /// `parent / target` rounded to the nearest integer, clamped to the
    /// representable range.
    fn best_divisor(&self, parent: u64, target: u64) -> u32 {
        let max = self.max_divisor().max(1);
        if target == 0 {
            return max;
        }
        rate::div_round_closest(parent, target).clamp(1, max as u64) as u32
    }
}

impl Divisible for DividerControl {
    fn ratio(&self, w: &mut Window<'_>, regs: &Regs) -> (u32, u32) {
        match *self {
            Self::Fixed { mul, div } => (mul, div),
            _ => (1, self.read_divisor(w, regs)),
        }
    }

    fn round_divided(&self, parent: u64, target: u64) -> u64 {
        match *self {
            Self::Fixed { mul, div } => rate::child_rate(parent, mul, div),
            _ => parent / self.best_divisor(parent, target) as u64,
        }
    }

    fn program(&self, w: &mut Window<'_>, regs: &Regs, parent: u64, target: u64) {
        match *self {
            Self::Fixed { .. } => {}
            Self::Register { field, encoding } => {
                let div = self.best_divisor(parent, target);
                w.write_field(regs.ctrl, field, encoding.encode(div));
            }
            Self::TwoRegister {
                low,
                high,
                encoding,
            } => {
                let raw = encoding.encode(self.best_divisor(parent, target));
                w.write_field(regs.ctrl, low, raw & low.mask());
                w.write_field(regs.sel, high, raw >> low.width);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{regs::Bank, sim::SimRegisters};

    const REGS: Regs = Regs::new(Bank::Apmu, 0x54).with_sel(0x58);

    #[test]
    fn register_divider_round_trip() {
        let div = DividerControl::register(8, 3);
        let mut sim = SimRegisters::new();
        let mut w = Window::new(&mut sim, 0);

        assert_eq!(div.max_divisor(), 7);
        // raw 0 reads as a divisor of 1
        assert_eq!(div.ratio(&mut w, &REGS), (1, 1));

        div.program(&mut w, &REGS, 614_400_000, 200_000_000);
        assert_eq!(div.ratio(&mut w, &REGS), (1, 3));
        assert_eq!(w.read(0x54), 3 << 8);
    }

    #[test]
    fn rounding_clamps_to_range() {
        let div = DividerControl::register(0, 2).zero_based();
        assert_eq!(div.max_divisor(), 4);
        assert_eq!(div.round_divided(1_000_000, 1), 250_000);
        assert_eq!(div.round_divided(1_000_000, 0), 250_000);
        assert_eq!(div.round_divided(1_000_000, 5_000_000), 1_000_000);
        assert_eq!(div.round_divided(1_000_000, 340_000), 333_333);
    }

    #[test]
    fn divisor_is_the_rounded_quotient() {
        let div = DividerControl::register(0, 3);
        // 245 / 100 rounds to 2, even though 3 lands nearer the target
        assert_eq!(div.round_divided(245_000_000, 100_000_000), 122_500_000);
        // exactly halfway rounds up
        assert_eq!(div.round_divided(250_000_000, 100_000_000), 83_333_333);

        let mut sim = SimRegisters::new();
        let mut w = Window::new(&mut sim, 0);
        div.program(&mut w, &REGS, 245_000_000, 100_000_000);
        assert_eq!(div.ratio(&mut w, &REGS), (1, 2));
    }

    #[test]
    fn two_register_split() {
        let div = DividerControl::two_register(Field::new(1, 4), Field::new(0, 2));
        assert_eq!(div.max_divisor(), 63);
        let mut sim = SimRegisters::new();
        let mut w = Window::new(&mut sim, 0);

        // 1000 / 37 = 27.03 -> divisor 37 = 0b10_0101
        div.program(&mut w, &REGS, 1_000_000_000, 27_027_027);
        assert_eq!(w.read(0x54), 0b0101 << 1);
        assert_eq!(w.read(0x58), 0b10);
        assert_eq!(div.ratio(&mut w, &REGS), (1, 37));
    }

    #[test]
    fn fixed_divider_reads_nothing() {
        let div = DividerControl::fixed(3, 16);
        let mut sim = SimRegisters::new().recording();
        let mut w = Window::new(&mut sim, 0);
        assert_eq!(div.ratio(&mut w, &REGS), (3, 16));
        assert_eq!(div.round_divided(307_200_000, 1), 57_600_000);
        drop(w);
        assert!(sim.accesses().is_empty());
    }
}
