//! Clock node types.
//!
//! Each node variant is assembled from a handful of register-level building
//! blocks, one per capability:
//!
//! | capability               | block              | trait                   |
//! |--------------------------|--------------------|-------------------------|
//! | on/off                   | [`GateControl`]    | [`Gateable`]            |
//! | integer or fixed ratio   | [`DividerControl`] | [`Divisible`]           |
//! | parent selection         | [`MuxControl`]     | [`Muxable`]             |
//! | table-driven num/den     | [`DdnControl`]     | [`FractionalDivisible`] |
//! | PLL tuning + lock status | [`PllControl`]     | [`PllControllable`]     |
//!
//! The blocks only ever see a [`Window`] onto the node's bank, handed out
//! while the registry lock is held. The node variants ([`Mix`], [`Ddn`],
//! [`Pll`], [`FixedRate`], [`Factor`]) combine blocks and implement
//! [`ClockOps`], the operation set the rate-tree framework drives.
//! [`NodeKind`] is the sum of all variants, as it appears in a clock table.
use serde::{Deserialize, Serialize};

use crate::{
    cru::Hw,
    regs::{Bank, RegisterIo, Window},
    wait::Delay,
    Error,
};

mod ddn;
mod div;
mod fixed;
mod gate;
mod mix;
mod mux;
mod pll;

pub use self::{
    ddn::{Ddn, DdnControl, DdnInfo},
    div::{DividerControl, DividerEncoding},
    fixed::{Factor, FixedRate},
    gate::GateControl,
    mix::Mix,
    mux::MuxControl,
    pll::{LockStatus, Pll, PllControl, PllEntry},
};

/// Register offsets of a node within its bank.
///
/// What each register holds depends on the node type: `ctrl` is the main
/// control register (gate, divider and mux fields), `sel` a sibling register
/// (high divider bits, or a DDN node's gate), `xtc` an extra control
/// register (the third PLL tuning register). `fc` is the node's
/// frequency-change bit, if it has one.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Regs {
    pub bank: Bank,
    pub ctrl: u32,
    #[serde(default)]
    pub sel: u32,
    #[serde(default)]
    pub xtc: u32,
    #[serde(default)]
    pub fc: Option<u32>,
}

impl Regs {
    #[must_use]
    pub const fn new(bank: Bank, ctrl: u32) -> Self {
        Self {
            bank,
            ctrl,
            sel: 0,
            xtc: 0,
            fc: None,
        }
    }

    #[must_use]
    pub const fn with_sel(self, sel: u32) -> Self {
        Self { sel, ..self }
    }

    #[must_use]
    pub const fn with_xtc(self, xtc: u32) -> Self {
        Self { xtc, ..self }
    }

    #[must_use]
    pub const fn with_fc(self, fc_bit: u32) -> Self {
        Self {
            fc: Some(fc_bit),
            ..self
        }
    }
}

/// On/off control bits.
pub trait Gateable {
    /// Enables the gate held in the register at `offset`. Idempotent.
    fn gate_on(&self, w: &mut Window<'_>, offset: u32);
    /// Disables the gate held in the register at `offset`. Idempotent.
    fn gate_off(&self, w: &mut Window<'_>, offset: u32);
    fn gate_is_on(&self, w: &mut Window<'_>, offset: u32) -> bool;
}

/// Integer (or fixed rational) dividers.
pub trait Divisible {
    /// The current `(mul, div)` ratio. `div` is never zero.
    fn ratio(&self, w: &mut Window<'_>, regs: &Regs) -> (u32, u32);
    /// The rate closest to `target` this divider can produce from `parent`.
    fn round_divided(&self, parent: u64, target: u64) -> u64;
    /// Programs the divisor [`Divisible::round_divided`] would pick.
    fn program(&self, w: &mut Window<'_>, regs: &Regs, parent: u64, target: u64);
}

/// Parent selection.
pub trait Muxable {
    fn parent_index(&self, w: &mut Window<'_>, regs: &Regs) -> usize;
    /// Selects parent `index`. Returns `false`, without touching the
    /// register, if `index` cannot be encoded.
    fn select(&self, w: &mut Window<'_>, regs: &Regs, index: usize) -> bool;
}

/// Table-driven numerator/denominator dividers.
pub trait FractionalDivisible {
    fn recalc_fractional(&self, w: &mut Window<'_>, regs: &Regs, parent: u64) -> u64;
    fn round_fractional(&self, parent: u64, target: u64) -> u64;
    fn program_fractional(&self, w: &mut Window<'_>, regs: &Regs, parent: u64, target: u64);
}

/// PLL tuning tables.
pub trait PllControllable {
    /// Index of the table entry for exactly `rate`.
    fn entry_for(&self, rate: u64) -> Option<usize>;
    fn rate_of(&self, index: usize) -> Option<u64>;
    /// Writes the tuning values of entry `index`.
    fn program_entry(&self, w: &mut Window<'_>, regs: &Regs, index: usize);
    /// Matches the tuning registers against the table.
    fn decode_entry(&self, w: &mut Window<'_>, regs: &Regs) -> Option<usize>;
}

/// The operations the rate-tree framework drives on a node.
///
/// Every register access goes through `hw`, which takes the registry lock
/// for the duration of each transaction.
pub trait ClockOps {
    fn recalc_rate<Io: RegisterIo, D: Delay>(&self, hw: &Hw<'_, Io, D>, parent_rate: u64) -> u64;

    fn round_rate<Io: RegisterIo, D: Delay>(
        &self,
        hw: &Hw<'_, Io, D>,
        parent_rate: u64,
        target: u64,
    ) -> u64;

    fn set_rate<Io: RegisterIo, D: Delay>(
        &mut self,
        hw: &Hw<'_, Io, D>,
        parent_rate: u64,
        target: u64,
    ) -> Result<(), Error>;

    fn enable<Io: RegisterIo, D: Delay>(&self, _hw: &Hw<'_, Io, D>) -> Result<(), Error> {
        Ok(())
    }

    fn disable<Io: RegisterIo, D: Delay>(&self, _hw: &Hw<'_, Io, D>) {}

    /// Nodes without a gate are always on.
    fn is_enabled<Io: RegisterIo, D: Delay>(&self, _hw: &Hw<'_, Io, D>) -> bool {
        true
    }

    fn has_gate(&self) -> bool {
        false
    }

    fn parent_index<Io: RegisterIo, D: Delay>(&self, _hw: &Hw<'_, Io, D>) -> usize {
        0
    }

    fn set_parent_index<Io: RegisterIo, D: Delay>(
        &self,
        hw: &Hw<'_, Io, D>,
        index: usize,
    ) -> Result<(), Error> {
        if index == 0 {
            Ok(())
        } else {
            Err(Error::InvalidParent {
                name: hw.name().into(),
                index,
            })
        }
    }
}

/// A clock node, as declared in a clock table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    FixedRate(FixedRate),
    Factor(Factor),
    Mix(Mix),
    Ddn(Ddn),
    Pll(Pll),
}

macro_rules! dispatch {
    ($self:expr, $node:ident => $body:expr) => {
        match $self {
            NodeKind::FixedRate($node) => $body,
            NodeKind::Factor($node) => $body,
            NodeKind::Mix($node) => $body,
            NodeKind::Ddn($node) => $body,
            NodeKind::Pll($node) => $body,
        }
    };
}

impl NodeKind {
    /// The bank holding the node's registers, if it has any.
    pub fn bank(&self) -> Option<Bank> {
        match self {
            Self::FixedRate(_) | Self::Factor(_) => None,
            Self::Mix(Mix { regs, .. }) | Self::Ddn(Ddn { regs, .. }) | Self::Pll(Pll { regs, .. }) => {
                Some(regs.bank)
            }
        }
    }

    /// The bank holding a PLL's lock-status register.
    pub fn lock_bank(&self) -> Option<Bank> {
        match self {
            Self::Pll(pll) => Some(pll.lock.bank),
            _ => None,
        }
    }

    /// Checks the invariants an entry must hold before it can be built.
    /// `parents` is the number of parents the entry declares.
    pub fn validate(&self, parents: usize) -> Result<(), &'static str> {
        match self {
            Self::FixedRate(_) => Ok(()),
            Self::Factor(Factor { div: 0, .. }) => Err("fixed divisor is zero"),
            Self::Factor(_) => Ok(()),
            Self::Mix(mix) => mix.validate(parents),
            Self::Ddn(ddn) => ddn.ddn.validate(),
            Self::Pll(pll) if pll.pll.table.is_empty() => Err("PLL rate table is empty"),
            Self::Pll(_) => Ok(()),
        }
    }

    #[must_use]
    pub fn is_pll(&self) -> bool {
        matches!(self, Self::Pll(_))
    }

    /// For nodes whose rate is a fixed ratio of their parent's, that ratio as
    /// `(mul, div)`. Such nodes can only change rate by changing their
    /// parent's.
    pub fn fixed_ratio(&self) -> Option<(u32, u32)> {
        match self {
            Self::Factor(Factor { mul, div }) => Some((*mul, *div)),
            Self::Mix(Mix { div: None, .. }) => Some((1, 1)),
            Self::Mix(Mix {
                div: Some(DividerControl::Fixed { mul, div }),
                ..
            }) => Some((*mul, *div)),
            _ => None,
        }
    }
}

impl ClockOps for NodeKind {
    fn recalc_rate<Io: RegisterIo, D: Delay>(&self, hw: &Hw<'_, Io, D>, parent_rate: u64) -> u64 {
        dispatch!(self, n => n.recalc_rate(hw, parent_rate))
    }

    fn round_rate<Io: RegisterIo, D: Delay>(
        &self,
        hw: &Hw<'_, Io, D>,
        parent_rate: u64,
        target: u64,
    ) -> u64 {
        dispatch!(self, n => n.round_rate(hw, parent_rate, target))
    }

    fn set_rate<Io: RegisterIo, D: Delay>(
        &mut self,
        hw: &Hw<'_, Io, D>,
        parent_rate: u64,
        target: u64,
    ) -> Result<(), Error> {
        dispatch!(self, n => n.set_rate(hw, parent_rate, target))
    }

    fn enable<Io: RegisterIo, D: Delay>(&self, hw: &Hw<'_, Io, D>) -> Result<(), Error> {
        dispatch!(self, n => n.enable(hw))
    }

    fn disable<Io: RegisterIo, D: Delay>(&self, hw: &Hw<'_, Io, D>) {
        dispatch!(self, n => n.disable(hw))
    }

    fn is_enabled<Io: RegisterIo, D: Delay>(&self, hw: &Hw<'_, Io, D>) -> bool {
        dispatch!(self, n => n.is_enabled(hw))
    }

    fn has_gate(&self) -> bool {
        dispatch!(self, n => n.has_gate())
    }

    fn parent_index<Io: RegisterIo, D: Delay>(&self, hw: &Hw<'_, Io, D>) -> usize {
        dispatch!(self, n => n.parent_index(hw))
    }

    fn set_parent_index<Io: RegisterIo, D: Delay>(
        &self,
        hw: &Hw<'_, Io, D>,
        index: usize,
    ) -> Result<(), Error> {
        dispatch!(self, n => n.set_parent_index(hw, index))
    }
}
