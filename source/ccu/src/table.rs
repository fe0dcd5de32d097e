//! Declarative clock tables.
use alloc::{string::String, vec::Vec};
use core::fmt;

use serde::{Deserialize, Serialize};

use crate::node::{Ddn, Factor, FixedRate, Mix, NodeKind, Pll};

/// Stable numeric identifier of a clock.
///
/// IDs are shared with the clock's consumers, so a platform's IDs are only
/// ever appended to, never renumbered.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClockId(pub u32);

impl ClockId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ClockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

mycelium_bitfield::bitfield! {
    /// Behavioural flags of a clock node.
    #[derive(PartialEq, Eq, Hash)]
    pub struct ClkFlags<u8> {
        /// Rate changes are refused while the clock is enabled.
        pub const SET_RATE_GATE: bool;
        /// Parent changes are refused while the clock is enabled.
        pub const SET_PARENT_GATE: bool;
        /// Rate requests on a fixed-ratio node are forwarded to its parent.
        pub const SET_RATE_PARENT: bool;
        /// Not gated off by the unused-clock sweep.
        pub const IGNORE_UNUSED: bool;
    }
}

impl ClkFlags {
    pub const NONE: Self = Self::new();

    #[must_use]
    pub fn ignore_unused(self) -> Self {
        self.with(Self::IGNORE_UNUSED, true)
    }

    #[must_use]
    pub fn set_rate_parent(self) -> Self {
        self.with(Self::SET_RATE_PARENT, true)
    }

    #[must_use]
    pub fn set_rate_gate(self) -> Self {
        self.with(Self::SET_RATE_GATE, true)
    }

    #[must_use]
    pub fn set_parent_gate(self) -> Self {
        self.with(Self::SET_PARENT_GATE, true)
    }
}

/// Flags by name, as they are written in configuration files.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Flag {
    SetRateGate,
    SetParentGate,
    SetRateParent,
    IgnoreUnused,
}

impl Flag {
    const ALL: [Flag; 4] = [
        Flag::SetRateGate,
        Flag::SetParentGate,
        Flag::SetRateParent,
        Flag::IgnoreUnused,
    ];

    fn is_set(self, flags: ClkFlags) -> bool {
        match self {
            Self::SetRateGate => flags.get(ClkFlags::SET_RATE_GATE),
            Self::SetParentGate => flags.get(ClkFlags::SET_PARENT_GATE),
            Self::SetRateParent => flags.get(ClkFlags::SET_RATE_PARENT),
            Self::IgnoreUnused => flags.get(ClkFlags::IGNORE_UNUSED),
        }
    }

    fn apply(self, flags: ClkFlags) -> ClkFlags {
        match self {
            Self::SetRateGate => flags.set_rate_gate(),
            Self::SetParentGate => flags.set_parent_gate(),
            Self::SetRateParent => flags.set_rate_parent(),
            Self::IgnoreUnused => flags.ignore_unused(),
        }
    }
}

/// (De)serializes [`ClkFlags`] as a list of [`Flag`] names.
mod flag_names {
    use alloc::vec::Vec;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::{ClkFlags, Flag};

    pub(super) fn serialize<S: Serializer>(flags: &ClkFlags, ser: S) -> Result<S::Ok, S::Error> {
        let names: Vec<Flag> = Flag::ALL.into_iter().filter(|f| f.is_set(*flags)).collect();
        names.serialize(ser)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<ClkFlags, D::Error> {
        let names = Vec::<Flag>::deserialize(de)?;
        Ok(names.into_iter().fold(ClkFlags::new(), |flags, f| f.apply(flags)))
    }
}

/// One entry of a clock table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClockDesc {
    pub id: ClockId,
    pub name: String,
    /// Candidate parents by name, in mux-index order. Empty for root clocks.
    #[serde(default)]
    pub parents: Vec<String>,
    #[serde(default = "ClkFlags::new", with = "flag_names")]
    pub flags: ClkFlags,
    pub kind: NodeKind,
}

impl ClockDesc {
    #[must_use]
    pub fn new(id: ClockId, name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id,
            name: name.into(),
            parents: Vec::new(),
            flags: ClkFlags::new(),
            kind,
        }
    }

    #[must_use]
    pub fn fixed_rate(id: ClockId, name: impl Into<String>, rate: u64) -> Self {
        Self::new(id, name, NodeKind::FixedRate(FixedRate::new(rate)))
    }

    #[must_use]
    pub fn factor(id: ClockId, name: impl Into<String>, parent: &str, mul: u32, div: u32) -> Self {
        Self::new(id, name, NodeKind::Factor(Factor::new(mul, div))).parent(parent)
    }

    #[must_use]
    pub fn mix(id: ClockId, name: impl Into<String>, mix: Mix) -> Self {
        Self::new(id, name, NodeKind::Mix(mix))
    }

    #[must_use]
    pub fn ddn(id: ClockId, name: impl Into<String>, ddn: Ddn) -> Self {
        Self::new(id, name, NodeKind::Ddn(ddn))
    }

    #[must_use]
    pub fn pll(id: ClockId, name: impl Into<String>, pll: Pll) -> Self {
        Self::new(id, name, NodeKind::Pll(pll))
    }

    #[must_use]
    pub fn parent(mut self, parent: &str) -> Self {
        self.parents.push(parent.into());
        self
    }

    #[must_use]
    pub fn parents(mut self, parents: &[&str]) -> Self {
        self.parents.extend(parents.iter().map(|&p| String::from(p)));
        self
    }

    #[must_use]
    pub fn flags(mut self, flags: ClkFlags) -> Self {
        self.flags = flags;
        self
    }
}
