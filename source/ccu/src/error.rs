use alloc::{string::String, vec::Vec};
use core::fmt;

use crate::{regs::Bank, ClockId};

/// Errors returned by node operations and by the registry.
///
/// Every variant names the clock it concerns, so that a failure surfaced to a
/// consumer can be traced back to the table entry and operation involved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// A node could not be registered with the rate-tree framework. Every
    /// node registered before it in the same pass has been unwound.
    RegistrationFailed { name: String },
    /// `set_rate` asked for a rate that is not in the node's exact-match
    /// table.
    UnsupportedRate { name: String, rate: u64 },
    /// A PLL did not report lock within the bounded poll window.
    LockTimeout { name: String },
    /// The parent-name graph contains a cycle. The path starts and ends with
    /// the same clock.
    CyclicGraph { path: Vec<String> },
    /// A bring-up list entry names an id with no registered node. Reported as
    /// a diagnostic only; bring-up carries on.
    UnknownBringUpId(ClockId),
    /// Two table entries share an id.
    DuplicateId(ClockId),
    /// Two table entries share a name.
    DuplicateName(String),
    /// A node names a parent that is not in the table.
    UnknownParent { name: String, parent: String },
    /// A node lives in a register bank the address map has no base for.
    MissingBank { name: String, bank: Bank },
    /// No clock with this name.
    UnknownClock(String),
    /// The id is not a registered node.
    NotRegistered(ClockId),
    /// A parent index outside the node's declared parents.
    InvalidParent { name: String, index: usize },
    /// The operation is gated by a flag (`SET_RATE_GATE`/`SET_PARENT_GATE`)
    /// and the clock is currently enabled.
    Busy { name: String },
    /// A table entry breaks a node invariant, e.g. a zero divisor or an
    /// empty rate table.
    InvalidTable { name: String, reason: &'static str },
    /// Clock ids must be dense: every id is below the number of clocks in
    /// the table.
    IdOutOfRange { name: String, id: ClockId, clocks: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RegistrationFailed { name } => {
                write!(f, "failed to register clock '{name}'")
            }
            Self::UnsupportedRate { name, rate } => {
                write!(f, "clock '{name}' does not support a rate of {rate} Hz")
            }
            Self::LockTimeout { name } => write!(f, "PLL '{name}' did not lock"),
            Self::CyclicGraph { path } => {
                f.write_str("clock parent graph contains a cycle: ")?;
                for (i, name) in path.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" -> ")?;
                    }
                    f.write_str(name)?;
                }
                Ok(())
            }
            Self::UnknownBringUpId(id) => write!(f, "bring-up list names unknown clock {id}"),
            Self::DuplicateId(id) => write!(f, "clock {id} is declared more than once"),
            Self::DuplicateName(name) => write!(f, "clock '{name}' is declared more than once"),
            Self::UnknownParent { name, parent } => {
                write!(f, "clock '{name}' names unknown parent '{parent}'")
            }
            Self::MissingBank { name, bank } => {
                write!(f, "clock '{name}' uses bank {bank:?}, which has no base address")
            }
            Self::UnknownClock(name) => write!(f, "no clock named '{name}'"),
            Self::NotRegistered(id) => write!(f, "clock {id} is not registered"),
            Self::InvalidParent { name, index } => {
                write!(f, "clock '{name}' has no parent at index {index}")
            }
            Self::Busy { name } => write!(f, "clock '{name}' is enabled and cannot be changed"),
            Self::InvalidTable { name, reason } => write!(f, "clock '{name}': {reason}"),
            Self::IdOutOfRange { name, id, clocks } => {
                write!(f, "clock '{name}' has id {id}, but the table only has {clocks} clocks")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
