//! # Clock controller description and composition
//!
//! This crate models the clock tree of a SoC clock controller unit (CCU) as
//! a set of typed nodes over a register-I/O collaborator, and composes a
//! declarative table of them into a rate tree.
//!
//! ## Nodes
//!
//! A clock node is one of the variants of [`node::NodeKind`]:
//!
//! * [`node::FixedRate`] and [`node::Factor`]: registerless root clocks and
//!   fixed ratios.
//! * [`node::Mix`]: any combination of gate, divider and mux sharing a
//!   control register, with an optional frequency-change ("FC") bit pulsed
//!   after divider and mux changes.
//! * [`node::Ddn`]: a table-driven numerator/denominator divider for
//!   derived low-rate clocks, optionally gated through a sibling register.
//! * [`node::Pll`]: a PLL with an exact-match rate table and a lock-status
//!   bit.
//!
//! All of them implement [`node::ClockOps`]: `recalc_rate`, `round_rate`,
//! `set_rate`, `enable`, `disable` and `is_enabled`, plus parent selection.
//!
//! ## Registers and locking
//!
//! Nodes never see absolute addresses. Each declares a [`regs::Bank`]; the
//! registry resolves banks to base addresses from an [`regs::AddressMap`]
//! when it is built. Every register access goes through a [`RegisterIo`]
//! implementation ([`regs::Mmio`] on hardware, [`sim::SimRegisters`] in
//! tests and on the host) guarded by a single lock, the [`Cru`].
//!
//! ## The registry
//!
//! A [`ClockRegistry`] is built from a clock table ([`ClockDesc`]s). The
//! build rejects duplicate or sparse ids, duplicate names, unknown parents
//! and unmapped banks. It also rejects broken nodes (zero divisors, empty
//! rate tables, muxes too narrow for their parents) and parent cycles.
//! [`ClockRegistry::register_all`] registers every node with the
//! rate-tree [`framework::Framework`] (all or nothing), and
//! [`ClockRegistry::enable_bring_up_set`] enables a fixed list of clocks,
//! skipping unknown ids. Consumers then use the registry for rates, parent
//! changes and reference-counted enables.
#![cfg_attr(not(any(feature = "std", test)), no_std)]

extern crate alloc;

pub mod cru;
mod error;
pub mod framework;
pub mod node;
pub mod rate;
pub mod registry;
pub mod regs;
pub mod sim;
pub mod table;
pub mod wait;

#[cfg(test)]
pub(crate) mod test_util;

pub use self::{
    cru::Cru,
    error::Error,
    registry::{BringUpReport, ClockRegistry, NodeState},
    regs::{AddressMap, Bank, RegisterIo},
    table::{ClkFlags, ClockDesc, ClockId},
};
