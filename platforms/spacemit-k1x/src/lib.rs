//! # SpacemiT K1x clock controller
//!
//! The K1x clock tree: crystal oscillators, the fixed PLL1 and its gated
//! outputs, the programmable PLL2 and PLL3, the fractional dividers for the
//! slow UARTs and I2S, and the peripheral clocks spread over the MPMU, APMU,
//! APBC and auxiliary banks. The table covers a representative subset of the
//! controller's peripheral clocks, not all of them.
//!
//! [`probe`] builds a [`ClockRegistry`] for a register-I/O collaborator,
//! registers the whole table and enables the [`BRING_UP`] list:
//!
//! ```rust,ignore
//! let cru = ccu::Cru::new(unsafe { ccu::regs::Mmio::new() });
//! let (mut clocks, report) = ccu_k1x::probe(cru)?;
//! clocks.set_rate(ccu_k1x::ids::SDH0_CLK, 204_800_000)?;
//! ```
#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod ids;
pub mod regs;
mod table;

use alloc::vec::Vec;

use ccu::{
    wait::{Delay, LockWait},
    AddressMap, Bank, BringUpReport, ClockId, ClockRegistry, Cru, RegisterIo,
};
use ccu_config::{BankBase, BringUp, CcuConfig};

pub use self::table::table;

/// Where each register bank is mapped.
pub const ADDRESS_MAP: AddressMap = AddressMap::new()
    .with(Bank::Mpmu, 0xd405_0000)
    .with(Bank::Apmu, 0xd428_2800)
    .with(Bank::Apbc, 0xd401_5000)
    .with(Bank::Apbs, 0xd409_0000)
    .with(Bank::Ciu, 0xd428_2c00)
    .with(Bank::Dciu, 0xd844_0000)
    .with(Bank::Ddrc, 0xc000_0000)
    .with(Bank::AudioCtrl, 0xc088_0000)
    .with(Bank::Apbc2, 0xf061_0000)
    .with(Bank::Rcpu, 0xc088_c000);

/// Clocks that are switched on at probe time whether or not a consumer has
/// asked for them yet.
pub const BRING_UP: &[(&str, ClockId)] = &[
    ("pll1_d2_1228p8", ids::PLL1_D2_1228P8),
    ("pll1_d3_819p2", ids::PLL1_D3_819P2),
    ("pll1_d4_614p4", ids::PLL1_D4_614P4),
    ("pll1_d5_491p52", ids::PLL1_D5_491P52),
    ("pll1_d6_409p6", ids::PLL1_D6_409P6),
    ("pll1_d8_307p2", ids::PLL1_D8_307P2),
    ("cci550_clk", ids::CCI550_CLK),
    ("cpu_c0_core_clk", ids::CPU_C0_CORE_CLK),
    ("pmua_aclk", ids::PMUA_ACLK),
    ("ripc_clk", ids::RIPC_CLK),
    ("gpio_clk", ids::GPIO_CLK),
    ("uart0_clk", ids::UART0_CLK),
];

/// The complete K1x description as a [`CcuConfig`], e.g. for rendering to
/// TOML or postcard.
pub fn config() -> CcuConfig {
    CcuConfig {
        banks: ADDRESS_MAP
            .iter()
            .map(|(bank, base)| BankBase { bank, base })
            .collect(),
        clocks: table(),
        bring_up: BRING_UP
            .iter()
            .map(|&(name, id)| BringUp {
                name: name.into(),
                id,
            })
            .collect::<Vec<_>>(),
        lock_wait: LockWait::DEFAULT,
    }
}

/// Builds the K1x registry over `cru`, registers every clock and enables
/// the bring-up list.
///
/// Bring-up problems do not fail the probe; they are returned in the
/// report.
pub fn probe<Io: RegisterIo, D: Delay>(
    cru: Cru<Io, D>,
) -> Result<(ClockRegistry<Io, D>, BringUpReport), ccu::Error> {
    let (registry, report) = config().probe(cru)?;
    if !report.is_clean() {
        tracing::warn!(
            failed = report.failed.len(),
            skipped = report.diagnostics.len(),
            "K1x clock bring-up incomplete"
        );
    }
    Ok((registry, report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_bank_is_mapped() {
        for bank in Bank::ALL {
            assert!(ADDRESS_MAP.base(bank).is_some(), "{bank:?} unmapped");
        }
        assert_eq!(config().banks.len(), Bank::ALL.len());
    }

    #[test]
    fn bring_up_names_match_ids() {
        let table = table();
        for &(name, id) in BRING_UP {
            let desc = table.iter().find(|desc| desc.id == id).unwrap();
            assert_eq!(desc.name, name);
        }
    }
}
