//! # Clock table configuration
//!
//! A clock table can be compiled in (see the `ccu-k1x` platform crate), or
//! described declaratively in TOML and loaded on the host with
//! [`buildtime::load`]:
//!
//! ```rust,ignore
//! let config = ccu_config::buildtime::load("tables/minimal.toml")?;
//! let (registry, report) = config.probe(cru)?;
//! ```
//!
//! A validated table can be rendered to postcard with
//! [`buildtime::to_postcard`] and read back, without `std`, by
//! [`runtime::from_postcard`]. [`buildtime::load`] accepts both forms and
//! picks by file extension.

#![cfg_attr(not(any(feature = "use-std", test)), no_std)]

extern crate alloc;

use alloc::{string::String, vec::Vec};

use ccu::{
    wait::{Delay, LockWait},
    AddressMap, Bank, BringUpReport, ClockDesc, ClockId, ClockRegistry, Cru, RegisterIo,
};
use serde::{Deserialize, Serialize};

/// A complete controller description: where its banks are mapped, its
/// clocks, and which clocks to enable at bring-up.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CcuConfig {
    pub banks: Vec<BankBase>,
    pub clocks: Vec<ClockDesc>,
    #[serde(default)]
    pub bring_up: Vec<BringUp>,
    #[serde(default)]
    pub lock_wait: LockWait,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BankBase {
    pub bank: Bank,
    pub base: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BringUp {
    pub name: String,
    pub id: ClockId,
}

impl CcuConfig {
    pub fn address_map(&self) -> AddressMap {
        let mut map = AddressMap::new();
        for &BankBase { bank, base } in &self.banks {
            map.set(bank, base);
        }
        map
    }

    pub fn bring_up_list(&self) -> impl Iterator<Item = (&str, ClockId)> + '_ {
        self.bring_up.iter().map(|b| (b.name.as_str(), b.id))
    }

    /// Builds a registry for this table, applying the configured lock-wait
    /// settings to `cru`. No registers are touched.
    pub fn build<Io: RegisterIo, D: Delay>(
        &self,
        cru: Cru<Io, D>,
    ) -> Result<ClockRegistry<Io, D>, ccu::Error> {
        ClockRegistry::build(
            cru.with_lock_wait(self.lock_wait),
            &self.address_map(),
            self.clocks.iter().cloned(),
        )
    }

    /// Builds a registry, registers every clock and enables the bring-up
    /// list.
    pub fn probe<Io: RegisterIo, D: Delay>(
        &self,
        cru: Cru<Io, D>,
    ) -> Result<(ClockRegistry<Io, D>, BringUpReport), ccu::Error> {
        let mut registry = self.build(cru)?;
        tracing::info!(clocks = self.clocks.len(), bring_up = self.bring_up.len(), "probing clock table");
        registry.register_all()?;
        let report = registry.enable_bring_up_set(self.bring_up_list());
        Ok((registry, report))
    }
}

/// Tools intended for use in host tools and tests
#[cfg(any(feature = "use-std", test))]
pub mod buildtime {
    use std::{fs, path::Path};

    use super::*;
    use miette::{Context, IntoDiagnostic, Result};

    pub fn from_toml(s: &str) -> Result<CcuConfig> {
        toml::from_str(s).into_diagnostic()
    }

    pub fn to_postcard(config: &CcuConfig) -> Result<Vec<u8>> {
        postcard::to_allocvec(config).into_diagnostic()
    }

    /// Reads and parses a clock table. Files ending in `.postcard` are
    /// decoded as postcard, anything else is parsed as TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<CcuConfig> {
        let path = path.as_ref();
        let read_err = || format!("Failed to read clock table '{}'", path.display());
        let parse_err = || format!("Failed to parse clock table '{}'", path.display());
        if path.extension().is_some_and(|ext| ext == "postcard") {
            let bytes = fs::read(path).into_diagnostic().wrap_err_with(read_err)?;
            return runtime::from_postcard(&bytes)
                .map_err(|error| miette::miette!("{error}"))
                .wrap_err_with(parse_err);
        }
        let text = fs::read_to_string(path).into_diagnostic().wrap_err_with(read_err)?;
        from_toml(&text).wrap_err_with(parse_err)
    }

    /// Builds the table against a simulated register file, reporting any
    /// table error.
    pub fn validate(config: &CcuConfig) -> Result<()> {
        let cru = Cru::new(ccu::sim::SimRegisters::new());
        config
            .build(cru)
            .map(drop)
            .map_err(|error| miette::miette!("{error}"))
            .wrap_err("Invalid clock table")
    }
}

/// Tools intended for use at runtime
pub mod runtime {
    use crate::CcuConfig;

    #[derive(Debug, PartialEq)]
    pub enum Error {
        Postcard(postcard::Error),
    }

    impl core::fmt::Display for Error {
        fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
            match self {
                Self::Postcard(error) => write!(f, "invalid postcard table: {error}"),
            }
        }
    }

    pub fn from_postcard(s: &[u8]) -> Result<CcuConfig, Error> {
        postcard::from_bytes(s).map_err(Error::Postcard)
    }
}
