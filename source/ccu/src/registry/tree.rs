//! Consumer operations on a registered clock tree.
use alloc::{string::String, vec::Vec};
use core::fmt;

use super::{registered_mut, ClockRegistry, NodeState, Slot};
use crate::{
    cru::Hw,
    framework::Framework,
    node::ClockOps,
    rate,
    regs::RegisterIo,
    table::{ClkFlags, ClockId},
    wait::Delay,
    Error,
};

impl<Io: RegisterIo, D: Delay, F: Framework> ClockRegistry<Io, D, F> {
    /// The parent currently feeding `slot`, or `None` for a root clock.
    fn current_parent(&self, slot: &Slot) -> Result<Option<ClockId>, Error> {
        if slot.parent_ids.is_empty() {
            return Ok(None);
        }
        let index = slot.desc.kind.parent_index(&self.hw(slot));
        match slot.parent_ids.get(index) {
            Some(&parent) => Ok(Some(parent)),
            None => Err(Error::InvalidParent {
                name: slot.desc.name.clone(),
                index,
            }),
        }
    }

    fn parent_rate(&self, parent: Option<ClockId>) -> Result<u64, Error> {
        match parent {
            Some(parent) => self.rate(parent),
            None => Ok(0),
        }
    }

    /// The current rate of `id`, recalculated from the hardware all the way
    /// up to the root.
    pub fn rate(&self, id: ClockId) -> Result<u64, Error> {
        let slot = self.registered(id)?;
        let parent_rate = self.parent_rate(self.current_parent(slot)?)?;
        Ok(slot.desc.kind.recalc_rate(&self.hw(slot), parent_rate))
    }

    /// The rate `id` would run at if asked for `target`.
    ///
    /// For fractional dividers this is advisory: `set_rate` may program a
    /// neighbouring table entry. Read the rate back with [`Self::rate`].
    pub fn round_rate(&self, id: ClockId, target: u64) -> Result<u64, Error> {
        let slot = self.registered(id)?;
        let parent = self.current_parent(slot)?;
        if let (Some(parent), Some((mul, div)), true) = (
            parent,
            slot.desc.kind.fixed_ratio(),
            slot.desc.flags.get(ClkFlags::SET_RATE_PARENT),
        ) {
            let parent_rate = self.round_rate(parent, parent_target(target, mul, div))?;
            return Ok(rate::child_rate(parent_rate, mul, div));
        }
        let parent_rate = self.parent_rate(parent)?;
        Ok(slot.desc.kind.round_rate(&self.hw(slot), parent_rate, target))
    }

    #[tracing::instrument(level = "debug", name = "ClockRegistry::set_rate", skip(self))]
    pub fn set_rate(&mut self, id: ClockId, target: u64) -> Result<(), Error> {
        let slot = self.registered(id)?;
        let flags = slot.desc.flags;
        if flags.get(ClkFlags::SET_RATE_GATE) && slot.enable_count > 0 {
            return Err(Error::Busy {
                name: slot.desc.name.clone(),
            });
        }
        let parent = self.current_parent(slot)?;
        if let (Some(parent), Some((mul, div)), true) = (
            parent,
            slot.desc.kind.fixed_ratio(),
            flags.get(ClkFlags::SET_RATE_PARENT),
        ) {
            tracing::debug!(clock = %slot.desc.name, %parent, "forwarding rate change to parent");
            return self.set_rate(parent, parent_target(target, mul, div));
        }
        let parent_rate = self.parent_rate(parent)?;

        let slot = registered_mut(&mut self.slots, id)?;
        let hw = Hw::new(&self.cru, &slot.desc.name, slot.base).with_lock_base(slot.lock_base);
        let prev = slot.state;
        if slot.desc.kind.is_pll() {
            slot.state = NodeState::Locking;
        }
        let result = slot.desc.kind.set_rate(&hw, parent_rate, target);
        slot.state = prev;
        if let Err(error) = &result {
            tracing::warn!(clock = %slot.desc.name, target, %error, "rate change failed");
        }
        result
    }

    pub fn parent(&self, id: ClockId) -> Result<Option<ClockId>, Error> {
        self.current_parent(self.registered(id)?)
    }

    /// Reparents `id` onto the parent named `parent`.
    ///
    /// If `id` is enabled, the new parent is enabled before the switch and the
    /// old one released after it.
    #[tracing::instrument(level = "debug", name = "ClockRegistry::set_parent", skip(self))]
    pub fn set_parent(&mut self, id: ClockId, parent: &str) -> Result<(), Error> {
        let slot = self.registered(id)?;
        let Some(index) = slot.desc.parents.iter().position(|p| p == parent) else {
            return Err(Error::UnknownParent {
                name: slot.desc.name.clone(),
                parent: parent.into(),
            });
        };
        let new = slot.parent_ids[index];
        let old = self.current_parent(slot).ok().flatten();
        if old == Some(new) {
            return Ok(());
        }
        let enabled = slot.enable_count > 0;
        if enabled && slot.desc.flags.get(ClkFlags::SET_PARENT_GATE) {
            return Err(Error::Busy {
                name: slot.desc.name.clone(),
            });
        }

        if enabled {
            self.prepare_enable(new)?;
        }
        let slot = self.registered(id)?;
        let result = slot.desc.kind.set_parent_index(&self.hw(slot), index);
        let release = match (&result, enabled) {
            (Ok(()), true) => old,
            (Err(_), true) => Some(new),
            (_, false) => None,
        };
        if let Some(release) = release {
            self.disable_unprepare(release)?;
        }
        result
    }

    /// Takes an enable reference on `id`. The first reference enables the
    /// parent chain, root first, then the clock itself.
    #[tracing::instrument(level = "debug", name = "ClockRegistry::prepare_enable", skip(self))]
    pub fn prepare_enable(&mut self, id: ClockId) -> Result<(), Error> {
        let slot = self.registered(id)?;
        if slot.enable_count == 0 {
            let parent = self.current_parent(slot)?;
            if let Some(parent) = parent {
                self.prepare_enable(parent)?;
            }

            let slot = registered_mut(&mut self.slots, id)?;
            let hw = Hw::new(&self.cru, &slot.desc.name, slot.base).with_lock_base(slot.lock_base);
            let prev = slot.state;
            if slot.desc.kind.is_pll() {
                slot.state = NodeState::Locking;
            }
            if let Err(error) = slot.desc.kind.enable(&hw) {
                slot.state = prev;
                tracing::warn!(clock = %slot.desc.name, %error, "enable failed");
                if let Some(parent) = parent {
                    self.disable_unprepare(parent)?;
                }
                return Err(error);
            }
            tracing::trace!(clock = %slot.desc.name, "enabled");
        }

        let slot = registered_mut(&mut self.slots, id)?;
        slot.enable_count += 1;
        slot.state = NodeState::Enabled;
        Ok(())
    }

    /// Drops an enable reference on `id`. The last reference disables the
    /// clock, then releases its parent.
    #[tracing::instrument(level = "debug", name = "ClockRegistry::disable_unprepare", skip(self))]
    pub fn disable_unprepare(&mut self, id: ClockId) -> Result<(), Error> {
        let slot = registered_mut(&mut self.slots, id)?;
        if slot.enable_count == 0 {
            tracing::warn!(clock = %slot.desc.name, "unbalanced disable");
            return Ok(());
        }
        slot.enable_count -= 1;
        if slot.enable_count > 0 {
            return Ok(());
        }
        let hw = Hw::new(&self.cru, &slot.desc.name, slot.base).with_lock_base(slot.lock_base);
        slot.desc.kind.disable(&hw);
        slot.state = NodeState::Disabled;
        tracing::trace!(clock = %slot.desc.name, "disabled");

        let parent = self.current_parent(self.registered(id)?).ok().flatten();
        if let Some(parent) = parent {
            self.disable_unprepare(parent)?;
        }
        Ok(())
    }

    /// Whether the hardware reports `id` as running.
    pub fn is_enabled(&self, id: ClockId) -> Result<bool, Error> {
        let slot = self.registered(id)?;
        Ok(slot.desc.kind.is_enabled(&self.hw(slot)))
    }

    /// Gates off every registered clock that is running without anyone
    /// holding a reference to it, walking in reverse id order. Clocks flagged
    /// `IGNORE_UNUSED` are left alone. Returns the clocks disabled.
    #[tracing::instrument(level = "debug", name = "ClockRegistry::disable_unused", skip(self))]
    pub fn disable_unused(&mut self) -> Vec<ClockId> {
        let mut disabled = Vec::new();
        for slot in self.slots.iter_mut().rev().flatten() {
            if !slot.is_registered()
                || slot.enable_count > 0
                || slot.desc.flags.get(ClkFlags::IGNORE_UNUSED)
                || !slot.desc.kind.has_gate()
            {
                continue;
            }
            let hw = Hw::new(&self.cru, &slot.desc.name, slot.base).with_lock_base(slot.lock_base);
            if !slot.desc.kind.is_enabled(&hw) {
                continue;
            }
            tracing::debug!(clock = %slot.desc.name, "disabling unused clock");
            slot.desc.kind.disable(&hw);
            slot.state = NodeState::Disabled;
            disabled.push(slot.desc.id);
        }
        tracing::info!(count = disabled.len(), "disabled unused clocks");
        disabled
    }

    /// A snapshot of the registered tree: each root followed by its
    /// descendants, depth first.
    pub fn summary(&self) -> Summary {
        let registered: Vec<&Slot> = self.slots.iter().flatten().filter(|s| s.is_registered()).collect();
        let parents: Vec<Option<ClockId>> = registered
            .iter()
            .map(|slot| {
                self.current_parent(slot)
                    .ok()
                    .flatten()
                    .filter(|&parent| self.is_registered(parent))
            })
            .collect();

        let mut rows = Vec::with_capacity(registered.len());
        let mut stack: Vec<(usize, usize)> = (0..registered.len())
            .rev()
            .filter(|&i| parents[i].is_none())
            .map(|i| (i, 0))
            .collect();
        while let Some((i, depth)) = stack.pop() {
            let slot = registered[i];
            rows.push(SummaryRow {
                depth,
                id: slot.desc.id,
                name: slot.desc.name.clone(),
                enable_count: slot.enable_count,
                enabled: slot.desc.kind.is_enabled(&self.hw(slot)),
                rate: self.rate(slot.desc.id).ok(),
            });
            let id = slot.desc.id;
            stack.extend(
                (0..registered.len())
                    .rev()
                    .filter(|&child| parents[child] == Some(id))
                    .map(|child| (child, depth + 1)),
            );
        }
        Summary { rows }
    }
}

/// The parent rate needed for a fixed `mul/div` child to reach `target`.
fn parent_target(target: u64, mul: u32, div: u32) -> u64 {
    (target as u128 * div as u128 / mul.max(1) as u128) as u64
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SummaryRow {
    pub depth: usize,
    pub id: ClockId,
    pub name: String,
    pub enable_count: u32,
    /// As reported by the hardware.
    pub enabled: bool,
    /// `None` if the rate could not be recalculated.
    pub rate: Option<u64>,
}

/// Tree listing in the style of the Linux `clk_summary` debugfs file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub rows: Vec<SummaryRow>,
}

impl Summary {
    const NAME_WIDTH: usize = 40;
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<w$} {:>6} {:>8} {:>14}",
            "clock",
            "enable",
            "hw",
            "rate (Hz)",
            w = Self::NAME_WIDTH
        )?;
        writeln!(f, "{:-<1$}", "", Self::NAME_WIDTH + 31)?;
        for row in &self.rows {
            let indent = row.depth * 2;
            let name_width = Self::NAME_WIDTH.saturating_sub(indent);
            write!(
                f,
                "{:indent$}{:<name_width$} {:>6} {:>8} ",
                "",
                row.name,
                row.enable_count,
                if row.enabled { "Y" } else { "N" },
            )?;
            match row.rate {
                Some(rate) => writeln!(f, "{rate:>14}")?,
                None => writeln!(f, "{:>14}", "?")?,
            }
        }
        Ok(())
    }
}
