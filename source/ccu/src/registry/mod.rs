//! The clock registry.
//!
//! A [`ClockRegistry`] is built once from a clock table and an
//! [`AddressMap`]. Building validates the table (unique ids and names, known
//! parents, mapped banks, no parent cycles) and resolves every node's bank
//! base; it touches no registers. [`ClockRegistry::register_all`] then hands
//! the nodes to the rate-tree [`Framework`], all or nothing, and
//! [`ClockRegistry::enable_bring_up_set`] turns on a fixed list of clocks.
//!
//! Consumer operations (rates, parents, reference-counted enables) are in
//! the `tree` module.
use alloc::{collections::BTreeMap, string::String, vec, vec::Vec};

use crate::{
    cru::{Cru, Hw},
    framework::{ClockTree, Framework, NodeInfo},
    node::ClockOps,
    regs::{AddressMap, RegisterIo},
    table::{ClockDesc, ClockId},
    wait::{Delay, SpinDelay},
    Error,
};

mod tree;
pub use self::tree::{Summary, SummaryRow};

#[cfg(test)]
mod tests;

/// Lifecycle state of a node.
///
/// `Unregistered -> Registered -> {Enabled <-> Disabled}`. PLLs pass through
/// `Locking` while waiting for lock, on `set_rate` and on enable.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NodeState {
    Unregistered,
    Registered,
    Enabled,
    Disabled,
    Locking,
}

/// Outcome of [`ClockRegistry::enable_bring_up_set`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BringUpReport {
    /// Clocks enabled, in list order.
    pub enabled: Vec<ClockId>,
    /// Registered clocks whose enable failed.
    pub failed: Vec<(ClockId, Error)>,
    /// One [`Error::UnknownBringUpId`] per list entry naming no registered
    /// clock.
    pub diagnostics: Vec<Error>,
}

impl BringUpReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.diagnostics.is_empty()
    }
}

struct Slot {
    desc: ClockDesc,
    base: usize,
    lock_base: usize,
    /// `desc.parents`, resolved.
    parent_ids: Vec<ClockId>,
    state: NodeState,
    enable_count: u32,
}

impl Slot {
    fn is_registered(&self) -> bool {
        self.state != NodeState::Unregistered
    }
}

/// The clock tree of one controller.
pub struct ClockRegistry<Io, D = SpinDelay, F = ClockTree> {
    cru: Cru<Io, D>,
    framework: F,
    /// Indexed by id.
    slots: Vec<Option<Slot>>,
    by_name: BTreeMap<String, ClockId>,
}

impl<Io: RegisterIo, D: Delay> ClockRegistry<Io, D, ClockTree> {
    /// Builds a registry using the in-tree [`ClockTree`] framework.
    pub fn build(
        cru: Cru<Io, D>,
        map: &AddressMap,
        table: impl IntoIterator<Item = ClockDesc>,
    ) -> Result<Self, Error> {
        Self::build_with(cru, ClockTree::new(), map, table)
    }
}

impl<Io: RegisterIo, D: Delay, F: Framework> ClockRegistry<Io, D, F> {
    #[tracing::instrument(level = "debug", name = "ClockRegistry::build", skip_all)]
    pub fn build_with(
        cru: Cru<Io, D>,
        framework: F,
        map: &AddressMap,
        table: impl IntoIterator<Item = ClockDesc>,
    ) -> Result<Self, Error> {
        let table: Vec<ClockDesc> = table.into_iter().collect();

        let mut by_name = BTreeMap::new();
        for desc in &table {
            if by_name.insert(desc.name.clone(), desc.id).is_some() {
                return Err(Error::DuplicateName(desc.name.clone()));
            }
            if desc.id.index() >= table.len() {
                return Err(Error::IdOutOfRange {
                    name: desc.name.clone(),
                    id: desc.id,
                    clocks: table.len(),
                });
            }
            desc.kind
                .validate(desc.parents.len())
                .map_err(|reason| Error::InvalidTable {
                    name: desc.name.clone(),
                    reason,
                })?;
        }

        let mut slots: Vec<Option<Slot>> = Vec::new();
        slots.resize_with(table.len(), || None);
        for desc in table {
            let base = match desc.kind.bank() {
                Some(bank) => map.base(bank).ok_or_else(|| Error::MissingBank {
                    name: desc.name.clone(),
                    bank,
                })?,
                None => 0,
            };
            let lock_base = match desc.kind.lock_bank() {
                Some(bank) => map.base(bank).ok_or_else(|| Error::MissingBank {
                    name: desc.name.clone(),
                    bank,
                })?,
                None => base,
            };
            let parent_ids = desc
                .parents
                .iter()
                .map(|parent| {
                    by_name.get(parent).copied().ok_or_else(|| Error::UnknownParent {
                        name: desc.name.clone(),
                        parent: parent.clone(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            let slot = &mut slots[desc.id.index()];
            if slot.is_some() {
                return Err(Error::DuplicateId(desc.id));
            }
            *slot = Some(Slot {
                desc,
                base,
                lock_base,
                parent_ids,
                state: NodeState::Unregistered,
                enable_count: 0,
            });
        }

        if let Some(path) = find_cycle(&slots) {
            return Err(Error::CyclicGraph { path });
        }

        tracing::debug!(clocks = by_name.len(), "clock table validated");
        Ok(Self {
            cru,
            framework,
            slots,
            by_name,
        })
    }

    /// Registers every node with the framework, in id order.
    ///
    /// If any node is refused, every node registered by this call is
    /// disabled and unregistered again, in reverse order, and
    /// [`Error::RegistrationFailed`] names the refused node.
    #[tracing::instrument(level = "debug", name = "ClockRegistry::register_all", skip(self))]
    pub fn register_all(&mut self) -> Result<(), Error> {
        let mut registered = Vec::new();
        let mut failed = None;
        for slot in self.slots.iter_mut().flatten() {
            if slot.is_registered() {
                continue;
            }
            let info = NodeInfo {
                id: slot.desc.id,
                name: &slot.desc.name,
                parents: &slot.desc.parents,
                flags: slot.desc.flags,
            };
            match self.framework.register(&info) {
                Ok(()) => {
                    slot.state = NodeState::Registered;
                    registered.push(slot.desc.id);
                }
                Err(error) => {
                    tracing::warn!(clock = %slot.desc.name, %error, "registration failed");
                    failed = Some(slot.desc.name.clone());
                    break;
                }
            }
        }

        if let Some(name) = failed {
            tracing::warn!(count = registered.len(), "unwinding registered clocks");
            for &id in registered.iter().rev() {
                self.release(id);
            }
            return Err(Error::RegistrationFailed { name });
        }

        tracing::info!(count = registered.len(), "registered clocks");
        Ok(())
    }

    /// Enables each listed clock (and, through reference counting, its
    /// parents).
    ///
    /// Never aborts: ids with no registered node are recorded as
    /// [`Error::UnknownBringUpId`] diagnostics and enable failures are
    /// recorded per clock, and the remaining entries are still processed.
    #[tracing::instrument(level = "debug", name = "ClockRegistry::enable_bring_up_set", skip_all)]
    pub fn enable_bring_up_set<'a>(
        &mut self,
        list: impl IntoIterator<Item = (&'a str, ClockId)>,
    ) -> BringUpReport {
        let mut report = BringUpReport::default();
        for (name, id) in list {
            if !self.is_registered(id) {
                tracing::warn!(clock = name, %id, "bring-up clock is not registered, skipping");
                report.diagnostics.push(Error::UnknownBringUpId(id));
                continue;
            }
            match self.prepare_enable(id) {
                Ok(()) => report.enabled.push(id),
                Err(error) => {
                    tracing::warn!(clock = name, %id, %error, "failed to enable bring-up clock");
                    report.failed.push((id, error));
                }
            }
        }
        tracing::info!(
            enabled = report.enabled.len(),
            failed = report.failed.len(),
            skipped = report.diagnostics.len(),
            "bring-up done"
        );
        report
    }

    /// Disables and unregisters every registered node, in reverse id order.
    #[tracing::instrument(level = "debug", name = "ClockRegistry::unregister_all", skip(self))]
    pub fn unregister_all(&mut self) {
        let ids: Vec<ClockId> = self
            .slots
            .iter()
            .flatten()
            .filter(|slot| slot.is_registered())
            .map(|slot| slot.desc.id)
            .collect();
        for &id in ids.iter().rev() {
            self.release(id);
        }
        tracing::info!(count = ids.len(), "unregistered clocks");
    }

    fn release(&mut self, id: ClockId) {
        let Some(slot) = self.slots.get_mut(id.index()).and_then(Option::as_mut) else {
            return;
        };
        if slot.enable_count > 0 || slot.state == NodeState::Enabled {
            let hw = Hw::new(&self.cru, &slot.desc.name, slot.base).with_lock_base(slot.lock_base);
            slot.desc.kind.disable(&hw);
        }
        self.framework.unregister(id);
        slot.state = NodeState::Unregistered;
        slot.enable_count = 0;
        tracing::trace!(clock = %slot.desc.name, "unregistered");
    }

    pub fn state(&self, id: ClockId) -> Option<NodeState> {
        self.slot(id).map(|slot| slot.state)
    }

    pub fn enable_count(&self, id: ClockId) -> Option<u32> {
        self.slot(id).map(|slot| slot.enable_count)
    }

    pub fn is_registered(&self, id: ClockId) -> bool {
        self.slot(id).is_some_and(Slot::is_registered) && self.framework.is_registered(id)
    }

    /// Finds a registered clock by name.
    pub fn lookup(&self, name: &str) -> Option<ClockId> {
        self.framework.find(name)
    }

    /// Finds a clock in the table by name, registered or not.
    pub fn id_of(&self, name: &str) -> Option<ClockId> {
        self.by_name.get(name).copied()
    }

    pub fn name(&self, id: ClockId) -> Option<&str> {
        self.slot(id).map(|slot| slot.desc.name.as_str())
    }

    pub fn desc(&self, id: ClockId) -> Option<&ClockDesc> {
        self.slot(id).map(|slot| &slot.desc)
    }

    /// The table, in id order.
    pub fn descs(&self) -> impl Iterator<Item = &ClockDesc> + '_ {
        self.slots.iter().flatten().map(|slot| &slot.desc)
    }

    pub fn cru(&self) -> &Cru<Io, D> {
        &self.cru
    }

    pub fn framework(&self) -> &F {
        &self.framework
    }

    fn slot(&self, id: ClockId) -> Option<&Slot> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    /// The slot of a registered node.
    fn registered(&self, id: ClockId) -> Result<&Slot, Error> {
        self.slot(id)
            .filter(|slot| slot.is_registered())
            .ok_or(Error::NotRegistered(id))
    }

    fn hw<'a>(&'a self, slot: &'a Slot) -> Hw<'a, Io, D> {
        Hw::new(&self.cru, &slot.desc.name, slot.base).with_lock_base(slot.lock_base)
    }
}

/// The slot of a registered node, borrowed from the slot array alone so that
/// the registry lock can be borrowed alongside it.
fn registered_mut(slots: &mut [Option<Slot>], id: ClockId) -> Result<&mut Slot, Error> {
    slots
        .get_mut(id.index())
        .and_then(Option::as_mut)
        .filter(|slot| slot.is_registered())
        .ok_or(Error::NotRegistered(id))
}

/// Depth-first search along parent edges. Returns the first cycle found, as
/// a path of names starting and ending at the same clock.
fn find_cycle(slots: &[Option<Slot>]) -> Option<Vec<String>> {
    #[derive(Copy, Clone, PartialEq, Eq)]
    enum Mark {
        New,
        OnPath,
        Done,
    }

    let name = |i: usize| slots[i].as_ref().map(|s| s.desc.name.clone()).unwrap_or_default();
    let mut marks = vec![Mark::New; slots.len()];
    for start in 0..slots.len() {
        if slots[start].is_none() || marks[start] != Mark::New {
            continue;
        }
        // (node, index of the next parent edge to follow)
        let mut path = vec![(start, 0usize)];
        marks[start] = Mark::OnPath;
        while let Some(top) = path.last_mut() {
            let (node, next) = *top;
            let parents = slots[node].as_ref().map_or(&[][..], |s| &s.parent_ids[..]);
            let Some(parent) = parents.get(next) else {
                marks[node] = Mark::Done;
                path.pop();
                continue;
            };
            top.1 += 1;
            let parent = parent.index();
            match marks[parent] {
                Mark::New => {
                    marks[parent] = Mark::OnPath;
                    path.push((parent, 0));
                }
                Mark::OnPath => {
                    let from = path.iter().position(|&(n, _)| n == parent).unwrap_or(0);
                    let mut cycle: Vec<String> = path[from..].iter().map(|&(n, _)| name(n)).collect();
                    cycle.push(name(parent));
                    return Some(cycle);
                }
                Mark::Done => {}
            }
        }
    }
    None
}
