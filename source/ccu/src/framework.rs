//! The rate-tree framework collaborator.
//!
//! The registry hands every node to a [`Framework`] when it is registered,
//! and takes it back when it is unregistered. The framework owns the
//! name/id index used for lookups. [`ClockTree`] is the in-tree
//! implementation; tests substitute a scripted one.
use alloc::{collections::BTreeMap, string::String, vec::Vec};
use core::fmt;

use crate::table::{ClkFlags, ClockId};

/// What the framework is told about a node.
#[derive(Copy, Clone, Debug)]
pub struct NodeInfo<'a> {
    pub id: ClockId,
    pub name: &'a str,
    pub parents: &'a [String],
    pub flags: ClkFlags,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FrameworkError {
    /// A node of the same name (or id) is already registered.
    DuplicateName,
    /// The framework refused the node.
    Rejected,
}

impl fmt::Display for FrameworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateName => f.write_str("a clock with this name is already registered"),
            Self::Rejected => f.write_str("the clock was rejected"),
        }
    }
}

pub trait Framework {
    fn register(&mut self, node: &NodeInfo<'_>) -> Result<(), FrameworkError>;

    /// Unregistering an id that is not registered does nothing.
    fn unregister(&mut self, id: ClockId);

    /// Looks up a registered clock by name.
    fn find(&self, name: &str) -> Option<ClockId>;

    fn is_registered(&self, id: ClockId) -> bool;
}

impl<F: Framework + ?Sized> Framework for &mut F {
    fn register(&mut self, node: &NodeInfo<'_>) -> Result<(), FrameworkError> {
        (**self).register(node)
    }

    fn unregister(&mut self, id: ClockId) {
        (**self).unregister(id)
    }

    fn find(&self, name: &str) -> Option<ClockId> {
        (**self).find(name)
    }

    fn is_registered(&self, id: ClockId) -> bool {
        (**self).is_registered(id)
    }
}

#[derive(Clone, Debug)]
struct Entry {
    name: String,
    parents: Vec<String>,
}

/// Name and id index of registered clocks, with their declared parents.
///
/// Parents are kept by name and resolved on demand, so a node may be
/// registered before its parents are; until they are, it is an orphan.
#[derive(Clone, Debug, Default)]
pub struct ClockTree {
    by_name: BTreeMap<String, ClockId>,
    nodes: BTreeMap<ClockId, Entry>,
    order: Vec<ClockId>,
}

impl ClockTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Registered ids, in registration order.
    pub fn order(&self) -> &[ClockId] {
        &self.order
    }

    pub fn name(&self, id: ClockId) -> Option<&str> {
        self.nodes.get(&id).map(|e| e.name.as_str())
    }

    /// The declared parents of `id`, resolved to registered ids.
    pub fn parents(&self, id: ClockId) -> impl Iterator<Item = (&str, Option<ClockId>)> + '_ {
        self.nodes
            .get(&id)
            .into_iter()
            .flat_map(|e| e.parents.iter())
            .map(|name| (name.as_str(), self.find(name)))
    }

    /// Registered clocks with at least one declared parent that is not
    /// registered.
    pub fn orphans(&self) -> impl Iterator<Item = ClockId> + '_ {
        self.order
            .iter()
            .copied()
            .filter(|&id| self.parents(id).any(|(_, parent)| parent.is_none()))
    }
}

impl Framework for ClockTree {
    fn register(&mut self, node: &NodeInfo<'_>) -> Result<(), FrameworkError> {
        if self.by_name.contains_key(node.name) || self.nodes.contains_key(&node.id) {
            return Err(FrameworkError::DuplicateName);
        }
        self.by_name.insert(node.name.into(), node.id);
        self.nodes.insert(
            node.id,
            Entry {
                name: node.name.into(),
                parents: node.parents.to_vec(),
            },
        );
        self.order.push(node.id);
        Ok(())
    }

    fn unregister(&mut self, id: ClockId) {
        let Some(entry) = self.nodes.remove(&id) else {
            return;
        };
        self.by_name.remove(&entry.name);
        self.order.retain(|&other| other != id);
    }

    fn find(&self, name: &str) -> Option<ClockId> {
        self.by_name.get(name).copied()
    }

    fn is_registered(&self, id: ClockId) -> bool {
        self.nodes.contains_key(&id)
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    fn info<'a>(id: u32, name: &'a str, parents: &'a [String]) -> NodeInfo<'a> {
        NodeInfo {
            id: ClockId(id),
            name,
            parents,
            flags: ClkFlags::new(),
        }
    }

    #[test]
    fn duplicates_are_rejected() {
        let mut tree = ClockTree::new();
        tree.register(&info(0, "osc", &[])).unwrap();
        assert_eq!(tree.register(&info(1, "osc", &[])), Err(FrameworkError::DuplicateName));
        assert_eq!(tree.register(&info(0, "other", &[])), Err(FrameworkError::DuplicateName));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn orphans_resolve_once_parents_register() {
        let parents = vec![String::from("osc")];
        let mut tree = ClockTree::new();
        tree.register(&info(1, "pll", &parents)).unwrap();
        assert_eq!(tree.orphans().collect::<Vec<_>>(), [ClockId(1)]);

        tree.register(&info(0, "osc", &[])).unwrap();
        assert_eq!(tree.orphans().count(), 0);
        assert_eq!(tree.parents(ClockId(1)).collect::<Vec<_>>(), [("osc", Some(ClockId(0)))]);

        tree.unregister(ClockId(0));
        assert_eq!(tree.find("osc"), None);
        assert_eq!(tree.order(), [ClockId(1)]);
        // no-op
        tree.unregister(ClockId(0));
    }
}
