use std::{string::String, vec::Vec};

use crate::{
    framework::{ClockTree, Framework, FrameworkError, NodeInfo},
    table::ClockId,
};

pub(crate) fn trace_init() {
    use tracing_subscriber::{
        filter::{EnvFilter, LevelFilter},
        prelude::*,
    };
    let env = std::env::var("RUST_LOG").unwrap_or_default();
    let builder = EnvFilter::builder().with_default_directive(LevelFilter::INFO.into());
    let filter = if env.is_empty() {
        builder.parse("ccu=debug").unwrap()
    } else {
        builder.parse_lossy(env)
    };

    let _res = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .with_thread_names(true)
        .without_time()
        .finish()
        .try_init();
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Call {
    Register(String),
    Unregister(ClockId),
}

/// A [`ClockTree`] that records every call and refuses one chosen clock.
#[derive(Debug, Default)]
pub(crate) struct MockFramework {
    pub(crate) tree: ClockTree,
    pub(crate) calls: Vec<Call>,
    pub(crate) fail_on: Option<String>,
}

impl MockFramework {
    pub(crate) fn failing_on(name: &str) -> Self {
        Self {
            fail_on: Some(name.into()),
            ..Self::default()
        }
    }

    pub(crate) fn registers(&self) -> impl Iterator<Item = &str> + '_ {
        self.calls.iter().filter_map(|call| match call {
            Call::Register(name) => Some(name.as_str()),
            Call::Unregister(_) => None,
        })
    }

    pub(crate) fn unregisters(&self) -> impl Iterator<Item = ClockId> + '_ {
        self.calls.iter().filter_map(|call| match call {
            Call::Unregister(id) => Some(*id),
            Call::Register(_) => None,
        })
    }
}

impl Framework for MockFramework {
    fn register(&mut self, node: &NodeInfo<'_>) -> Result<(), FrameworkError> {
        self.calls.push(Call::Register(node.name.into()));
        if self.fail_on.as_deref() == Some(node.name) {
            return Err(FrameworkError::Rejected);
        }
        self.tree.register(node)
    }

    fn unregister(&mut self, id: ClockId) {
        self.calls.push(Call::Unregister(id));
        self.tree.unregister(id)
    }

    fn find(&self, name: &str) -> Option<ClockId> {
        self.tree.find(name)
    }

    fn is_registered(&self, id: ClockId) -> bool {
        self.tree.is_registered(id)
    }
}
