use foundation::ids::Version;
use tracing::debug;

use crate::configuration::{ConfigPatch, Configuration};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

/// A committed change: the value before, the value after, and its version.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ConfigChange {
    pub version: Version,
    pub previous: Configuration,
    pub config: Configuration,
}

type Listener = Box<dyn FnMut(&ConfigChange)>;

/// Single owner of the current [`Configuration`].
///
/// - Every effective `set` bumps the version by one.
/// - A `set` that leaves the value unchanged neither bumps nor notifies.
/// - Listeners run synchronously inside `set`, in subscription order.
pub struct ConfigurationStore {
    current: Configuration,
    version: Version,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl std::fmt::Debug for ConfigurationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigurationStore")
            .field("current", &self.current)
            .field("version", &self.version)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for ConfigurationStore {
    fn default() -> Self {
        Self::new(Configuration::default())
    }
}

impl ConfigurationStore {
    pub fn new(initial: Configuration) -> Self {
        Self {
            current: initial,
            version: Version::INITIAL,
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn get(&self) -> Configuration {
        self.current
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn set(&mut self, patch: ConfigPatch) -> Option<ConfigChange> {
        let next = self.current.merged(&patch);
        if next == self.current {
            return None;
        }

        let change = ConfigChange {
            version: self.version.next(),
            previous: self.current,
            config: next,
        };
        self.current = next;
        self.version = change.version;
        debug!(version = %change.version, config = %next, "configuration changed");

        for (_, listener) in &mut self.listeners {
            listener(&change);
        }
        Some(change)
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&ConfigChange) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Drops every listener. The current value stays readable.
    pub fn shutdown(&mut self) {
        self.listeners.clear();
    }
}
