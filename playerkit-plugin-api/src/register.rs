//! Declarative registration sets
//!
//! A [`RegisterProvider`] fills a [`RegisterSet`] with providers and assigns
//! them to creation groups. Scopes keep the set so blacklisted entries can be
//! restored later.

use std::collections::HashMap;

use crate::plugin::Provider;
use crate::types::{CapabilityKey, CreateOptions, CreatePolicy};

/// Creation policy plus trigger events shared by a group of entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CreateGroup {
    /// When members of the group are instantiated
    pub policy: CreatePolicy,
    /// Trigger events for [`CreatePolicy::ON_EVENT`]
    pub events: Vec<String>,
}

impl CreateGroup {
    /// Group with a policy and no trigger events
    #[must_use]
    pub fn new(policy: CreatePolicy) -> Self {
        Self {
            policy,
            events: Vec::new(),
        }
    }

    /// Group instantiated when any of `events` is observed
    #[must_use]
    pub fn on_events(events: &[&str]) -> Self {
        Self {
            policy: CreatePolicy::ON_EVENT,
            events: events.iter().map(|e| (*e).to_string()).collect(),
        }
    }
}

impl Default for CreateGroup {
    fn default() -> Self {
        Self::new(CreatePolicy::ON_REGISTER)
    }
}

/// One provider declared in a set.
#[derive(Debug, Clone)]
pub struct RegisterEntry {
    provider: Provider,
    options: CreateOptions,
}

impl RegisterEntry {
    /// The provider to register
    #[must_use]
    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    /// Per-entry options
    #[must_use]
    pub fn options(&self) -> CreateOptions {
        self.options
    }

    /// Capability identifier used for blacklist matching
    #[must_use]
    pub fn identifier(&self) -> &str {
        self.provider.key().as_str()
    }

    /// Provider class name used for blacklist matching
    #[must_use]
    pub fn class_name(&self) -> &str {
        self.provider.class().as_str()
    }
}

/// Ordered collection of providers with creation groups.
#[derive(Debug, Clone, Default)]
pub struct RegisterSet {
    entries: Vec<RegisterEntry>,
    groups: HashMap<String, CreateGroup>,
}

impl RegisterSet {
    /// Create an empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a provider with default options. A later declaration for the
    /// same key replaces the earlier one.
    pub fn add(&mut self, provider: Provider) -> &mut Self {
        self.add_with_options(provider, CreateOptions::NONE)
    }

    /// Declare a provider with explicit options
    pub fn add_with_options(&mut self, provider: Provider, options: CreateOptions) -> &mut Self {
        self.entries.retain(|e| e.provider.key() != provider.key());
        self.entries.push(RegisterEntry { provider, options });
        self
    }

    /// Drop the declaration for `key`
    pub fn remove_key(&mut self, key: &CapabilityKey) -> &mut Self {
        self.entries.retain(|e| e.provider.key() != key);
        self.groups.remove(key.as_str());
        self
    }

    /// Drop every declaration of provider class `class`
    pub fn remove_class(&mut self, class: &str) -> &mut Self {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|e| e.class_name() == class);
        for entry in removed {
            self.groups.remove(entry.identifier());
        }
        self.entries = kept;
        self
    }

    /// Place the entries for `keys` into `group`
    pub fn configure_group(&mut self, group: CreateGroup, keys: &[CapabilityKey]) -> &mut Self {
        for key in keys {
            self.groups.insert(key.as_str().to_string(), group.clone());
        }
        self
    }

    /// All declared entries in declaration order
    #[must_use]
    pub fn entries(&self) -> &[RegisterEntry] {
        &self.entries
    }

    /// Group assigned to `entry`, falling back to the default group
    #[must_use]
    pub fn group_of(&self, entry: &RegisterEntry) -> CreateGroup {
        self.groups
            .get(entry.identifier())
            .cloned()
            .unwrap_or_default()
    }

    /// Distinct groups in use, default group first, then in order of first
    /// appearance among the entries.
    #[must_use]
    pub fn groups(&self) -> Vec<CreateGroup> {
        let mut groups = vec![CreateGroup::default()];
        for entry in &self.entries {
            let group = self.group_of(entry);
            if !groups.contains(&group) {
                groups.push(group);
            }
        }
        groups
    }

    /// Entries belonging to `group`, in declaration order
    pub fn entries_in<'a>(
        &'a self,
        group: &'a CreateGroup,
    ) -> impl Iterator<Item = &'a RegisterEntry> + 'a {
        self.entries
            .iter()
            .filter(move |entry| self.group_of(entry) == *group)
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has been declared
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Supplies providers to a scope in one declarative step.
pub trait RegisterProvider: Send + Sync {
    /// Declare the providers to register
    fn register_plugins(&self, set: &mut RegisterSet);

    /// Assign declared providers to creation groups
    fn configure_creation(&self, _set: &mut RegisterSet) {}
}
