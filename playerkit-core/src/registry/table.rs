//! Registrations and live instances of one scope

use std::collections::BTreeMap;

use playerkit_plugin_api::{CapabilityKey, PluginInstance};

use super::entry::ServiceEntry;

/// Registration table plus the instances created from it.
///
/// Instances are kept in creation order so teardown can run in reverse.
/// The table holds plain data; all plugin callbacks happen in the scope after
/// the lock protecting the table has been released.
#[derive(Debug, Default)]
pub struct ServiceTable {
    entries: BTreeMap<CapabilityKey, ServiceEntry>,
    instances: Vec<(CapabilityKey, PluginInstance)>,
}

impl ServiceTable {
    pub fn entry(&self, key: &CapabilityKey) -> Option<&ServiceEntry> {
        self.entries.get(key)
    }

    pub fn entry_mut(&mut self, key: &CapabilityKey) -> Option<&mut ServiceEntry> {
        self.entries.get_mut(key)
    }

    /// Insert or replace the entry for its key, returning the previous one
    pub fn insert_entry(&mut self, entry: ServiceEntry) -> Option<ServiceEntry> {
        self.entries.insert(entry.key.clone(), entry)
    }

    pub fn remove_entry(&mut self, key: &CapabilityKey) -> Option<ServiceEntry> {
        self.entries.remove(key)
    }

    pub fn contains(&self, key: &CapabilityKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn entries(&self) -> impl Iterator<Item = &ServiceEntry> {
        self.entries.values()
    }

    /// Keys of entries whose capability or class equals `identifier`
    pub fn matching(&self, identifier: &str) -> Vec<CapabilityKey> {
        self.entries
            .values()
            .filter(|entry| entry.matches(identifier))
            .map(|entry| entry.key.clone())
            .collect()
    }

    pub fn instance(&self, key: &CapabilityKey) -> Option<PluginInstance> {
        self.instances
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, instance)| instance.clone())
    }

    /// Record a freshly created instance
    pub fn insert_instance(&mut self, key: CapabilityKey, instance: PluginInstance) {
        self.instances.retain(|(k, _)| *k != key);
        self.instances.push((key, instance));
    }

    pub fn take_instance(&mut self, key: &CapabilityKey) -> Option<PluginInstance> {
        let index = self.instances.iter().position(|(k, _)| k == key)?;
        Some(self.instances.remove(index).1)
    }

    /// Remove every instance, newest first
    pub fn drain_instances(&mut self) -> Vec<(CapabilityKey, PluginInstance)> {
        let mut drained = std::mem::take(&mut self.instances);
        drained.reverse();
        drained
    }

    /// Live instances in creation order
    pub fn instances(&self) -> Vec<PluginInstance> {
        self.instances.iter().map(|(_, i)| i.clone()).collect()
    }

    /// Live instances with their keys, in creation order
    pub fn keyed_instances(&self) -> Vec<(CapabilityKey, PluginInstance)> {
        self.instances.clone()
    }
}
