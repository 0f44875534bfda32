//! Capability registration, resolution and instance lifecycles

use std::sync::Arc;

use playerkit_plugin_api::{
    CapabilityKey, Context, ContextError, CreateOptions, CreatePolicy, EventOptions, Payload,
    PluginInstance, Provider, ProviderClass, capability_loaded_event, handler,
};
use tracing::{debug, warn};

use super::{BatchContext, Scope, live, upgrade};
use crate::governance::{Blacklist, blocks};
use crate::registry::ServiceEntry;

/// What `configure_key` has to do once the lock is released
enum ConfigureAction {
    Deliver(PluginInstance),
    Create,
    Stored,
}

impl Scope {
    // ─── Registration ────────────────────────────────────────────────

    /// Register `provider` under its capability key.
    ///
    /// Inside [`Scope::batch_register`] the batch policy and trigger events
    /// are merged in. An existing registration for the same key is replaced
    /// and its live instance unloaded.
    pub fn register(
        &self,
        provider: Provider,
        policy: CreatePolicy,
        options: CreateOptions,
    ) -> Result<(), ContextError> {
        self.register_with(provider, policy, options, None)
    }

    /// Register checking against `blacklist` instead of the scope's
    /// effective blacklist.
    pub(crate) fn register_with(
        &self,
        provider: Provider,
        policy: CreatePolicy,
        options: CreateOptions,
        blacklist: Option<&Blacklist>,
    ) -> Result<(), ContextError> {
        let key = provider.key().clone();

        let (entry, replaced) = {
            let mut state = self.state();
            let blocked = match blacklist {
                Some(list) => blocks(list, key.as_str(), provider.class().as_str()),
                None => state
                    .blacklist
                    .effective()
                    .is_some_and(|list| blocks(list, key.as_str(), provider.class().as_str())),
            };
            if blocked {
                debug!(
                    scope = %self.label(),
                    capability = %key,
                    class = %provider.class(),
                    "registration suppressed by blacklist"
                );
                return Err(ContextError::Blacklisted(key.to_string()));
            }

            let (policy, events) = match &state.batch {
                Some(batch) => (policy | batch.policy, batch.events.clone()),
                None => (policy, Vec::new()),
            };
            let entry = ServiceEntry::from_provider(provider, policy, options, events);
            state.registry.insert_entry(entry.clone());
            let replaced = state.registry.take_instance(&key);
            (entry, replaced)
        };

        if let Some(old) = replaced {
            warn!(scope = %self.label(), capability = %key, "replacing live registration");
            old.plugin().on_unload(self);
        }

        debug!(
            scope = %self.label(),
            capability = %key,
            class = %entry.class,
            policy = ?entry.policy.names(),
            "capability registered"
        );

        if let Some(trigger) = &entry.trigger {
            for event in &entry.events {
                let weak = self.weak();
                let key = key.clone();
                self.subscribe(
                    trigger,
                    event,
                    EventOptions::NONE,
                    handler(move |_, event| {
                        if let Some(scope) = weak.upgrade() {
                            debug!(scope = %scope.label(), capability = %key, event, "trigger event observed");
                            scope.create_instance(&key);
                        }
                    }),
                );
            }
        }

        if entry.creates_on_register() {
            self.create_instance(&key);
        }
        Ok(())
    }

    /// Run `register` calls inside `f` with an extra creation policy and
    /// trigger events. Batches nest; the previous batch is restored on exit.
    pub fn batch_register<F>(&self, policy: CreatePolicy, events: &[&str], f: F)
    where
        F: FnOnce(&Scope),
    {
        let events = events.iter().map(|e| (*e).to_string()).collect();
        self.with_batch(policy, events, f);
    }

    pub(crate) fn with_batch<F>(&self, policy: CreatePolicy, events: Vec<String>, f: F)
    where
        F: FnOnce(&Scope),
    {
        let previous = self
            .state()
            .batch
            .replace(BatchContext { policy, events });
        f(self);
        self.state().batch = previous;
    }

    /// Record an externally built instance under `key`, bind it and load it
    pub fn register_instance(&self, instance: PluginInstance, key: CapabilityKey) {
        let replaced = {
            let mut state = self.state();
            state
                .registry
                .insert_entry(ServiceEntry::for_instance(key.clone(), instance.class().clone()));
            let replaced = state.registry.take_instance(&key);
            state.registry.insert_instance(key.clone(), instance.clone());
            replaced
        };
        if let Some(old) = replaced.filter(|old| !old.ptr_eq(&instance)) {
            old.plugin().on_unload(self);
        }
        instance.plugin().bind_context(Some(Context::downgrade(self)));
        instance.plugin().on_load(self);
        debug!(scope = %self.label(), capability = %key, "instance registered");
    }

    /// Hand the instance under `key` back to the caller.
    ///
    /// The registration is removed and the instance unbound, but it is not
    /// unloaded.
    pub fn detach_instance(&self, key: &CapabilityKey) -> Option<PluginInstance> {
        let instance = {
            let mut state = self.state();
            let instance = state.registry.take_instance(key)?;
            state.registry.remove_entry(key);
            instance
        };
        instance.plugin().bind_context(None);
        debug!(scope = %self.label(), capability = %key, "instance detached");
        Some(instance)
    }

    // ─── Unregistration ──────────────────────────────────────────────

    /// Remove the registration for `key`, unloading its instance.
    ///
    /// If this scope has no registration, the key is removed from every
    /// child subtree and then from the base. Returns true if a registration
    /// was removed somewhere.
    pub fn unregister(&self, key: &CapabilityKey) -> bool {
        self.unregister_from(key, false)
    }

    fn unregister_from(&self, key: &CapabilityKey, from_child: bool) -> bool {
        let (removed, children, base) = {
            let mut state = self.state();
            match state.registry.remove_entry(key) {
                Some(_) => (Some(state.registry.take_instance(key)), Vec::new(), None),
                None => (None, live(&state.children), upgrade(&state.base)),
            }
        };

        if let Some(instance) = removed {
            if let Some(instance) = instance {
                instance.plugin().on_unload(self);
            }
            debug!(scope = %self.label(), capability = %key, "capability unregistered");
            return true;
        }

        let mut removed = false;
        for child in children {
            removed |= child.unregister_from(key, true);
        }
        if !from_child && let Some(base) = base {
            removed |= base.unregister_from(key, false);
        }
        removed
    }

    /// Remove every local registration made by provider class `class`
    pub fn unregister_class(&self, class: &ProviderClass) -> usize {
        let keys = self.state().registry.matching(class.as_str());
        keys.iter()
            .filter(|key| self.remove_local(key))
            .count()
    }

    /// Remove a local registration without searching elsewhere
    pub(crate) fn remove_local(&self, key: &CapabilityKey) -> bool {
        let removed = {
            let mut state = self.state();
            state
                .registry
                .remove_entry(key)
                .map(|_| state.registry.take_instance(key))
        };
        match removed {
            Some(instance) => {
                if let Some(instance) = instance {
                    instance.plugin().on_unload(self);
                }
                debug!(scope = %self.label(), capability = %key, "capability removed");
                true
            }
            None => false,
        }
    }

    // ─── Resolution ──────────────────────────────────────────────────

    /// Resolve `key`, logging a warning when nothing provides it
    pub fn resolve_key(&self, key: &CapabilityKey) -> Option<PluginInstance> {
        let instance = self.lookup(key, false);
        if instance.is_none() {
            warn!(scope = %self.label(), capability = %key, "capability not found");
        }
        instance
    }

    /// Resolve `key` without logging on a miss
    pub fn try_resolve_key(&self, key: &CapabilityKey) -> Option<PluginInstance> {
        self.lookup(key, false)
    }

    /// Local registration first, then children depth-first, then the base.
    /// Ancestors are never consulted.
    fn lookup(&self, key: &CapabilityKey, from_child: bool) -> Option<PluginInstance> {
        let (local, children, base) = {
            let state = self.state();
            if let Some(instance) = state.registry.instance(key) {
                return Some(instance);
            }
            let local = state.registry.entry(key).map(ServiceEntry::creates_on_resolve);
            (local, live(&state.children), upgrade(&state.base))
        };

        match local {
            Some(true) => return self.create_instance(key),
            Some(false) => return None,
            None => {}
        }

        for child in children {
            if let Some(instance) = child.lookup(key, true) {
                return Some(instance);
            }
        }
        if from_child {
            return None;
        }
        base.and_then(|base| base.lookup(key, false))
    }

    // ─── Configuration ───────────────────────────────────────────────

    /// Deliver `payload` to the local registration for `key`.
    ///
    /// The payload is stored on the registration; a live instance receives
    /// it immediately, and an `ON_FIRST_CONFIGURE` registration is
    /// instantiated with it.
    pub fn configure_key(&self, key: &CapabilityKey, payload: Payload) -> Result<(), ContextError> {
        let action = {
            let mut state = self.state();
            let live = state.registry.instance(key);
            let Some(entry) = state.registry.entry_mut(key) else {
                warn!(scope = %self.label(), capability = %key, "configuring unregistered capability");
                return Err(ContextError::NotRegistered(key.to_string()));
            };
            entry.config = Some(Arc::clone(&payload));
            match live {
                Some(instance) => ConfigureAction::Deliver(instance),
                None if entry.creates_on_configure() => ConfigureAction::Create,
                None => ConfigureAction::Stored,
            }
        };

        match action {
            ConfigureAction::Deliver(instance) => instance.plugin().configure(&payload),
            ConfigureAction::Create => {
                self.create_instance(key);
            }
            ConfigureAction::Stored => {
                debug!(scope = %self.label(), capability = %key, "configuration stored for later");
            }
        }
        Ok(())
    }

    // ─── Instantiation ───────────────────────────────────────────────

    /// Create the instance for `key` unless one exists.
    ///
    /// Order: construct, bind, apply stored configuration, record, load,
    /// relationship notifications, then publish the loaded event.
    pub(crate) fn create_instance(&self, key: &CapabilityKey) -> Option<PluginInstance> {
        let (provider, config) = {
            let state = self.state();
            if let Some(instance) = state.registry.instance(key) {
                return Some(instance);
            }
            let entry = state.registry.entry(key)?;
            (entry.provider.clone()?, entry.config.clone())
        };

        let instance = provider.instantiate();
        let plugin = instance.plugin();
        plugin.bind_context(Some(Context::downgrade(self)));
        if let Some(config) = &config {
            plugin.configure(config);
        }

        let (parent, children, base) = {
            let mut state = self.state();
            if let Some(existing) = state.registry.instance(key) {
                return Some(existing);
            }
            if !state.registry.contains(key) {
                debug!(scope = %self.label(), capability = %key, "registration vanished during creation");
                return None;
            }
            state.registry.insert_instance(key.clone(), instance.clone());
            (
                upgrade(&state.parent),
                live(&state.children),
                upgrade(&state.base),
            )
        };

        debug!(
            scope = %self.label(),
            capability = %key,
            class = %instance.class(),
            "instance created"
        );
        plugin.on_load(self);
        if let Some(parent) = &parent {
            plugin.on_attached_to_parent(&**parent);
        }
        for child in &children {
            plugin.on_child_attached(&**child);
        }
        if let Some(base) = &base {
            plugin.on_extended(&**base);
        }

        let loaded: Payload = Arc::new(instance.clone());
        self.publish(&capability_loaded_event(key), Some(loaded));
        Some(instance)
    }
}
