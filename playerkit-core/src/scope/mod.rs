//! Scopes: the nodes of the plugin hierarchy
//!
//! A [`Scope`] hosts plugin registrations, owns an event bus and sticky
//! values, and takes part in two relationships:
//!
//! - **tree** - one optional parent, any number of children
//! - **extension** - a scope either has one base or is a base for extensions,
//!   never both
//!
//! Every scope also has an optional peer link to a shared scope. All links
//! are weak; the application owns scopes through `Arc<Scope>`.
//!
//! ```text
//!            root ◀──── extension
//!           /    \
//!       child    child ──── shared
//! ```
//!
//! Internal state sits behind a single mutex. It is never held while a
//! plugin hook or an event handler runs.

mod events;
mod governance;
mod services;
mod tree;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use playerkit_plugin_api::{
    CapabilityKey, Context, ContextError, CreatePolicy, EventHandlerFn, EventOptions, Observer,
    Payload, PluginInstance, ScopeId, StickyFn, SubscriptionToken, WeakContext,
};
use tracing::debug;

use crate::config::ScopeConfig;
use crate::events::EventBus;
use crate::governance::{BlacklistState, ProviderRecord};
use crate::registry::ServiceTable;
use events::StickySource;

pub(crate) struct BatchContext {
    pub policy: CreatePolicy,
    pub events: Vec<String>,
}

#[derive(Default)]
pub(crate) struct ScopeState {
    pub parent: Option<Weak<Scope>>,
    pub children: Vec<Weak<Scope>>,
    pub base: Option<Weak<Scope>>,
    pub extensions: Vec<Weak<Scope>>,
    pub shared: Option<Weak<Scope>>,
    pub registry: ServiceTable,
    pub sticky: BTreeMap<String, StickySource>,
    pub blacklist: BlacklistState,
    pub providers: Vec<ProviderRecord>,
    pub batch: Option<BatchContext>,
}

/// A node in the plugin hierarchy.
pub struct Scope {
    id: ScopeId,
    name: Option<String>,
    this: Weak<Scope>,
    bus: EventBus,
    state: Mutex<ScopeState>,
}

impl Scope {
    /// Create an unnamed, detached scope
    pub fn new() -> Arc<Self> {
        Self::build(None)
    }

    /// Create a detached scope with a name used in logs and snapshots
    pub fn named(name: impl Into<String>) -> Arc<Self> {
        Self::build(Some(name.into()))
    }

    /// Create a named scope and apply its configured blacklist
    pub fn from_config(name: impl Into<String>, config: &ScopeConfig) -> Arc<Self> {
        let scope = Self::named(name);
        if let Some(list) = config.blacklist_set() {
            scope.update_blacklist(Some(list));
        }
        scope
    }

    fn build(name: Option<String>) -> Arc<Self> {
        let scope = Arc::new_cyclic(|this| Self {
            id: ScopeId::new(),
            name,
            this: this.clone(),
            bus: EventBus::new(),
            state: Mutex::new(ScopeState::default()),
        });
        debug!(scope = %scope.label(), "scope created");
        scope
    }

    /// Identity of this scope
    pub fn id(&self) -> ScopeId {
        self.id
    }

    /// Name given at construction
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Name if set, otherwise the id; used in log fields
    pub fn label(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.id.to_string())
    }

    /// The local event bus
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, ScopeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn weak(&self) -> Weak<Scope> {
        self.this.clone()
    }

    /// Live instances of this scope, in creation order
    pub fn instances(&self) -> Vec<PluginInstance> {
        self.state().registry.instances()
    }

    /// Keys registered in this scope, sorted
    pub fn registered_keys(&self) -> Vec<CapabilityKey> {
        self.state()
            .registry
            .entries()
            .map(|entry| entry.key.clone())
            .collect()
    }

    fn is(&self, other: &Scope) -> bool {
        self.id == other.id
    }
}

pub(crate) fn live(list: &[Weak<Scope>]) -> Vec<Arc<Scope>> {
    list.iter().filter_map(Weak::upgrade).collect()
}

/// Drop dead links, then record `scope`
pub(crate) fn push_live(list: &mut Vec<Weak<Scope>>, scope: &Arc<Scope>) {
    list.retain(|link| link.strong_count() > 0);
    list.push(Arc::downgrade(scope));
}

pub(crate) fn upgrade(link: &Option<Weak<Scope>>) -> Option<Arc<Scope>> {
    link.as_ref().and_then(Weak::upgrade)
}

impl Context for Scope {
    fn id(&self) -> ScopeId {
        self.id
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn downgrade(&self) -> WeakContext {
        let weak: Weak<dyn Context> = self.this.clone();
        weak
    }

    fn subscribe(
        &self,
        observer: &Observer,
        event: &str,
        options: EventOptions,
        handler: EventHandlerFn,
    ) -> SubscriptionToken {
        Scope::subscribe(self, observer, event, options, handler)
    }

    fn subscribe_many(
        &self,
        observer: &Observer,
        events: &[&str],
        options: EventOptions,
        handler: EventHandlerFn,
    ) -> Option<SubscriptionToken> {
        Scope::subscribe_many(self, observer, events, options, handler)
    }

    fn unsubscribe(&self, token: &SubscriptionToken) {
        Scope::unsubscribe(self, token);
    }

    fn unsubscribe_all(&self, observer: &Observer) {
        Scope::unsubscribe_all(self, observer);
    }

    fn publish(&self, event: &str, payload: Option<Payload>) {
        Scope::publish(self, event, payload);
    }

    fn bind_sticky(&self, event: &str, value: Payload) {
        Scope::bind_sticky(self, event, value);
    }

    fn bind_sticky_with(&self, event: &str, source: StickyFn) {
        Scope::bind_sticky_with(self, event, source);
    }

    fn unbind_sticky(&self, event: &str) -> bool {
        Scope::unbind_sticky(self, event)
    }

    fn resolve_key(&self, key: &CapabilityKey) -> Option<PluginInstance> {
        Scope::resolve_key(self, key)
    }

    fn try_resolve_key(&self, key: &CapabilityKey) -> Option<PluginInstance> {
        Scope::try_resolve_key(self, key)
    }

    fn is_key_registered(&self, key: &CapabilityKey) -> bool {
        self.state().registry.contains(key)
    }

    fn configure_key(&self, key: &CapabilityKey, payload: Payload) -> Result<(), ContextError> {
        Scope::configure_key(self, key, payload)
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        let drained = state.registry.drain_instances();
        if drained.is_empty() {
            return;
        }
        debug!(scope = %self.label(), count = drained.len(), "unloading instances");
        for (_, instance) in drained {
            instance.plugin().on_unload(&*self);
        }
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
