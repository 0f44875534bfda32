//! Serializable view of a scope tree, for diagnostics

use serde::{Deserialize, Serialize};

use playerkit_plugin_api::{CapabilityKey, ProviderClass, ScopeId};

use crate::scope::{Scope, live, upgrade};

/// One registration as seen from outside
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationSnapshot {
    pub key: CapabilityKey,
    pub class: ProviderClass,
    pub policy: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<String>,
    /// An instance currently exists
    pub live: bool,
    /// A configuration payload has been delivered
    pub configured: bool,
}

/// A scope and, recursively, its children
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeSnapshot {
    pub id: ScopeId,
    pub name: Option<String>,
    pub registrations: Vec<RegistrationSnapshot>,
    pub sticky_events: Vec<String>,
    pub subscribed_events: Vec<String>,
    /// Blacklist currently enforced, sorted
    pub blacklist: Vec<String>,
    pub base: Option<ScopeId>,
    pub extensions: Vec<ScopeId>,
    pub shared: Option<ScopeId>,
    pub children: Vec<ScopeSnapshot>,
}

impl ScopeSnapshot {
    /// Total number of scopes in this snapshot
    pub fn scope_count(&self) -> usize {
        1 + self.children.iter().map(Self::scope_count).sum::<usize>()
    }

    /// Find a scope by name anywhere in the snapshot
    pub fn find(&self, name: &str) -> Option<&ScopeSnapshot> {
        if self.name.as_deref() == Some(name) {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(name))
    }

    /// Pretty-printed JSON, for dumping a scope tree into logs or bug reports
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Scope {
    /// Capture this scope and its subtree
    pub fn snapshot(&self) -> ScopeSnapshot {
        let (registrations, sticky_events, mut blacklist, base, extensions, shared, children) = {
            let state = self.state();
            let registrations = state
                .registry
                .entries()
                .map(|entry| RegistrationSnapshot {
                    key: entry.key.clone(),
                    class: entry.class.clone(),
                    policy: entry.policy.names().into_iter().map(String::from).collect(),
                    events: entry.events.clone(),
                    live: state.registry.instance(&entry.key).is_some(),
                    configured: entry.config.is_some(),
                })
                .collect::<Vec<_>>();
            (
                registrations,
                state.sticky.keys().cloned().collect::<Vec<_>>(),
                state
                    .blacklist
                    .effective()
                    .map(|list| list.iter().cloned().collect::<Vec<_>>())
                    .unwrap_or_default(),
                upgrade(&state.base).map(|scope| scope.id()),
                live(&state.extensions)
                    .iter()
                    .map(|scope| scope.id())
                    .collect::<Vec<_>>(),
                upgrade(&state.shared).map(|scope| scope.id()),
                live(&state.children),
            )
        };
        blacklist.sort();

        ScopeSnapshot {
            id: self.id(),
            name: self.name().map(str::to_string),
            registrations,
            sticky_events,
            subscribed_events: self.bus().events(),
            blacklist,
            base,
            extensions,
            shared,
            children: children.iter().map(|child| child.snapshot()).collect(),
        }
    }
}
