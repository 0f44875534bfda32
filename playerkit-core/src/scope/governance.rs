//! Blacklists and register providers

use std::collections::HashSet;
use std::sync::Arc;

use playerkit_plugin_api::{CreatePolicy, RegisterProvider, RegisterSet};
use tracing::{debug, info};

use super::Scope;
use crate::governance::{Blacklist, ProviderRecord, blocks, merge};

impl Scope {
    /// Replace this scope's own blacklist and re-apply the merged result to
    /// this scope and every descendant.
    pub fn update_blacklist(&self, list: Option<Blacklist>) {
        self.state().blacklist.set_own(list);
        self.refresh_blacklist();
    }

    /// The scope's own blacklist
    pub fn own_blacklist(&self) -> Option<Blacklist> {
        self.state().blacklist.own().cloned()
    }

    /// Own blacklist merged with those of every ancestor
    pub fn merged_blacklist(&self) -> Blacklist {
        let own = self.own_blacklist();
        let mut inherited = Vec::new();
        let mut current = self.parent();
        while let Some(scope) = current {
            if let Some(list) = scope.own_blacklist() {
                inherited.push(list);
            }
            current = scope.parent();
        }
        merge(own.as_ref(), &inherited)
    }

    /// Apply the difference between the last applied blacklist and the
    /// current merge: suppress newly listed registrations, restore the
    /// register-provider entries that are no longer listed, then recurse
    /// into the children.
    pub(crate) fn refresh_blacklist(&self) {
        let merged = self.merged_blacklist();
        let (diff, sets) = {
            let state = self.state();
            let diff = state.blacklist.diff(&merged);
            let sets: Vec<RegisterSet> = if diff.removed.is_empty() {
                Vec::new()
            } else {
                state
                    .providers
                    .iter()
                    .map(|record| record.set.clone())
                    .collect()
            };
            (diff, sets)
        };

        if !diff.is_empty() {
            info!(
                scope = %self.label(),
                added = diff.added.len(),
                removed = diff.removed.len(),
                "applying blacklist"
            );
        }

        for identifier in &diff.added {
            let keys = self.state().registry.matching(identifier);
            for key in keys {
                if self.remove_local(&key) {
                    debug!(scope = %self.label(), capability = %key, identifier = %identifier, "blacklisted");
                }
            }
        }

        for set in &sets {
            self.register_set(set, &merged, Some(&diff.removed));
        }

        self.state().blacklist.commit(merged);

        for child in self.children() {
            child.refresh_blacklist();
        }
    }

    /// Register the entries of `set` group by group, skipping blacklisted
    /// entries. With a whitelist only the listed entries are registered.
    fn register_set(
        &self,
        set: &RegisterSet,
        blacklist: &Blacklist,
        whitelist: Option<&HashSet<String>>,
    ) {
        for group in set.groups() {
            let entries: Vec<_> = set
                .entries_in(&group)
                .filter(|entry| !blocks(blacklist, entry.identifier(), entry.class_name()))
                .filter(|entry| {
                    whitelist.is_none_or(|list| {
                        list.contains(entry.identifier()) || list.contains(entry.class_name())
                    })
                })
                .cloned()
                .collect();
            if entries.is_empty() {
                continue;
            }
            self.with_batch(group.policy, group.events.clone(), |scope| {
                for entry in &entries {
                    if let Err(error) = scope.register_with(
                        entry.provider().clone(),
                        CreatePolicy::NONE,
                        entry.options(),
                        Some(blacklist),
                    ) {
                        debug!(
                            scope = %scope.label(),
                            entry = entry.identifier(),
                            %error,
                            "register provider entry skipped"
                        );
                    }
                }
            });
        }
    }

    /// Attach a register provider and register its declared set.
    ///
    /// Adding the same provider twice is a no-op.
    pub fn add_register_provider(&self, provider: &Arc<dyn RegisterProvider>) {
        if self.state().providers.iter().any(|record| record.is(provider)) {
            debug!(scope = %self.label(), "register provider already attached");
            return;
        }

        let mut set = RegisterSet::new();
        provider.register_plugins(&mut set);
        provider.configure_creation(&mut set);

        self.state().providers.push(ProviderRecord {
            provider: Arc::downgrade(provider),
            set: set.clone(),
        });

        let blacklist = self.merged_blacklist();
        debug!(scope = %self.label(), entries = set.len(), "register provider attached");
        self.register_set(&set, &blacklist, None);
    }

    /// Detach a register provider and unregister every capability it
    /// declared. Returns false if the provider was not attached.
    pub fn remove_register_provider(&self, provider: &Arc<dyn RegisterProvider>) -> bool {
        let record = {
            let mut state = self.state();
            let Some(index) = state.providers.iter().position(|record| record.is(provider)) else {
                return false;
            };
            state.providers.remove(index)
        };

        for entry in record.set.entries() {
            self.unregister(entry.provider().key());
        }
        debug!(scope = %self.label(), "register provider removed");
        true
    }

    /// Number of register providers attached to this scope
    pub fn register_provider_count(&self) -> usize {
        self.state().providers.len()
    }
}
