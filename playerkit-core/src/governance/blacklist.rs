//! Blacklist bookkeeping
//!
//! A blacklist is a set of identifiers, each naming either a capability or a
//! provider class. A scope's effective blacklist is the union of its own list
//! and the lists of all its ancestors.

use std::collections::HashSet;

/// Identifiers suppressed in a scope
pub type Blacklist = HashSet<String>;

/// True if `list` names the capability `key` or the provider `class`
pub fn blocks(list: &Blacklist, key: &str, class: &str) -> bool {
    list.contains(key) || list.contains(class)
}

/// Union of a scope's own list and the lists inherited from its ancestors
pub fn merge<'a>(
    own: Option<&'a Blacklist>,
    inherited: impl IntoIterator<Item = &'a Blacklist>,
) -> Blacklist {
    own.into_iter()
        .chain(inherited)
        .flat_map(|list| list.iter().cloned())
        .collect()
}

/// Change between the previously applied blacklist and a new one
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BlacklistDiff {
    /// Newly suppressed identifiers
    pub added: Blacklist,
    /// Identifiers no longer suppressed
    pub removed: Blacklist,
}

impl BlacklistDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Per-scope blacklist state
#[derive(Debug, Default, Clone)]
pub struct BlacklistState {
    own: Option<Blacklist>,
    applied: Option<Blacklist>,
}

impl BlacklistState {
    /// The scope's own list, if one was set
    pub fn own(&self) -> Option<&Blacklist> {
        self.own.as_ref()
    }

    pub fn set_own(&mut self, list: Option<Blacklist>) {
        self.own = list;
    }

    /// Blacklist to enforce for new registrations: the last applied merge,
    /// or the scope's own list before any merge happened.
    pub fn effective(&self) -> Option<&Blacklist> {
        self.applied.as_ref().or(self.own.as_ref())
    }

    /// Compare `merged` against the last applied merge
    pub fn diff(&self, merged: &Blacklist) -> BlacklistDiff {
        let empty = Blacklist::new();
        let last = self.applied.as_ref().unwrap_or(&empty);
        let keep: Blacklist = last.intersection(merged).cloned().collect();
        BlacklistDiff {
            added: merged.difference(&keep).cloned().collect(),
            removed: last.difference(&keep).cloned().collect(),
        }
    }

    /// Remember `merged` as the applied blacklist
    pub fn commit(&mut self, merged: Blacklist) {
        self.applied = Some(merged);
    }
}
