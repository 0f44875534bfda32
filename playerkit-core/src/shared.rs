//! Registry of named shared scopes
//!
//! A shared scope is a peer that several scopes bind to so published events
//! reach all of them. The registry only holds weak references: a shared
//! scope lives as long as someone owns it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::debug;

use crate::scope::Scope;

#[derive(Debug, Default)]
pub struct SharedScopes {
    scopes: Mutex<HashMap<String, Weak<Scope>>>,
}

impl SharedScopes {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, HashMap<String, Weak<Scope>>> {
        self.scopes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The shared scope called `name`, created on first use.
    ///
    /// Created scopes are named `"<name>(shared)"`.
    pub fn scope(&self, name: &str) -> Arc<Scope> {
        let mut table = self.table();
        if let Some(scope) = table.get(name).and_then(Weak::upgrade) {
            return scope;
        }
        let scope = Scope::named(format!("{name}(shared)"));
        table.insert(name.to_string(), Arc::downgrade(&scope));
        debug!(name, "shared scope created");
        scope
    }

    /// The shared scope called `name` if it is still alive
    pub fn get(&self, name: &str) -> Option<Arc<Scope>> {
        self.table().get(name).and_then(Weak::upgrade)
    }

    /// Forget entries whose scope has been dropped, returning how many
    pub fn prune(&self) -> usize {
        let mut table = self.table();
        let before = table.len();
        table.retain(|_, scope| scope.strong_count() > 0);
        before - table.len()
    }

    /// Number of live shared scopes
    pub fn len(&self) -> usize {
        self.table()
            .values()
            .filter(|scope| scope.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
