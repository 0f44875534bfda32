//! Tree, extension and shared-peer relationships

use std::sync::Arc;

use playerkit_plugin_api::ContextError;
use tracing::{debug, warn};

use super::{Scope, live, push_live, upgrade};

impl Scope {
    // ─── Queries ─────────────────────────────────────────────────────

    /// Parent scope, if attached and still alive
    pub fn parent(&self) -> Option<Arc<Scope>> {
        upgrade(&self.state().parent)
    }

    /// Live children in attachment order
    pub fn children(&self) -> Vec<Arc<Scope>> {
        live(&self.state().children)
    }

    /// Base scope, if this scope is an extension
    pub fn base(&self) -> Option<Arc<Scope>> {
        upgrade(&self.state().base)
    }

    /// Live extensions in attachment order
    pub fn extensions(&self) -> Vec<Arc<Scope>> {
        live(&self.state().extensions)
    }

    /// Bound shared peer, if any
    pub fn shared(&self) -> Option<Arc<Scope>> {
        upgrade(&self.state().shared)
    }

    /// True if `other` is this scope or one of its ancestors
    pub fn is_descendant_of(&self, other: &Scope) -> bool {
        if self.is(other) {
            return true;
        }
        let mut current = self.parent();
        while let Some(scope) = current {
            if scope.is(other) {
                return true;
            }
            current = scope.parent();
        }
        false
    }

    /// True if this scope is `other` or one of its ancestors
    pub fn is_ancestor_of(&self, other: &Scope) -> bool {
        other.is_descendant_of(self)
    }

    /// True if this scope extends `other`
    pub fn is_extension_of(&self, other: &Scope) -> bool {
        self.base().is_some_and(|base| base.is(other))
    }

    /// True if `other` extends this scope
    pub fn is_base_of(&self, other: &Scope) -> bool {
        other.is_extension_of(self)
    }

    // ─── Tree ────────────────────────────────────────────────────────

    /// Attach `child` under this scope.
    ///
    /// Attaching a child that is already ours is a no-op. The child's
    /// blacklist is recomputed, plugins on both sides are notified and the
    /// child subtree's sticky values are replayed to this scope's local
    /// subscribers.
    pub fn attach_child(&self, child: &Arc<Scope>) -> Result<(), ContextError> {
        if self.is(child) {
            return Err(self.reject("a scope cannot be its own child"));
        }
        if let Some(parent) = child.parent() {
            if parent.is(self) {
                return Ok(());
            }
            return Err(self.reject(format!(
                "scope {} already has parent {}",
                child.label(),
                parent.label()
            )));
        }
        if child.is_ancestor_of(self) {
            return Err(self.reject(format!(
                "scope {} is an ancestor of {}",
                child.label(),
                self.label()
            )));
        }

        push_live(&mut self.state().children, child);
        child.state().parent = Some(self.weak());

        child.refresh_blacklist();

        for instance in child.instances() {
            instance.plugin().on_attached_to_parent(self);
        }
        for instance in self.instances() {
            instance.plugin().on_child_attached(&**child);
        }

        child.reissue_sticky_to(self);
        debug!(parent = %self.label(), child = %child.label(), "child attached");
        Ok(())
    }

    /// Attach `child`, then run `build` with the child and this scope
    pub fn attach_child_with<F>(&self, child: &Arc<Scope>, build: F) -> Result<(), ContextError>
    where
        F: FnOnce(&Scope, &Scope),
    {
        self.attach_child(child)?;
        build(&**child, self);
        Ok(())
    }

    /// Detach `child` if it is attached here. Returns false otherwise.
    pub fn detach_child(&self, child: &Arc<Scope>) -> bool {
        match child.parent() {
            Some(parent) if parent.is(self) => child.detach_from_parent(),
            _ => {
                warn!(parent = %self.label(), child = %child.label(), "not a child of this scope");
                false
            }
        }
    }

    /// Detach this scope from its parent. Returns false if there is none.
    pub fn detach_from_parent(&self) -> bool {
        let Some(parent) = self.parent() else {
            // A parent dropped without detaching may still shape the blacklist
            let stale = self.state().parent.take().is_some();
            if stale {
                self.refresh_blacklist();
            }
            return false;
        };

        for instance in self.instances() {
            instance.plugin().on_detaching_from_parent(&*parent);
        }
        for instance in parent.instances() {
            instance.plugin().on_child_detaching(self);
        }

        let me = self.weak();
        parent
            .state()
            .children
            .retain(|c| !c.ptr_eq(&me) && c.strong_count() > 0);
        self.state().parent = None;

        self.refresh_blacklist();
        debug!(parent = %parent.label(), child = %self.label(), "child detached");
        true
    }

    // ─── Extensions ──────────────────────────────────────────────────

    /// Make `extension` extend this scope.
    ///
    /// A scope that already has a base cannot receive extensions, and a
    /// scope that has extensions cannot become one.
    pub fn attach_extension(&self, extension: &Arc<Scope>) -> Result<(), ContextError> {
        if self.is(extension) {
            return Err(self.reject("a scope cannot extend itself"));
        }
        if let Some(base) = extension.base() {
            if base.is(self) {
                return Ok(());
            }
            return Err(self.reject(format!(
                "scope {} already extends {}",
                extension.label(),
                base.label()
            )));
        }
        if self.base().is_some() {
            return Err(self.reject(format!(
                "scope {} is an extension and cannot be extended",
                self.label()
            )));
        }
        if !extension.extensions().is_empty() {
            return Err(self.reject(format!(
                "scope {} has extensions and cannot become one",
                extension.label()
            )));
        }

        push_live(&mut self.state().extensions, extension);
        extension.state().base = Some(self.weak());

        for instance in extension.instances() {
            instance.plugin().on_extended(self);
        }
        debug!(base = %self.label(), extension = %extension.label(), "extension attached");
        Ok(())
    }

    /// Detach `extension` if it extends this scope. Returns false otherwise.
    pub fn detach_extension(&self, extension: &Arc<Scope>) -> bool {
        if extension.is_extension_of(self) {
            extension.detach_from_base()
        } else {
            warn!(base = %self.label(), extension = %extension.label(), "not an extension of this scope");
            false
        }
    }

    /// Stop extending the current base. Returns false if there is none.
    pub fn detach_from_base(&self) -> bool {
        let Some(base) = self.base() else {
            self.state().base = None;
            return false;
        };

        for instance in self.instances() {
            instance.plugin().on_unextending(&*base);
        }

        let me = self.weak();
        base.state()
            .extensions
            .retain(|e| !e.ptr_eq(&me) && e.strong_count() > 0);
        self.state().base = None;
        debug!(base = %base.label(), extension = %self.label(), "extension detached");
        true
    }

    fn reject(&self, reason: impl Into<String>) -> ContextError {
        let reason = reason.into();
        warn!(scope = %self.label(), %reason, "relationship change rejected");
        ContextError::relationship(reason)
    }

    // ─── Shared peer ─────────────────────────────────────────────────

    /// Forward published events to `shared` as well
    pub fn bind_shared(&self, shared: &Arc<Scope>) {
        if self.is(shared) {
            warn!(scope = %self.label(), "ignoring shared binding to self");
            return;
        }
        self.state().shared = Some(Arc::downgrade(shared));
        debug!(scope = %self.label(), shared = %shared.label(), "shared scope bound");
    }

    /// Drop the shared peer link
    pub fn unbind_shared(&self) {
        self.state().shared = None;
    }
}
