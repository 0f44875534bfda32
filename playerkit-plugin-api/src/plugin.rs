//! Plugins, live instances and the providers that build them

use std::any::Any;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::context::{Context, WeakContext};
use crate::event::Payload;
use crate::types::{CapabilityKey, ProviderClass};

/// A unit of functionality hosted by a scope.
///
/// Every hook has a default no-op implementation, so plugins only override
/// what they care about. Hooks are invoked without any scope lock held, so a
/// plugin may freely resolve, publish or subscribe from inside them.
pub trait Plugin: Any + Send + Sync {
    /// Bind (or with `None`, unbind) the owning scope
    fn bind_context(&self, _context: Option<WeakContext>) {}

    /// Receive a configuration payload
    fn configure(&self, _payload: &Payload) {}

    /// Called once the instance is recorded in its scope
    fn on_load(&self, _context: &dyn Context) {}

    /// Called when the instance leaves its scope
    fn on_unload(&self, _context: &dyn Context) {}

    // ─── Relationship notifications (default no-ops) ─────────────────

    /// The owning scope was attached under `parent`
    fn on_attached_to_parent(&self, _parent: &dyn Context) {}

    /// The owning scope is about to be detached from `parent`
    fn on_detaching_from_parent(&self, _parent: &dyn Context) {}

    /// `child` was attached under the owning scope
    fn on_child_attached(&self, _child: &dyn Context) {}

    /// `child` is about to be detached from the owning scope
    fn on_child_detaching(&self, _child: &dyn Context) {}

    /// The owning scope became an extension of `base`
    fn on_extended(&self, _base: &dyn Context) {}

    /// The owning scope is about to stop extending `base`
    fn on_unextending(&self, _base: &dyn Context) {}
}

/// Reusable state for plugins that want to remember their scope and the
/// last configuration they received.
#[derive(Default)]
pub struct PluginBase {
    context: RwLock<Option<WeakContext>>,
    config: RwLock<Option<Payload>>,
}

impl PluginBase {
    /// Create an unbound base
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store (or clear) the owning scope
    pub fn bind(&self, context: Option<WeakContext>) {
        *self
            .context
            .write()
            .unwrap_or_else(PoisonError::into_inner) = context;
    }

    /// The owning scope if it is still alive
    #[must_use]
    pub fn context(&self) -> Option<Arc<dyn Context>> {
        self.context
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(|weak| weak.upgrade())
    }

    /// Store the latest configuration payload
    pub fn set_config(&self, payload: &Payload) {
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(payload));
    }

    /// Latest configuration downcast to `T`
    #[must_use]
    pub fn config<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let payload = self
            .config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()?;
        payload.downcast::<T>().ok()
    }
}

impl fmt::Debug for PluginBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginBase")
            .field("bound", &self.context().is_some())
            .finish_non_exhaustive()
    }
}

/// A live plugin together with the capability view it was registered for.
#[derive(Clone)]
pub struct PluginInstance {
    plugin: Arc<dyn Plugin>,
    service: Arc<dyn Any + Send + Sync>,
    class: ProviderClass,
}

impl PluginInstance {
    /// Wrap `plugin`, exposing it through the capability type `S`
    pub fn new<P, S>(plugin: Arc<P>, cast: impl FnOnce(Arc<P>) -> Arc<S>) -> Self
    where
        P: Plugin,
        S: ?Sized + Send + Sync + 'static,
    {
        let service: Arc<S> = cast(Arc::clone(&plugin));
        Self {
            plugin,
            service: Arc::new(service),
            class: ProviderClass::of::<P>(),
        }
    }

    /// Wrap a plugin that serves as its own capability
    pub fn standalone<P: Plugin>(plugin: Arc<P>) -> Self {
        Self::new(plugin, |p| p)
    }

    /// Lifecycle view of the instance
    #[must_use]
    pub fn plugin(&self) -> &Arc<dyn Plugin> {
        &self.plugin
    }

    /// Concrete provider class
    #[must_use]
    pub fn class(&self) -> &ProviderClass {
        &self.class
    }

    /// Capability view, if the instance was registered as `S`
    #[must_use]
    pub fn service<S: ?Sized + 'static>(&self) -> Option<Arc<S>> {
        self.service.downcast_ref::<Arc<S>>().cloned()
    }

    /// True if both handles refer to the same plugin object
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.plugin, &other.plugin)
    }
}

impl fmt::Debug for PluginInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginInstance")
            .field("class", &self.class)
            .finish_non_exhaustive()
    }
}

type Factory = Arc<dyn Fn() -> PluginInstance + Send + Sync>;

/// Recipe for producing instances of one provider class under one
/// capability key.
#[derive(Clone)]
pub struct Provider {
    class: ProviderClass,
    key: CapabilityKey,
    factory: Factory,
}

impl Provider {
    /// Provider for `P::default()` serving capability `S`
    pub fn new<P, S>(cast: fn(Arc<P>) -> Arc<S>) -> Self
    where
        P: Plugin + Default,
        S: ?Sized + Send + Sync + 'static,
    {
        Self::with_factory(P::default, cast)
    }

    /// Provider built by `make`, serving capability `S`
    pub fn with_factory<P, S, F>(make: F, cast: fn(Arc<P>) -> Arc<S>) -> Self
    where
        P: Plugin,
        S: ?Sized + Send + Sync + 'static,
        F: Fn() -> P + Send + Sync + 'static,
    {
        Self {
            class: ProviderClass::of::<P>(),
            key: CapabilityKey::of::<S>(),
            factory: Arc::new(move || PluginInstance::new(Arc::new(make()), cast)),
        }
    }

    /// Provider for a plugin with no separate capability; the key is the
    /// plugin's own type.
    pub fn standalone<P: Plugin + Default>() -> Self {
        Self {
            class: ProviderClass::of::<P>(),
            key: CapabilityKey::of::<P>(),
            factory: Arc::new(|| PluginInstance::standalone(Arc::new(P::default()))),
        }
    }

    /// Register under `key` instead of the key derived from the capability type
    #[must_use]
    pub fn with_key(mut self, key: impl Into<CapabilityKey>) -> Self {
        self.key = key.into();
        self
    }

    /// Capability this provider serves
    #[must_use]
    pub fn key(&self) -> &CapabilityKey {
        &self.key
    }

    /// Concrete class this provider instantiates
    #[must_use]
    pub fn class(&self) -> &ProviderClass {
        &self.class
    }

    /// Build a fresh, unbound instance
    #[must_use]
    pub fn instantiate(&self) -> PluginInstance {
        (self.factory)()
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("class", &self.class)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}
