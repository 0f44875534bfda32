//! The scope contract plugins program against

use std::sync::{Arc, Weak};

use crate::error::ContextError;
use crate::event::{EventHandlerFn, EventOptions, Observer, Payload, StickyFn, SubscriptionToken};
use crate::plugin::PluginInstance;
use crate::types::{CapabilityKey, ScopeId};

/// Non-owning handle to a scope, as held by plugins.
pub type WeakContext = Weak<dyn Context>;

/// Operations a scope offers to the plugins it hosts.
///
/// The trait is object safe; typed conveniences live on [`ContextExt`].
pub trait Context: Send + Sync {
    /// Identity of the scope
    fn id(&self) -> ScopeId;

    /// Optional human readable name
    fn name(&self) -> Option<&str>;

    /// Weak handle suitable for storing inside plugins
    fn downgrade(&self) -> WeakContext;

    // ─── Events ──────────────────────────────────────────────────────

    /// Subscribe `handler` to `event` on this scope's local bus.
    ///
    /// With [`EventOptions::EXEC_WHEN_ADD`] the handler first runs once with
    /// no payload. A sticky value bound for `event` (here, in the child
    /// subtree or in the base) is then delivered immediately.
    fn subscribe(
        &self,
        observer: &Observer,
        event: &str,
        options: EventOptions,
        handler: EventHandlerFn,
    ) -> SubscriptionToken;

    /// Subscribe one handler to several events. Returns `None` for an empty
    /// event list.
    fn subscribe_many(
        &self,
        observer: &Observer,
        events: &[&str],
        options: EventOptions,
        handler: EventHandlerFn,
    ) -> Option<SubscriptionToken>;

    /// Cancel the handlers covered by `token`
    fn unsubscribe(&self, token: &SubscriptionToken);

    /// Cancel every handler owned by `observer`
    fn unsubscribe_all(&self, observer: &Observer);

    /// Deliver `event` here, then to extensions, the shared scope and the
    /// ancestors, visiting each scope at most once.
    fn publish(&self, event: &str, payload: Option<Payload>);

    /// Remember `value` as the latest state of `event` for late subscribers
    fn bind_sticky(&self, event: &str, value: Payload);

    /// Bind `event` to a closure that decides at replay time whether to send
    /// and what. Replaces any fixed value.
    fn bind_sticky_with(&self, event: &str, source: StickyFn);

    /// Withdraw the sticky binding of `event`. Returns whether one existed.
    fn unbind_sticky(&self, event: &str) -> bool;

    // ─── Capabilities ────────────────────────────────────────────────

    /// Resolve a capability, creating a lazy instance if needed. Logs when
    /// nothing provides it.
    fn resolve_key(&self, key: &CapabilityKey) -> Option<PluginInstance>;

    /// Like [`Context::resolve_key`] but silent on a miss
    fn try_resolve_key(&self, key: &CapabilityKey) -> Option<PluginInstance>;

    /// True if this scope itself holds a registration for `key`
    fn is_key_registered(&self, key: &CapabilityKey) -> bool;

    /// Deliver a configuration payload to a locally registered capability
    fn configure_key(&self, key: &CapabilityKey, payload: Payload) -> Result<(), ContextError>;
}

/// Typed helpers available on every [`Context`].
pub trait ContextExt: Context {
    /// Resolve capability `S`
    fn resolve<S: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<S>> {
        let key = CapabilityKey::of::<S>();
        let instance = self.resolve_key(&key)?;
        let service = instance.service::<S>();
        if service.is_none() {
            tracing::warn!(
                capability = %key,
                class = %instance.class(),
                "instance does not provide the requested capability"
            );
        }
        service
    }

    /// Resolve capability `S` without logging on a miss
    fn try_resolve<S: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<S>> {
        self.try_resolve_key(&CapabilityKey::of::<S>())?
            .service::<S>()
    }

    /// Resolve capability `S`, reporting why it is unavailable
    fn require<S: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<S>, ContextError> {
        let key = CapabilityKey::of::<S>();
        let instance = self
            .try_resolve_key(&key)
            .ok_or_else(|| ContextError::NotFound(key.to_string()))?;
        instance
            .service::<S>()
            .ok_or_else(|| ContextError::TypeMismatch {
                key: key.to_string(),
                requested: std::any::type_name::<S>().to_string(),
            })
    }

    /// True if capability `S` is registered in this scope
    fn is_registered<S: ?Sized + 'static>(&self) -> bool {
        self.is_key_registered(&CapabilityKey::of::<S>())
    }

    /// Configure capability `S`
    fn configure<S: ?Sized + 'static>(&self, payload: Payload) -> Result<(), ContextError> {
        self.configure_key(&CapabilityKey::of::<S>(), payload)
    }

    /// Subscribe with default options
    fn on<F>(&self, observer: &Observer, event: &str, f: F) -> SubscriptionToken
    where
        F: Fn(Option<&Payload>, &str) + Send + Sync + 'static,
    {
        self.subscribe(observer, event, EventOptions::NONE, Arc::new(f))
    }
}

impl<C: Context + ?Sized> ContextExt for C {}
