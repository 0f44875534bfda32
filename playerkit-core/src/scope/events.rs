//! Subscriptions, sticky values and propagation across scopes

use std::collections::HashSet;
use std::sync::Arc;

use playerkit_plugin_api::{
    EventHandlerFn, EventOptions, Observer, Payload, ScopeId, StickyFn, SubscriptionToken,
    capability_loaded_event, loaded_event_key,
};
use tracing::{debug, trace, trace_span};

use super::{Scope, live, upgrade};

/// A sticky binding: a fixed value or a closure consulted on replay
#[derive(Clone)]
pub(crate) enum StickySource {
    Value(Payload),
    Computed(StickyFn),
}

impl StickySource {
    fn evaluate(&self) -> Option<Payload> {
        match self {
            Self::Value(value) => Some(Arc::clone(value)),
            Self::Computed(source) => source(),
        }
    }
}

impl Scope {
    /// Subscribe `handler` to `event` on the local bus.
    ///
    /// [`EventOptions::EXEC_WHEN_ADD`] first invokes the handler once with
    /// no payload. Then, if a sticky value for `event` is found here, in the
    /// child subtree or in the base, the handler receives it right away.
    /// A once-handler stops after whichever delivery comes first.
    pub fn subscribe(
        &self,
        observer: &Observer,
        event: &str,
        options: EventOptions,
        handler: EventHandlerFn,
    ) -> SubscriptionToken {
        let token = self.bus.subscribe(observer, event, options, handler);
        if let Some(value) = self.find_sticky(event, false) {
            trace!(scope = %self.label(), event, "replaying sticky value");
            self.bus.deliver_to(&token, Some(&value));
        }
        token
    }

    /// Subscribe one handler to several events
    pub fn subscribe_many(
        &self,
        observer: &Observer,
        events: &[&str],
        options: EventOptions,
        handler: EventHandlerFn,
    ) -> Option<SubscriptionToken> {
        if events.is_empty() {
            return None;
        }
        let tokens = events
            .iter()
            .map(|event| self.subscribe(observer, event, options, Arc::clone(&handler)))
            .collect();
        Some(SubscriptionToken::Group(tokens))
    }

    /// Remove the handlers covered by `token` from the local bus
    pub fn unsubscribe(&self, token: &SubscriptionToken) {
        self.bus.unsubscribe(token);
    }

    /// Remove every local handler owned by `observer`
    pub fn unsubscribe_all(&self, observer: &Observer) {
        self.bus.unsubscribe_all(observer);
    }

    /// Deliver `event` to this scope, its extensions, its shared peer and
    /// its ancestors. Each scope is visited at most once.
    pub fn publish(&self, event: &str, payload: Option<Payload>) {
        let _span = trace_span!("publish", scope = %self.label(), event).entered();
        let mut visited = HashSet::new();
        self.propagate(event, payload.as_ref(), &mut visited);
        trace!(scopes = visited.len(), "event delivered");
    }

    fn propagate(&self, event: &str, payload: Option<&Payload>, visited: &mut HashSet<ScopeId>) {
        if !visited.insert(self.id) {
            return;
        }
        self.bus.post(event, payload);

        let (extensions, shared, parent) = {
            let state = self.state();
            (
                live(&state.extensions),
                upgrade(&state.shared),
                upgrade(&state.parent),
            )
        };
        for extension in extensions {
            extension.propagate(event, payload, visited);
        }
        if let Some(shared) = shared {
            shared.propagate(event, payload, visited);
        }
        if let Some(parent) = parent {
            parent.propagate(event, payload, visited);
        }
    }

    /// Remember `value` as the latest state of `event`
    pub fn bind_sticky(&self, event: &str, value: Payload) {
        self.state()
            .sticky
            .insert(event.to_string(), StickySource::Value(value));
        trace!(scope = %self.label(), event, "sticky value bound");
    }

    /// Bind `event` to `source`, evaluated each time the sticky value is
    /// looked up or reissued.
    pub fn bind_sticky_with(&self, event: &str, source: StickyFn) {
        self.state()
            .sticky
            .insert(event.to_string(), StickySource::Computed(source));
        trace!(scope = %self.label(), event, "sticky source bound");
    }

    /// Forget the sticky binding of `event`. Returns whether one existed.
    pub fn unbind_sticky(&self, event: &str) -> bool {
        let removed = self.state().sticky.remove(event).is_some();
        if removed {
            trace!(scope = %self.label(), event, "sticky binding removed");
        }
        removed
    }

    /// Sticky value visible from this scope: local values and live
    /// capability instances first, then the child subtree, then the base.
    pub fn sticky_value(&self, event: &str) -> Option<Payload> {
        self.find_sticky(event, false)
    }

    fn find_sticky(&self, event: &str, from_child: bool) -> Option<Payload> {
        let (local, instance, children, base) = {
            let state = self.state();
            (
                state.sticky.get(event).cloned(),
                loaded_event_key(event).and_then(|key| state.registry.instance(&key)),
                live(&state.children),
                upgrade(&state.base),
            )
        };

        // Computed sources run without the state lock held
        if let Some(value) = local.and_then(|source| source.evaluate()) {
            return Some(value);
        }
        if let Some(instance) = instance {
            let value: Payload = Arc::new(instance);
            return Some(value);
        }
        for child in children {
            if let Some(value) = child.find_sticky(event, true) {
                return Some(value);
            }
        }
        if from_child {
            return None;
        }
        base.and_then(|base| base.find_sticky(event, false))
    }

    /// Every sticky value in this subtree, including loaded-capability
    /// markers for live instances.
    fn subtree_sticky(&self) -> Vec<(String, Payload)> {
        let (sources, markers, children) = {
            let state = self.state();
            let sources: Vec<(String, StickySource)> = state
                .sticky
                .iter()
                .map(|(event, source)| (event.clone(), source.clone()))
                .collect();
            let markers: Vec<(String, Payload)> = state
                .registry
                .keyed_instances()
                .into_iter()
                .map(|(key, instance)| {
                    let value: Payload = Arc::new(instance);
                    (capability_loaded_event(&key), value)
                })
                .collect();
            (sources, markers, live(&state.children))
        };

        let mut values: Vec<(String, Payload)> = sources
            .into_iter()
            .filter_map(|(event, source)| source.evaluate().map(|value| (event, value)))
            .collect();
        values.extend(markers);
        for child in children {
            values.extend(child.subtree_sticky());
        }
        values
    }

    /// Replay this subtree's sticky values to `target`'s local subscribers
    pub(crate) fn reissue_sticky_to(&self, target: &Scope) {
        let values = self.subtree_sticky();
        if values.is_empty() {
            return;
        }
        debug!(
            from = %self.label(),
            to = %target.label(),
            count = values.len(),
            "reissuing sticky values"
        );
        for (event, value) in values {
            target.bus.post(&event, Some(&value));
        }
    }
}
