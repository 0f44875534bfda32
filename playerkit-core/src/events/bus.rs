//! Per-scope handler table
//!
//! The bus only knows about its own subscribers. Sticky replay and
//! propagation across scopes are layered on top by [`crate::Scope`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use playerkit_plugin_api::{
    EventHandlerFn, EventOptions, Observer, Payload, SubscriptionToken, WeakObserver,
};
use tracing::trace;
use uuid::Uuid;

/// Mutable per-handler flags shared between snapshots
#[derive(Debug, Default)]
struct HandlerState {
    removed: AtomicBool,
    fired: AtomicBool,
}

#[derive(Clone)]
struct HandlerInfo {
    id: Uuid,
    observer: WeakObserver,
    options: EventOptions,
    handler: EventHandlerFn,
    state: Arc<HandlerState>,
}

/// Outcome of offering one delivery to a handler
enum Delivery {
    /// Handler ran and stays subscribed
    Delivered,
    /// Handler ran and must be removed (once-handler)
    Consumed,
    /// Handler was not invoked
    Skipped,
    /// Observer is gone; handler must be pruned
    Dead,
}

impl HandlerInfo {
    fn deliver(&self, event: &str, payload: Option<&Payload>) -> Delivery {
        if !self.observer.is_alive() {
            return Delivery::Dead;
        }
        if self.state.removed.load(Ordering::Acquire) {
            return Delivery::Skipped;
        }
        let once = self.options.contains(EventOptions::EXEC_ONLY_ONCE);
        if once
            && self
                .state
                .fired
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
        {
            return Delivery::Skipped;
        }

        (self.handler)(payload, event);

        if once {
            self.state.removed.store(true, Ordering::Release);
            Delivery::Consumed
        } else {
            Delivery::Delivered
        }
    }
}

/// Handler table of a single scope.
///
/// Handlers are invoked outside the table lock, so they may subscribe,
/// unsubscribe or publish re-entrantly.
#[derive(Default)]
pub struct EventBus {
    handlers: Mutex<HashMap<String, Vec<HandlerInfo>>>,
}

impl EventBus {
    /// Create an empty bus
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, HashMap<String, Vec<HandlerInfo>>> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a handler and honor [`EventOptions::EXEC_WHEN_ADD`]
    pub fn subscribe(
        &self,
        observer: &Observer,
        event: &str,
        options: EventOptions,
        handler: EventHandlerFn,
    ) -> SubscriptionToken {
        let token = self.insert(observer, event, options, handler);
        if options.contains(EventOptions::EXEC_WHEN_ADD) {
            self.deliver_to(&token, None);
        }
        token
    }

    /// Add a handler without invoking it
    pub fn insert(
        &self,
        observer: &Observer,
        event: &str,
        options: EventOptions,
        handler: EventHandlerFn,
    ) -> SubscriptionToken {
        let id = Uuid::new_v4();
        self.table()
            .entry(event.to_string())
            .or_default()
            .push(HandlerInfo {
                id,
                observer: observer.downgrade(),
                options,
                handler,
                state: Arc::default(),
            });
        trace!(event, handler = %id, observer = %observer.id(), "handler added");
        SubscriptionToken::Single {
            event: event.to_string(),
            id,
        }
    }

    /// Invoke only the handlers covered by `token`
    pub fn deliver_to(&self, token: &SubscriptionToken, payload: Option<&Payload>) {
        for (event, id) in token.flatten() {
            let info = self
                .table()
                .get(event)
                .and_then(|list| list.iter().find(|info| info.id == id).cloned());
            let Some(info) = info else { continue };
            match info.deliver(event, payload) {
                Delivery::Consumed | Delivery::Dead => self.remove_ids(event, &[id]),
                Delivery::Delivered | Delivery::Skipped => {}
            }
        }
    }

    /// Invoke every live handler of `event`, in subscription order
    pub fn post(&self, event: &str, payload: Option<&Payload>) {
        let snapshot = match self.table().get(event) {
            Some(list) => list.clone(),
            None => return,
        };

        let mut finished = Vec::new();
        for info in &snapshot {
            match info.deliver(event, payload) {
                Delivery::Consumed | Delivery::Dead => finished.push(info.id),
                Delivery::Delivered | Delivery::Skipped => {}
            }
        }
        if !finished.is_empty() {
            self.remove_ids(event, &finished);
        }
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

    /// Remove the handlers covered by `token`
    pub fn unsubscribe(&self, token: &SubscriptionToken) {
        for (event, id) in token.flatten() {
            self.remove_ids(event, &[id]);
        }
    }

    /// Remove every handler owned by `observer`
    pub fn unsubscribe_all(&self, observer: &Observer) {
        let mut table = self.table();
        for list in table.values_mut() {
            list.retain(|info| {
                let keep = !info.observer.is(observer);
                if !keep {
                    info.state.removed.store(true, Ordering::Release);
                }
                keep
            });
        }
        table.retain(|_, list| !list.is_empty());
    }

    /// Remove every handler
    pub fn clear(&self) {
        let mut table = self.table();
        for info in table.values().flatten() {
            info.state.removed.store(true, Ordering::Release);
        }
        table.clear();
    }

    /// Number of live handlers for `event`
    pub fn handler_count(&self, event: &str) -> usize {
        self.table().get(event).map_or(0, |list| {
            list.iter()
                .filter(|info| info.observer.is_alive())
                .count()
        })
    }

    /// Events that currently have at least one live handler, sorted
    pub fn events(&self) -> Vec<String> {
        let mut events: Vec<String> = self
            .table()
            .iter()
            .filter(|(_, list)| list.iter().any(|info| info.observer.is_alive()))
            .map(|(event, _)| event.clone())
            .collect();
        events.sort();
        events
    }

    fn remove_ids(&self, event: &str, ids: &[Uuid]) {
        let mut table = self.table();
        let Some(list) = table.get_mut(event) else {
            return;
        };
        list.retain(|info| {
            let keep = !ids.contains(&info.id);
            if !keep {
                info.state.removed.store(true, Ordering::Release);
            }
            keep
        });
        if list.is_empty() {
            table.remove(event);
        }
    }
}
