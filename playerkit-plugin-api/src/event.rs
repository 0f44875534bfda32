//! Event subscription primitives
//!
//! Subscriptions are keyed by an [`Observer`]. Scopes only keep a weak view
//! of it, so dropping every clone of an observer silently retires all of its
//! handlers.

use std::any::Any;
use std::sync::{Arc, Weak};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::flag_names;

/// Opaque event payload. Consumers downcast it to the type they expect.
pub type Payload = Arc<dyn Any + Send + Sync>;

/// Callback invoked with the payload (if any) and the event name.
pub type EventHandlerFn = Arc<dyn Fn(Option<&Payload>, &str) + Send + Sync>;

/// Sticky source evaluated whenever the value is replayed. Returning `None`
/// means there is nothing to send right now.
pub type StickyFn = Arc<dyn Fn() -> Option<Payload> + Send + Sync>;

/// Wrap a value as a [`Payload`]
pub fn payload<T: Any + Send + Sync>(value: T) -> Payload {
    Arc::new(value)
}

/// Wrap a closure as an [`EventHandlerFn`]
pub fn handler<F>(f: F) -> EventHandlerFn
where
    F: Fn(Option<&Payload>, &str) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wrap a closure as a [`StickyFn`]
pub fn sticky<F>(f: F) -> StickyFn
where
    F: Fn() -> Option<Payload> + Send + Sync + 'static,
{
    Arc::new(f)
}

bitflags! {
    /// Delivery options for a subscription.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct EventOptions: u8 {
        /// Invoke the handler once right after subscribing
        const EXEC_WHEN_ADD = 1 << 0;
        /// Remove the handler after its first delivery
        const EXEC_ONLY_ONCE = 1 << 1;
    }
}

flag_names!(EventOptions);

/// Liveness token that owns a set of subscriptions.
///
/// Clones share identity. Once the last clone is dropped the observer is
/// considered gone and its handlers are pruned.
#[derive(Debug, Clone)]
pub struct Observer(Arc<Uuid>);

impl Observer {
    /// Create a fresh observer
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(Uuid::new_v4()))
    }

    /// Stable identity of this observer
    #[must_use]
    pub fn id(&self) -> Uuid {
        *self.0
    }

    /// Non-owning view used by event buses
    #[must_use]
    pub fn downgrade(&self) -> WeakObserver {
        WeakObserver {
            id: *self.0,
            token: Arc::downgrade(&self.0),
        }
    }
}

impl Default for Observer {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Observer {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Observer {}

/// Weak reference to an [`Observer`].
#[derive(Debug, Clone)]
pub struct WeakObserver {
    id: Uuid,
    token: Weak<Uuid>,
}

impl WeakObserver {
    /// Identity of the observer this was created from
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// True while at least one clone of the observer is alive
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.token.strong_count() > 0
    }

    /// True if this refers to `observer`
    #[must_use]
    pub fn is(&self, observer: &Observer) -> bool {
        self.id == observer.id()
    }
}

/// Handle returned by a subscription, used to cancel it later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionToken {
    /// One handler on one event
    Single {
        /// Event the handler listens to
        event: String,
        /// Handler identity
        id: Uuid,
    },
    /// Several handlers registered in a single call
    Group(Vec<SubscriptionToken>),
}

impl SubscriptionToken {
    /// Every single-handler token contained in this token
    #[must_use]
    pub fn flatten(&self) -> Vec<(&str, Uuid)> {
        match self {
            Self::Single { event, id } => vec![(event.as_str(), *id)],
            Self::Group(tokens) => tokens.iter().flat_map(Self::flatten).collect(),
        }
    }

    /// Number of handlers this token covers
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Single { .. } => 1,
            Self::Group(tokens) => tokens.iter().map(Self::len).sum(),
        }
    }

    /// True for an empty group
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
