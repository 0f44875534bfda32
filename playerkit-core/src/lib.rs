//! playerkit-core: hierarchical plugin scopes with an event bus
//!
//! This crate provides the runtime that hosts playerkit plugins:
//!
//! - **Scopes** - [`Scope`] nodes form a tree (parent/children) and an
//!   extension relation (base/extensions), each hosting its own capability
//!   registrations
//! - **Capabilities** - providers are registered under a capability key and
//!   instantiated according to a [`CreatePolicy`]; resolution searches the
//!   local scope, then children, then the base
//! - **Events** - each scope owns an [`EventBus`]; publishing propagates to
//!   extensions, the shared peer and ancestors, and sticky values replay to
//!   late subscribers
//! - **Governance** - blacklists compose down the tree and suppress or
//!   restore registrations declared by [`RegisterProvider`]s
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use playerkit_core::{ContextExt, CreateOptions, CreatePolicy, Plugin, Provider, Scope};
//!
//! trait SpeedService: Send + Sync {
//!     fn rate(&self) -> f64;
//! }
//!
//! #[derive(Default)]
//! struct SpeedPlugin;
//!
//! impl SpeedService for SpeedPlugin {
//!     fn rate(&self) -> f64 {
//!         1.0
//!     }
//! }
//!
//! impl Plugin for SpeedPlugin {}
//!
//! let player = Scope::named("player");
//! let controls = Scope::named("controls");
//! player.attach_child(&controls).unwrap();
//!
//! controls
//!     .register(
//!         Provider::new(|p: Arc<SpeedPlugin>| p as Arc<dyn SpeedService>),
//!         CreatePolicy::ON_FIRST_RESOLVE,
//!         CreateOptions::NONE,
//!     )
//!     .unwrap();
//!
//! // Found in the child subtree and created on first use.
//! let speed = player.resolve::<dyn SpeedService>().unwrap();
//! assert_eq!(speed.rate(), 1.0);
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────── Scope ─────────────────────────────┐
//! │  ServiceTable        EventBus          sticky values            │
//! │  (entries +          (handlers by      (event -> payload)       │
//! │   live instances)     event name)                               │
//! │                                                                 │
//! │  parent ▲   children ▼   base ◀ ▶ extensions   shared ◀ ▶ peer  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod governance;
pub mod logging;
mod registry;
mod scope;
pub mod shared;
pub mod snapshot;

// Re-export key types for convenience
pub use config::{ConfigLoader, LoggingConfig, RuntimeConfig, ScopeConfig};
pub use error::{ConfigError, LoggingError, PlayerKitError};
pub use events::EventBus;
pub use governance::Blacklist;
pub use logging::init_tracing;
pub use scope::Scope;
pub use shared::SharedScopes;
pub use snapshot::{RegistrationSnapshot, ScopeSnapshot};

pub use playerkit_plugin_api::{
    CapabilityKey, Context, ContextError, ContextExt, CreateGroup, CreateOptions, CreatePolicy,
    EventHandlerFn, EventOptions, Observer, Payload, Plugin, PluginBase, PluginInstance, Provider,
    ProviderClass, RegisterEntry, RegisterProvider, RegisterSet, ScopeId, StickyFn,
    SubscriptionToken, WeakContext, capability_loaded_event, handler, payload, sticky,
};
