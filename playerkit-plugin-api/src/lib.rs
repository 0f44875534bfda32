//! playerkit-plugin-api - Plugin API for the playerkit scope runtime
//!
//! This crate provides the traits and types needed to write plugins hosted by
//! playerkit scopes. A plugin implements [`Plugin`], exposes one capability
//! through a trait object, and talks to its scope through [`Context`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use playerkit_plugin_api::{Context, ContextExt, Plugin, PluginBase, Provider, WeakContext};
//!
//! pub trait SpeedService: Send + Sync {
//!     fn rate(&self) -> f64;
//! }
//!
//! #[derive(Default)]
//! pub struct SpeedPlugin {
//!     base: PluginBase,
//! }
//!
//! impl SpeedService for SpeedPlugin {
//!     fn rate(&self) -> f64 {
//!         self.base.config::<f64>().map_or(1.0, |rate| *rate)
//!     }
//! }
//!
//! impl Plugin for SpeedPlugin {
//!     fn bind_context(&self, context: Option<WeakContext>) {
//!         self.base.bind(context);
//!     }
//! }
//!
//! let provider = Provider::new(|p: Arc<SpeedPlugin>| p as Arc<dyn SpeedService>);
//! ```

pub mod context;
pub mod error;
pub mod event;
pub mod plugin;
pub mod register;
pub mod types;

pub use context::{Context, ContextExt, WeakContext};
pub use error::ContextError;
pub use event::{
    EventHandlerFn, EventOptions, Observer, Payload, StickyFn, SubscriptionToken, WeakObserver,
    handler, payload, sticky,
};
pub use plugin::{Plugin, PluginBase, PluginInstance, Provider};
pub use register::{CreateGroup, RegisterEntry, RegisterProvider, RegisterSet};
pub use types::*;
