//! Identity types shared by scopes and plugins

use std::borrow::Cow;
use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declares `NONE` and `names()` on a bitflags type.
macro_rules! flag_names {
    ($name:ident) => {
        impl $name {
            /// The empty set
            pub const NONE: Self = Self::empty();

            /// Names of the flags that are set, in declaration order
            #[must_use]
            pub fn names(self) -> Vec<&'static str> {
                self.iter_names().map(|(name, _)| name).collect()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::NONE
            }
        }
    };
}

pub(crate) use flag_names;

bitflags! {
    /// When a registered provider gets instantiated.
    ///
    /// An empty policy behaves like [`CreatePolicy::ON_REGISTER`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct CreatePolicy: u8 {
        /// Instantiate immediately at registration
        const ON_REGISTER = 1 << 0;
        /// Instantiate on the first configuration delivered to the capability
        const ON_FIRST_CONFIGURE = 1 << 1;
        /// Instantiate on the first resolution request
        const ON_FIRST_RESOLVE = 1 << 2;
        /// Instantiate when one of the group's trigger events is observed
        const ON_EVENT = 1 << 3;
    }
}

flag_names!(CreatePolicy);

bitflags! {
    /// Per-entry registration options.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct CreateOptions: u8 {
        /// Force instantiation at registration regardless of the group policy
        const EAGER = 1 << 0;
    }
}

flag_names!(CreateOptions);

/// Unique identity of a scope, stable for its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeId(Uuid);

impl ScopeId {
    /// Generate a fresh identity
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Underlying UUID
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ScopeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identity of a capability (an abstract service contract).
///
/// Keys compare by name. [`CapabilityKey::of`] derives the name from a Rust
/// type, usually a trait object such as `dyn SpeedService`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityKey(Cow<'static, str>);

impl CapabilityKey {
    /// Key for the capability described by type `S`
    #[must_use]
    pub fn of<S: ?Sized + 'static>() -> Self {
        Self(Cow::Borrowed(std::any::type_name::<S>()))
    }

    /// Key with a fixed name
    #[must_use]
    pub const fn named(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// The key's name
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CapabilityKey {
    fn from(name: &str) -> Self {
        Self(Cow::Owned(name.to_owned()))
    }
}

impl From<String> for CapabilityKey {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

impl fmt::Display for CapabilityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a concrete provider (plugin implementation) type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderClass(Cow<'static, str>);

impl ProviderClass {
    /// Class identity of plugin type `P`
    #[must_use]
    pub fn of<P: ?Sized + 'static>() -> Self {
        Self(Cow::Borrowed(std::any::type_name::<P>()))
    }

    /// The class name
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ProviderClass {
    fn from(name: &str) -> Self {
        Self(Cow::Owned(name.to_owned()))
    }
}

impl fmt::Display for ProviderClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

const LOADED_EVENT_PREFIX: &str = "capability.loaded:";

/// Name of the event published when an instance of `key` finishes loading.
///
/// Subscribing to it after the fact still delivers the live instance as a
/// sticky value.
#[must_use]
pub fn capability_loaded_event(key: &CapabilityKey) -> String {
    format!("{LOADED_EVENT_PREFIX}{key}")
}

/// Inverse of [`capability_loaded_event`].
#[must_use]
pub fn loaded_event_key(event: &str) -> Option<CapabilityKey> {
    event
        .strip_prefix(LOADED_EVENT_PREFIX)
        .filter(|name| !name.is_empty())
        .map(CapabilityKey::from)
}
