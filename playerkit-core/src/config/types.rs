use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawRuntimeConfig {
    #[serde(default)]
    pub logging: RawLoggingConfig,

    #[serde(default)]
    pub scopes: BTreeMap<String, RawScopeConfig>,
}

/// Logging config as stored in TOML (optional fields for proper merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawLoggingConfig {
    /// `EnvFilter` directives, e.g. `"playerkit_core=debug"`
    pub filter: Option<String>,

    /// Colored output
    pub ansi: Option<bool>,

    /// Include the event target in each line
    pub with_target: Option<bool>,
}

/// Scope config as stored in TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawScopeConfig {
    /// Capability keys or provider class names to suppress
    pub blacklist: Option<Vec<String>>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub scopes: BTreeMap<String, ScopeConfig>,
}

impl RuntimeConfig {
    /// Configuration for the scope called `name`, if any
    pub fn scope(&self, name: &str) -> Option<&ScopeConfig> {
        self.scopes.get(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `EnvFilter` directives; `RUST_LOG` takes precedence when set
    pub filter: String,

    /// Colored output
    pub ansi: bool,

    /// Include the event target in each line
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            ansi: true,
            with_target: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ScopeConfig {
    /// Capability keys or provider class names to suppress
    #[serde(default)]
    pub blacklist: Option<Vec<String>>,
}

impl ScopeConfig {
    /// The blacklist as a set, if one is configured
    pub fn blacklist_set(&self) -> Option<HashSet<String>> {
        self.blacklist
            .as_ref()
            .map(|ids| ids.iter().cloned().collect())
    }
}

/// Default log filter
pub const DEFAULT_LOG_FILTER: &str = "info";
