//! Runtime configuration
//!
//! TOML files are parsed into raw layers with optional fields, merged, and
//! finalized with defaults:
//!
//! ```toml
//! [logging]
//! filter = "playerkit_core=debug"
//! ansi = false
//!
//! [scopes.player]
//! blacklist = ["DanmakuPlugin"]
//! ```

mod loader;
mod types;

pub use loader::{CONFIG_ENV_VAR, ConfigLoader};
pub use types::{DEFAULT_LOG_FILTER, LoggingConfig, RuntimeConfig, ScopeConfig};
