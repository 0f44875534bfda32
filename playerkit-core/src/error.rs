//! Error types for playerkit-core

use std::path::PathBuf;

use thiserror::Error;

pub use playerkit_plugin_api::ContextError;

/// Top-level error type for playerkit-core
#[derive(Error, Debug)]
pub enum PlayerKitError {
    #[error("Scope error: {0}")]
    Context(#[from] ContextError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),
}

/// Errors from loading runtime configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors from installing the tracing subscriber
#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    #[error("Failed to set global subscriber: {0}")]
    AlreadyInitialized(#[from] tracing_subscriber::util::TryInitError),
}
