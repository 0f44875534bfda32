//! Error types surfaced by scope operations

use thiserror::Error;

/// Errors a context can report back to callers.
///
/// Lookups that simply miss return `None`; these variants are reserved for
/// requests that were understood but could not be honored.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// No provider is registered for the capability anywhere reachable
    #[error("capability not found: {0}")]
    NotFound(String),

    /// The capability has no registration in this scope
    #[error("capability not registered in this scope: {0}")]
    NotRegistered(String),

    /// A relationship change would break the tree or extension rules
    #[error("invalid relationship: {0}")]
    InvalidRelationship(String),

    /// The capability or provider class is suppressed by the effective blacklist
    #[error("blocked by blacklist: {0}")]
    Blacklisted(String),

    /// The live instance does not implement the requested capability type
    #[error("instance registered under {key} does not provide {requested}")]
    TypeMismatch {
        /// Capability the instance was registered under
        key: String,
        /// Rust type that was requested
        requested: String,
    },
}

impl ContextError {
    /// Create an invalid relationship error
    pub fn relationship(message: impl Into<String>) -> Self {
        Self::InvalidRelationship(message.into())
    }
}
