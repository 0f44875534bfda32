//! Registration governance: blacklists and register providers

mod blacklist;

use std::sync::{Arc, Weak};

use playerkit_plugin_api::{RegisterProvider, RegisterSet};

pub use blacklist::{Blacklist, BlacklistDiff, BlacklistState, blocks, merge};

/// A register provider attached to a scope, with the set it declared.
///
/// The set is kept so suppressed entries can be re-registered when the
/// blacklist shrinks.
pub(crate) struct ProviderRecord {
    pub provider: Weak<dyn RegisterProvider>,
    pub set: RegisterSet,
}

impl ProviderRecord {
    pub fn is(&self, provider: &Arc<dyn RegisterProvider>) -> bool {
        Weak::ptr_eq(&self.provider, &Arc::downgrade(provider))
    }
}
