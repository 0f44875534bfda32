//! A single capability registration

use playerkit_plugin_api::{
    CapabilityKey, CreateOptions, CreatePolicy, Observer, Payload, Provider, ProviderClass,
};

/// How and when a scope produces the instance for one capability.
#[derive(Clone)]
pub struct ServiceEntry {
    pub key: CapabilityKey,
    pub class: ProviderClass,
    /// `None` for instances handed over through `register_instance`
    pub provider: Option<Provider>,
    pub policy: CreatePolicy,
    pub options: CreateOptions,
    pub events: Vec<String>,
    /// Latest configuration delivered to the capability
    pub config: Option<Payload>,
    /// Owns the trigger subscriptions of an `ON_EVENT` entry
    pub trigger: Option<Observer>,
}

impl ServiceEntry {
    /// Entry produced from a provider.
    ///
    /// An empty policy, or the `EAGER` option, means the instance is created
    /// at registration.
    pub fn from_provider(
        provider: Provider,
        policy: CreatePolicy,
        options: CreateOptions,
        events: Vec<String>,
    ) -> Self {
        let mut policy = policy;
        if policy.is_empty() || options.contains(CreateOptions::EAGER) {
            policy |= CreatePolicy::ON_REGISTER;
        }
        let trigger = (policy.contains(CreatePolicy::ON_EVENT) && !events.is_empty())
            .then(Observer::new);
        Self {
            key: provider.key().clone(),
            class: provider.class().clone(),
            provider: Some(provider),
            policy,
            options,
            events,
            config: None,
            trigger,
        }
    }

    /// Entry describing an instance that already exists
    pub fn for_instance(key: CapabilityKey, class: ProviderClass) -> Self {
        Self {
            key,
            class,
            provider: None,
            policy: CreatePolicy::ON_REGISTER,
            options: CreateOptions::NONE,
            events: Vec::new(),
            config: None,
            trigger: None,
        }
    }

    /// True if `identifier` names this entry's capability or provider class
    pub fn matches(&self, identifier: &str) -> bool {
        self.key.as_str() == identifier || self.class.as_str() == identifier
    }

    /// True if the entry is instantiated when first resolved
    pub fn creates_on_resolve(&self) -> bool {
        self.policy.contains(CreatePolicy::ON_FIRST_RESOLVE)
    }

    /// True if the entry is instantiated when first configured
    pub fn creates_on_configure(&self) -> bool {
        self.policy.contains(CreatePolicy::ON_FIRST_CONFIGURE)
    }

    /// True if the entry is instantiated at registration
    pub fn creates_on_register(&self) -> bool {
        self.policy.contains(CreatePolicy::ON_REGISTER)
    }
}

impl std::fmt::Debug for ServiceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceEntry")
            .field("key", &self.key)
            .field("class", &self.class)
            .field("policy", &self.policy.names())
            .field("options", &self.options.names())
            .field("events", &self.events)
            .field("configured", &self.config.is_some())
            .finish_non_exhaustive()
    }
}
