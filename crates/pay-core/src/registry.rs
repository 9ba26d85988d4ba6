//! # Provider Registry
//!
//! Keyed, thread-safe collection of providers. Build one at startup and
//! share it; clones point at the same map.

use crate::error::{PaymentError, PaymentResult};
use crate::provider::{ProviderInfo, ProviderSelector, SharedProvider};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

/// Registered providers keyed by name
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: Arc<RwLock<BTreeMap<String, SharedProvider>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide default instance.
    ///
    /// Prefer an explicitly constructed registry where one can be passed around.
    pub fn global() -> &'static ProviderRegistry {
        static GLOBAL: OnceLock<ProviderRegistry> = OnceLock::new();
        GLOBAL.get_or_init(ProviderRegistry::new)
    }

    /// Register under `key`; an existing entry is replaced
    pub fn register(&self, key: impl Into<String>, provider: SharedProvider) {
        let key = key.into();
        let previous = self.providers.write().insert(key.clone(), provider);
        if previous.is_some() {
            info!(provider = %key, "Replaced registered provider");
        } else {
            debug!(provider = %key, "Registered provider");
        }
    }

    /// Register under the provider's own key
    pub fn register_provider(&self, provider: SharedProvider) {
        let key = provider.key();
        self.register(key, provider);
    }

    /// Builder form of [`register`](Self::register)
    pub fn with_provider(self, key: impl Into<String>, provider: SharedProvider) -> Self {
        self.register(key, provider);
        self
    }

    /// Resolve a key, or pass an instance straight through
    pub fn get(&self, selector: impl Into<ProviderSelector>) -> PaymentResult<SharedProvider> {
        match selector.into() {
            ProviderSelector::Instance(provider) => Ok(provider),
            ProviderSelector::Key(key) => {
                let providers = self.providers.read();
                match providers.get(&key) {
                    Some(provider) => Ok(Arc::clone(provider)),
                    None => Err(PaymentError::ProviderNotFound {
                        available: providers.keys().cloned().collect(),
                        key,
                    }),
                }
            }
        }
    }

    /// Registered keys, sorted
    pub fn list_keys(&self) -> Vec<String> {
        self.providers.read().keys().cloned().collect()
    }

    /// Metadata of every registered provider, sorted by key
    pub fn describe_all(&self) -> Vec<ProviderInfo> {
        // snapshot so info() runs without the lock held
        let providers: Vec<SharedProvider> = self.providers.read().values().cloned().collect();
        providers.iter().map(|p| p.info()).collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.providers.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.providers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.read().is_empty()
    }

    /// Remove a provider, returning it if it was registered
    pub fn unregister(&self, key: &str) -> Option<SharedProvider> {
        self.providers.write().remove(key)
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.list_keys())
            .finish()
    }
}

impl FromIterator<SharedProvider> for ProviderRegistry {
    fn from_iter<I: IntoIterator<Item = SharedProvider>>(iter: I) -> Self {
        let registry = ProviderRegistry::new();
        for provider in iter {
            registry.register_provider(provider);
        }
        registry
    }
}
