//! Keychain-backed durable store

use tokenline_common::security::{KeychainError, KeychainProvider, SecretProvider};
use tokenline_core::KeyValueStore;
use tokenline_domain::StoreError;
use tracing::debug;

use crate::errors::IntoStoreError;

/// Durable [`KeyValueStore`] over a [`SecretProvider`]
///
/// Each key maps to one keychain entry under the provider's service name.
#[derive(Debug, Clone)]
pub struct KeychainStore<P: SecretProvider = KeychainProvider> {
    provider: P,
}

impl KeychainStore {
    /// Store backed by the platform keychain under `service_name`
    pub fn new(service_name: impl Into<String>) -> Self {
        Self { provider: KeychainProvider::new(service_name) }
    }
}

impl<P: SecretProvider> KeychainStore<P> {
    pub fn with_provider(provider: P) -> Self {
        Self { provider }
    }

    #[must_use]
    pub fn provider(&self) -> &P {
        &self.provider
    }
}

impl<P: SecretProvider> KeyValueStore for KeychainStore<P> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.provider.get_secret(key) {
            Ok(value) => Ok(Some(value)),
            Err(KeychainError::NotFound) => {
                debug!(key, "No keychain entry");
                Ok(None)
            }
            Err(e) => Err(e.into_store()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.provider.set_secret(key, value).map_err(IntoStoreError::into_store)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.provider.delete_secret(key).map_err(IntoStoreError::into_store)
    }
}
