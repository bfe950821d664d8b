//! In-memory mocks

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::security::{KeychainError, SecretProvider};

type StorageData = Arc<Mutex<HashMap<String, String>>>;

/// In-memory keychain with the same contract as `KeychainProvider`
///
/// Clones share storage, so a test can hand one clone to the code under test
/// and inspect the other. Write failures can be injected with
/// [`MockKeychainProvider::fail_writes`].
#[derive(Debug, Clone)]
pub struct MockKeychainProvider {
    storage: StorageData,
    fail_writes: Arc<Mutex<bool>>,
    service_name: String,
}

impl MockKeychainProvider {
    /// Create an empty mock keychain namespaced by `service_name`
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            storage: Arc::new(Mutex::new(HashMap::new())),
            fail_writes: Arc::new(Mutex::new(false)),
            service_name: service_name.into(),
        }
    }

    /// Make every subsequent `set_secret` fail with `AccessFailed`
    pub fn fail_writes(&self, enabled: bool) {
        *self.fail_writes.lock() = enabled;
    }

    /// Number of stored entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.storage.lock().len()
    }

    /// Whether no entries are stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.storage.lock().is_empty()
    }

    /// Service name this mock was created with
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

impl Default for MockKeychainProvider {
    fn default() -> Self {
        Self::new("tokenline-test")
    }
}

impl SecretProvider for MockKeychainProvider {
    fn set_secret(&self, key: &str, value: &str) -> Result<(), KeychainError> {
        if *self.fail_writes.lock() {
            return Err(KeychainError::AccessFailed(format!("injected write failure for {key}")));
        }
        self.storage.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get_secret(&self, key: &str) -> Result<String, KeychainError> {
        self.storage.lock().get(key).cloned().ok_or(KeychainError::NotFound)
    }

    fn delete_secret(&self, key: &str) -> Result<(), KeychainError> {
        self.storage.lock().remove(key);
        Ok(())
    }

    fn secret_exists(&self, key: &str) -> bool {
        self.storage.lock().contains_key(key)
    }
}
