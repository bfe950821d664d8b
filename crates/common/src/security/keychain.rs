//! Platform keychain provider
//!
//! Thin wrapper over the `keyring` crate. Every entry lives under the
//! provider's service name; the entry's user field is the logical key.
//!
//! ```no_run
//! use tokenline_common::security::{KeychainProvider, SecretProvider};
//!
//! let keychain = KeychainProvider::new("tokenline");
//! keychain.set_secret("session-store-key", "{}")?;
//! let stored = keychain.get_secret("session-store-key")?;
//! assert_eq!(stored, "{}");
//! # Ok::<(), tokenline_common::security::KeychainError>(())
//! ```

use keyring::Entry;
use thiserror::Error;
use tracing::debug;

use super::traits::SecretProvider;

/// Errors raised by keychain operations
#[derive(Debug, Error)]
pub enum KeychainError {
    /// Keychain access failed (permission denied, not available, etc.)
    #[error("Keychain access failed: {0}")]
    AccessFailed(String),

    /// Entry not found in keychain
    #[error("Entry not found")]
    NotFound,
}

/// Keychain-backed secret storage for one service
#[derive(Debug, Clone)]
pub struct KeychainProvider {
    service_name: String,
}

impl KeychainProvider {
    /// Create a provider whose entries are grouped under `service_name`
    pub fn new(service_name: impl Into<String>) -> Self {
        Self { service_name: service_name.into() }
    }

    /// Service name entries are grouped under
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    fn create_entry(&self, key: &str) -> Result<Entry, KeychainError> {
        Entry::new(&self.service_name, key).map_err(|e| {
            KeychainError::AccessFailed(format!("Failed to open keychain entry {}: {}", key, e))
        })
    }
}

impl SecretProvider for KeychainProvider {
    fn set_secret(&self, key: &str, value: &str) -> Result<(), KeychainError> {
        debug!(service = %self.service_name, key = %key, "Storing secret in keychain");

        let entry = self.create_entry(key)?;
        entry.set_password(value).map_err(|e| {
            KeychainError::AccessFailed(format!("Failed to store secret for {}: {}", key, e))
        })
    }

    fn get_secret(&self, key: &str) -> Result<String, KeychainError> {
        debug!(service = %self.service_name, key = %key, "Retrieving secret from keychain");

        let entry = self.create_entry(key)?;
        entry.get_password().map_err(|e| {
            if matches!(e, keyring::Error::NoEntry) {
                KeychainError::NotFound
            } else {
                KeychainError::AccessFailed(format!("Failed to retrieve secret for {}: {}", key, e))
            }
        })
    }

    fn delete_secret(&self, key: &str) -> Result<(), KeychainError> {
        debug!(service = %self.service_name, key = %key, "Deleting secret from keychain");

        let entry = self.create_entry(key)?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(KeychainError::AccessFailed(format!(
                "Failed to delete secret for {}: {}",
                key, e
            ))),
        }
    }
}
