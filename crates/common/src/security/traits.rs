//! Trait abstraction over secret storage backends

use super::keychain::KeychainError;

/// Key/value secret storage namespaced by a service name
///
/// Implemented by [`super::KeychainProvider`] for real keychains and by
/// `testing::MockKeychainProvider` for deterministic tests.
pub trait SecretProvider: Send + Sync {
    /// Persist `value` under `key`, replacing any previous value
    ///
    /// # Errors
    /// Returns `KeychainError::AccessFailed` if the backend rejects the write
    fn set_secret(&self, key: &str, value: &str) -> Result<(), KeychainError>;

    /// Read the value stored under `key`
    ///
    /// # Errors
    /// Returns `KeychainError::NotFound` if nothing is stored
    fn get_secret(&self, key: &str) -> Result<String, KeychainError>;

    /// Remove the value stored under `key` (idempotent)
    ///
    /// # Errors
    /// Returns `KeychainError::AccessFailed` if the backend rejects the delete
    fn delete_secret(&self, key: &str) -> Result<(), KeychainError>;

    /// Whether a value is stored under `key`
    fn secret_exists(&self, key: &str) -> bool {
        self.get_secret(key).is_ok()
    }
}
