//! Storage ports

use tokenline_domain::StoreError;

/// String-keyed storage backend for serialized credential records
///
/// Synchronous: writes happen under the session engine's lock so observers
/// never see a state the backend has not accepted.
pub trait KeyValueStore: Send + Sync {
    /// Value stored under `key`, `None` when absent
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove `key` (idempotent)
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}
