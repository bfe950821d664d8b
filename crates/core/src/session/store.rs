//! Credential store over a durable and an ephemeral backend
//!
//! A record lives in exactly one backend at a time: saving to one removes the
//! copy from the other. Loading prefers the durable backend.

use std::sync::Arc;

use tokenline_domain::{CredentialRecord, StorageLocation, StoreError};
use tracing::{debug, warn};

use super::ports::KeyValueStore;

/// Serializes credential records into one of two key/value backends
#[derive(Clone)]
pub struct CredentialStore {
    durable: Arc<dyn KeyValueStore>,
    ephemeral: Arc<dyn KeyValueStore>,
    key: String,
}

impl CredentialStore {
    /// Create a store writing entries named `key`
    pub fn new(
        durable: Arc<dyn KeyValueStore>,
        ephemeral: Arc<dyn KeyValueStore>,
        key: impl Into<String>,
    ) -> Self {
        Self { durable, ephemeral, key: key.into() }
    }

    /// Entry name used in both backends
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    fn backend(&self, location: StorageLocation) -> &dyn KeyValueStore {
        match location {
            StorageLocation::Durable => self.durable.as_ref(),
            StorageLocation::Ephemeral => self.ephemeral.as_ref(),
        }
    }

    /// Read the record held by one backend
    ///
    /// # Errors
    /// `StoreError::Backend` if the backend fails, `StoreError::Corrupt` if the
    /// stored value is not a credential record.
    pub fn read(&self, location: StorageLocation) -> Result<Option<CredentialRecord>, StoreError> {
        let Some(raw) = self.backend(location).get(&self.key)? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StoreError::Corrupt(e.to_string()))
    }

    /// First readable record, durable backend first
    ///
    /// Unreadable entries are logged and skipped, never deleted.
    pub fn load(&self) -> Option<(CredentialRecord, StorageLocation)> {
        for location in [StorageLocation::Durable, StorageLocation::Ephemeral] {
            match self.read(location) {
                Ok(Some(record)) => {
                    debug!(?location, "Loaded stored credential record");
                    return Some((record, location));
                }
                Ok(None) => {}
                Err(e) => warn!(?location, error = %e, "Ignoring unreadable credential record"),
            }
        }
        None
    }

    /// Write `record` to `location` and drop any copy in the other backend
    ///
    /// # Errors
    /// Fails if the record cannot be serialized or the target backend rejects
    /// the write. A failure to remove the stale copy is only logged.
    pub fn save(&self, record: &CredentialRecord, location: StorageLocation) -> Result<(), StoreError> {
        let serialized =
            serde_json::to_string(record).map_err(|e| StoreError::Serialize(e.to_string()))?;
        self.backend(location).set(&self.key, &serialized)?;

        let stale = location.other();
        if let Err(e) = self.backend(stale).remove(&self.key) {
            warn!(location = ?stale, error = %e, "Failed to remove stale credential copy");
        }
        Ok(())
    }

    /// Remove the record from both backends
    ///
    /// # Errors
    /// Returns the first backend failure; both removals are always attempted.
    pub fn erase(&self) -> Result<(), StoreError> {
        let durable = self.durable.remove(&self.key);
        let ephemeral = self.ephemeral.remove(&self.key);
        durable.and(ephemeral)
    }
}
