//! Client assembly
//!
//! [`RestClientBuilder`] wires a validated configuration to the production
//! adapters. Every adapter can be swapped, which is how tests run the full
//! stack against a mock server without touching the platform keychain.

use std::sync::Arc;

use tokenline_common::time::{Clock, SystemClock};
use tokenline_core::{CredentialStore, HttpTransport, KeyValueStore, SessionClient};
use tokenline_domain::constants::{DEFAULT_KEYCHAIN_SERVICE, DEFAULT_STORAGE_KEY};
use tokenline_domain::{ClientConfig, ClientSettings};
use tracing::info;

use crate::config;
use crate::errors::InfraResult;
use crate::http::ReqwestTransport;
use crate::storage::{KeychainStore, MemoryStore};

/// Builder for a [`SessionClient`] over the production adapters
///
/// Defaults:
/// - transport: [`ReqwestTransport`] with a 30s timeout
/// - durable store: platform keychain under service `"tokenline"`
/// - ephemeral store: [`MemoryStore`]
/// - clock: [`SystemClock`]
pub struct RestClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn HttpTransport>>,
    durable: Option<Arc<dyn KeyValueStore>>,
    ephemeral: Option<Arc<dyn KeyValueStore>>,
    clock: Option<Arc<dyn Clock>>,
    keychain_service: String,
}

impl RestClientBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            transport: None,
            durable: None,
            ephemeral: None,
            clock: None,
            keychain_service: DEFAULT_KEYCHAIN_SERVICE.to_string(),
        }
    }

    /// # Errors
    /// `InfraError::Config` when the settings fail validation.
    pub fn from_settings(settings: ClientSettings) -> InfraResult<Self> {
        Ok(Self::new(settings.validate()?))
    }

    /// Builder over [`config::load`]
    ///
    /// # Errors
    /// See [`config::load`].
    pub fn from_environment() -> InfraResult<Self> {
        Ok(Self::new(config::load()?))
    }

    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn durable_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.durable = Some(store);
        self
    }

    pub fn ephemeral_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.ephemeral = Some(store);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Keychain service name for the default durable store
    pub fn keychain_service(mut self, service: impl Into<String>) -> Self {
        self.keychain_service = service.into();
        self
    }

    /// Build the client
    ///
    /// Must be called inside a tokio runtime for proactive refresh to run.
    /// A stored credential is restored during the call.
    ///
    /// # Errors
    /// `InfraError::HttpClient` when the default transport cannot be built.
    pub fn build(self) -> InfraResult<SessionClient> {
        let transport: Arc<dyn HttpTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new()?),
        };
        let durable: Arc<dyn KeyValueStore> = match self.durable {
            Some(store) => store,
            None => Arc::new(KeychainStore::new(self.keychain_service)),
        };
        let ephemeral: Arc<dyn KeyValueStore> = match self.ephemeral {
            Some(store) => store,
            None => Arc::new(MemoryStore::new()),
        };
        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(SystemClock),
        };

        let key = self
            .config
            .auth()
            .refreshable()
            .map_or(DEFAULT_STORAGE_KEY, |oauth| oauth.storage_key.as_str())
            .to_string();
        let store = CredentialStore::new(durable, ephemeral, key);

        info!(
            host = %self.config.host(),
            mode = self.config.auth().name(),
            "Building session client"
        );
        Ok(SessionClient::new(self.config, transport, store, clock))
    }
}
