//! Capability and logged-in checks run before authenticated calls

use std::sync::Arc;

use serde_json::Value;
use tokenline_domain::{AuthMode, Capability, ClientConfig, SdkError};

use crate::session::SessionEngine;

/// Why a call was refused before reaching the network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateRejection {
    CapabilityMissing(Capability),
    NotLoggedIn,
}

impl GateRejection {
    /// Error raised synchronously when misuse should fail fast
    #[must_use]
    pub fn into_raised(self) -> SdkError {
        match self {
            Self::CapabilityMissing(capability) => SdkError::CapabilityMissing(capability),
            Self::NotLoggedIn => SdkError::AuthenticationRequired,
        }
    }

    /// Error value the call resolves to otherwise
    ///
    /// A missing login is reported with the same shape as a server 401.
    #[must_use]
    pub fn into_value(self) -> SdkError {
        match self {
            Self::CapabilityMissing(capability) => SdkError::CapabilityMissing(capability),
            Self::NotLoggedIn => SdkError::Unauthorized { content: Value::Null },
        }
    }
}

/// Checks run by [`crate::SessionClient::call`] before any network activity
pub struct CapabilityGate {
    config: Arc<ClientConfig>,
    engine: Arc<SessionEngine>,
}

impl CapabilityGate {
    pub fn new(config: Arc<ClientConfig>, engine: Arc<SessionEngine>) -> Self {
        Self { config, engine }
    }

    /// Public endpoints allowed (always in static-credential mode)
    #[must_use]
    pub fn is_public_allowed(&self) -> bool {
        self.config.auth().refreshable().map_or(true, |oauth| oauth.grants_public())
    }

    /// Internal endpoints allowed (always in static-credential mode)
    #[must_use]
    pub fn is_internal_allowed(&self) -> bool {
        self.config.auth().refreshable().map_or(true, |oauth| oauth.grants_private())
    }

    #[must_use]
    pub fn is_allowed(&self, capability: Capability) -> bool {
        match capability {
            Capability::Public => self.is_public_allowed(),
            Capability::Private => self.is_internal_allowed(),
        }
    }

    /// Capability first, then the logged-in check (refreshable-token mode only)
    ///
    /// # Errors
    /// Returns the first failed check.
    pub fn check(&self, capability: Capability) -> Result<(), GateRejection> {
        if !self.is_allowed(capability) {
            return Err(GateRejection::CapabilityMissing(capability));
        }
        if matches!(self.config.auth(), AuthMode::RefreshableToken(_)) && !self.engine.is_logged_in() {
            return Err(GateRejection::NotLoggedIn);
        }
        Ok(())
    }
}
