//! Credential record and token endpoint payloads

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Serialized token/expiry bundle for one session
///
/// `expiry_time` is derived from `grant_time + expires_in`. Values read from
/// storage or built by callers are normalised with
/// [`CredentialRecord::with_recomputed_expiry`] before the engine adopts them.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub username: String,
    pub grant_time: DateTime<Utc>,
    /// Access token lifetime in seconds
    pub expires_in: u64,
    #[serde(default)]
    pub expiry_time: DateTime<Utc>,
    #[serde(default)]
    pub granted: bool,
}

impl CredentialRecord {
    /// Build a granted record with its expiry computed from `grant_time`
    #[must_use]
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        username: impl Into<String>,
        grant_time: DateTime<Utc>,
        expires_in: u64,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            username: username.into(),
            grant_time,
            expires_in,
            expiry_time: compute_expiry(grant_time, expires_in),
            granted: true,
        }
    }

    /// Same record with `expiry_time` recomputed from `grant_time + expires_in`
    #[must_use]
    pub fn with_recomputed_expiry(mut self) -> Self {
        self.expiry_time = compute_expiry(self.grant_time, self.expires_in);
        self
    }

    /// Whether both the access and the refresh token are non-empty
    #[must_use]
    pub fn has_tokens(&self) -> bool {
        !self.access_token.is_empty() && !self.refresh_token.is_empty()
    }
}

/// Saturates at the maximum representable instant
fn compute_expiry(grant_time: DateTime<Utc>, expires_in: u64) -> DateTime<Utc> {
    i64::try_from(expires_in)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|lifetime| grant_time.checked_add_signed(lifetime))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

// Tokens are never printed.
impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .field("username", &self.username)
            .field("grant_time", &self.grant_time)
            .field("expires_in", &self.expires_in)
            .field("expiry_time", &self.expiry_time)
            .field("granted", &self.granted)
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<empty>"
    } else {
        "<redacted>"
    }
}

/// Which store a credential record is written to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageLocation {
    /// Survives process restarts
    #[default]
    Durable,
    /// Lives for the current process only
    Ephemeral,
}

impl StorageLocation {
    /// The other store
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            Self::Durable => Self::Ephemeral,
            Self::Ephemeral => Self::Durable,
        }
    }
}

/// Token endpoint response (RFC 6749 section 5.1)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: u64,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}
