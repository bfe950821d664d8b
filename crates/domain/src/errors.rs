//! Error types used throughout the SDK

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tokenline_common::error::{ErrorClassification, ErrorSeverity};

use crate::types::Capability;

/// Construction-time configuration errors
///
/// Each variant carries a stable code (`E001`..`E010`) so callers can match on
/// the code in logs without depending on the message text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("E001: host is required")]
    MissingHost,

    #[error("E002: no auth mode configured; provide either `basic` or `oauth`")]
    NoAuthMode,

    #[error("E003: both `basic` and `oauth` are configured; exactly one is allowed")]
    BothAuthModes,

    #[error("E004: basic.username is required")]
    MissingBasicUsername,

    #[error("E005: basic.password is required")]
    MissingBasicPassword,

    #[error("E006: basic.provider is required")]
    MissingAuthProvider,

    #[error("E007: oauth.client_id is required")]
    MissingClientId,

    #[error("E008: oauth.client_secret is required")]
    MissingClientSecret,

    #[error("E009: oauth.scope is required")]
    MissingScope,

    #[error("E010: host is not a valid http(s) URL: {0}")]
    InvalidHost(String),
}

impl ConfigError {
    /// Stable error code
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingHost => "E001",
            Self::NoAuthMode => "E002",
            Self::BothAuthModes => "E003",
            Self::MissingBasicUsername => "E004",
            Self::MissingBasicPassword => "E005",
            Self::MissingAuthProvider => "E006",
            Self::MissingClientId => "E007",
            Self::MissingClientSecret => "E008",
            Self::MissingScope => "E009",
            Self::InvalidHost(_) => "E010",
        }
    }
}

/// Failures of the HTTP transport itself (no response was received)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("request could not be built: {0}")]
    Request(String),

    #[error("response body could not be read: {0}")]
    Body(String),
}

/// Credential storage failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("storage backend failed: {0}")]
    Backend(String),

    #[error("stored credential record is corrupt: {0}")]
    Corrupt(String),

    #[error("credential record could not be serialized: {0}")]
    Serialize(String),
}

/// Main error type for SDK operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SdkError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("capability `{0}` is not granted by the configured scope")]
    CapabilityMissing(Capability),

    #[error("authentication required: no active session")]
    AuthenticationRequired,

    #[error("network unreachable: {0}")]
    NetworkUnreachable(#[source] TransportError),

    #[error("unexpected status: expected {expected}, got {actual}")]
    UnexpectedStatus { expected: u16, actual: u16, content: Value },

    #[error("unauthorized (401)")]
    Unauthorized { content: Value },

    #[error("`{operation}` is not supported in {mode} mode")]
    UnsupportedInMode { operation: &'static str, mode: &'static str },

    #[error("credential storage failed: {0}")]
    Store(#[from] StoreError),

    #[error("invalid token endpoint response: {0}")]
    InvalidResponse(String),
}

impl SdkError {
    /// HTTP status associated with the error, `0` for unreachable networks
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::NetworkUnreachable(_) => Some(0),
            Self::UnexpectedStatus { actual, .. } => Some(*actual),
            Self::Unauthorized { .. } => Some(401),
            _ => None,
        }
    }

    /// Response body carried by status errors
    #[must_use]
    pub fn content(&self) -> Option<&Value> {
        match self {
            Self::UnexpectedStatus { content, .. } | Self::Unauthorized { content } => {
                Some(content)
            }
            _ => None,
        }
    }
}

impl ErrorClassification for SdkError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::NetworkUnreachable(_) => true,
            Self::UnexpectedStatus { actual, .. } => *actual == 429 || *actual >= 500,
            Self::Store(StoreError::Backend(_)) => true,
            _ => false,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Config(_) => ErrorSeverity::Critical,
            Self::AuthenticationRequired | Self::Unauthorized { .. } => ErrorSeverity::Warning,
            Self::NetworkUnreachable(_) => ErrorSeverity::Warning,
            Self::UnexpectedStatus { actual, .. } if *actual < 500 => ErrorSeverity::Warning,
            Self::UnexpectedStatus { .. }
            | Self::CapabilityMissing(_)
            | Self::UnsupportedInMode { .. }
            | Self::Store(_)
            | Self::InvalidResponse(_) => ErrorSeverity::Error,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::NetworkUnreachable(TransportError::Timeout(_)) => Some(Duration::from_secs(1)),
            _ => None,
        }
    }
}

/// Result type alias for SDK operations
pub type Result<T> = std::result::Result<T, SdkError>;
