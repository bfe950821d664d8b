//! Infrastructure errors
//!
//! Failures that happen before a client exists (loading settings, building
//! the HTTP client, installing the subscriber). Runtime failures of the
//! adapters are converted into the domain's `TransportError` and
//! `StoreError` in [`conversions`].

use std::path::PathBuf;

use thiserror::Error;
use tokenline_domain::ConfigError;

mod conversions;

pub(crate) use conversions::{IntoStoreError, IntoTransportError};

/// Errors raised while assembling a client
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("config file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("no config file found in any of the standard locations")]
    NoConfigFile,

    #[error("failed to read config file {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid {format} config: {message}")]
    ConfigFormat { format: &'static str, message: String },

    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),

    #[error("environment variable {0} is not set")]
    MissingEnv(String),

    #[error("environment variable {name} has an invalid value: {value}")]
    InvalidEnv { name: String, value: String },

    /// Settings were read but failed validation
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build http client: {0}")]
    HttpClient(String),

    #[error("failed to install tracing subscriber: {0}")]
    Tracing(String),
}

pub type InfraResult<T> = Result<T, InfraError>;
