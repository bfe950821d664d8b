//! Tracing subscriber setup
//!
//! The library crates only emit `tracing` events. Applications that do not
//! install their own subscriber can call [`init_tracing`] once at startup.
//!
//! Filtering follows `RUST_LOG` when set, otherwise
//! [`TracingOptions::default_filter`]. Output goes to stderr, as plain text
//! or as one JSON object per line.

use std::io;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::errors::{InfraError, InfraResult};

/// Environment variable switching output to JSON (`1`/`true`)
pub const LOG_JSON_ENV: &str = "TOKENLINE_LOG_JSON";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingOptions {
    /// Filter directive used when `RUST_LOG` is unset
    pub default_filter: String,
    pub json: bool,
}

impl Default for TracingOptions {
    fn default() -> Self {
        Self { default_filter: "warn,tokenline_core=info".to_string(), json: false }
    }
}

impl TracingOptions {
    /// Defaults, with `json` taken from [`LOG_JSON_ENV`]
    #[must_use]
    pub fn from_env() -> Self {
        let json = std::env::var(LOG_JSON_ENV)
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true"))
            .unwrap_or(false);
        Self { json, ..Self::default() }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.default_filter))
    }
}

/// Install the global subscriber
///
/// # Errors
/// Returns `InfraError::Tracing` if a global subscriber is already set.
pub fn init_tracing(options: &TracingOptions) -> InfraResult<()> {
    let json_layer = options.json.then(|| fmt::layer().json().with_writer(io::stderr));
    let text_layer = (!options.json).then(|| fmt::layer().with_writer(io::stderr));

    tracing_subscriber::registry()
        .with(options.filter())
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .map_err(|e| InfraError::Tracing(e.to_string()))
}
