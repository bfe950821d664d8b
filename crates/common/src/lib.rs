//! Modular common utilities shared across Tokenline crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: error classification, clock abstraction
//! - `observability`: tracing instrumentation for the tiers below
//! - `platform`: OS keychain integration
//! - `test-utils`: in-memory mocks for platform services

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod error;
#[cfg(feature = "foundation")]
pub mod time;

// Platform tier
// -------------------------------------------------------------------
#[cfg(feature = "platform")]
pub mod security;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(any(feature = "test-utils", all(test, feature = "platform")))]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "foundation")]
pub use error::{ErrorClassification, ErrorSeverity};
#[cfg(feature = "platform")]
pub use security::{KeychainError, KeychainProvider, SecretProvider};
#[cfg(feature = "foundation")]
pub use time::{Clock, MockClock, SystemClock};
