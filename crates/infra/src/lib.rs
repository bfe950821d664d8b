//! # Tokenline Infrastructure
//!
//! Infrastructure implementations of the `tokenline-core` ports.
//!
//! This crate contains:
//! - The reqwest-backed [`HttpTransport`](tokenline_core::HttpTransport)
//! - Key/value stores for credential records (platform keychain, memory)
//! - Configuration loading from the environment or files
//! - Tracing subscriber setup
//!
//! ## Architecture
//! - Implements traits defined in `tokenline-core`
//! - Contains all "impure" code (network, keychain, filesystem, env)

pub mod client;
pub mod config;
pub mod errors;
pub mod http;
pub mod observability;
pub mod storage;

// Re-export commonly used items
pub use client::RestClientBuilder;
pub use errors::{InfraError, InfraResult};
pub use http::{ReqwestTransport, ReqwestTransportBuilder};
pub use storage::{KeychainStore, MemoryStore};
