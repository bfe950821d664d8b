//! # Tokenline Core
//!
//! Session lifecycle logic - no infrastructure dependencies.
//!
//! This crate contains:
//! - Credential storage policy over a key/value port
//! - The session engine (credential state, expiry, proactive refresh timer)
//! - Login/refresh coordination over an HTTP transport port
//! - Per-request credential decoration and capability gating
//! - The [`SessionClient`] facade used by endpoint wrappers
//!
//! ## Architecture Principles
//! - Depends only on `tokenline-common` and `tokenline-domain`
//! - No HTTP, keychain, or platform code
//! - All external dependencies via traits

pub mod auth;
pub mod client;
pub mod session;

pub use auth::ports::HttpTransport;
pub use auth::{AuthCoordinator, CapabilityGate, GateRejection, RefreshOutcome, RequestAuthenticator};
pub use client::{CallFuture, SessionClient};
pub use session::ports::KeyValueStore;
pub use session::{refresh_delay, CredentialStore, SessionEngine};
