//! Credential state and persistence

pub mod engine;
pub mod ports;
pub mod store;

pub use engine::{refresh_delay, SessionEngine};
pub use store::CredentialStore;
