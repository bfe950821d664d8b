//! Secure secret storage
//!
//! - [`KeychainProvider`]: platform keychain (macOS Keychain, Windows
//!   Credential Manager, Linux Secret Service) via the `keyring` crate
//! - [`SecretProvider`]: the seam that lets callers swap the keychain for an
//!   in-memory double in tests

pub mod keychain;
pub mod traits;

pub use keychain::{KeychainError, KeychainProvider};
pub use traits::SecretProvider;
