//! Credential record storage backends
//!
//! - [`KeychainStore`]: durable, survives restarts (platform keychain)
//! - [`MemoryStore`]: ephemeral, lives as long as the process

pub mod keychain;
pub mod memory;

pub use keychain::KeychainStore;
pub use memory::MemoryStore;
