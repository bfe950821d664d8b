//! # Tokenline Domain
//!
//! Domain types for the Tokenline session SDK.
//!
//! This crate contains:
//! - Client configuration (raw settings and the validated form)
//! - Credential record and session state
//! - Request/response model shared by the engine and the transport
//! - Error taxonomy and constants
//!
//! ## Architecture
//! - Depends only on the foundation tier of `tokenline-common`
//! - No I/O, no async runtime

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
