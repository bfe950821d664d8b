//! Test doubles for platform services
//!
//! Enabled with the `test-utils` feature so downstream crates can use them
//! from their own test suites.

pub mod mocks;

pub use mocks::MockKeychainProvider;
