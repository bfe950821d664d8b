//! HTTP transport
//!
//! [`ReqwestTransport`] implements the core `HttpTransport` port on top of a
//! shared reqwest client.

pub mod client;

pub use client::{ReqwestTransport, ReqwestTransportBuilder};
