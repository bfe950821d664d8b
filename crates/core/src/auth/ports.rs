//! Network ports

use async_trait::async_trait;
use tokenline_domain::{OutgoingRequest, RawResponse, TransportError};

/// Sends fully decorated requests
///
/// Any HTTP status is a successful exchange; `Err` means no response was
/// received at all.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: OutgoingRequest) -> Result<RawResponse, TransportError>;
}
