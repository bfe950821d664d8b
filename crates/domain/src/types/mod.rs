//! Domain types and models

pub mod credential;
pub mod request;
pub mod session;

pub use credential::{CredentialRecord, StorageLocation, TokenResponse};
pub use request::{
    ApiCall, ApiResponse, Capability, HttpMethod, MultipartPart, OutgoingRequest, RawResponse,
    RequestBody,
};
pub use session::SessionState;
