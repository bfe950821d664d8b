//! Conversions from external infrastructure errors into domain errors.

use reqwest::Error as HttpError;
use tokenline_common::security::KeychainError;
use tokenline_domain::{StoreError, TransportError};

/// reqwest::Error → TransportError
pub(crate) trait IntoTransportError {
    fn into_transport(self) -> TransportError;
}

impl IntoTransportError for HttpError {
    fn into_transport(self) -> TransportError {
        let message = self.to_string();
        if self.is_timeout() {
            TransportError::Timeout(message)
        } else if self.is_connect() {
            TransportError::Connect(message)
        } else if self.is_body() || self.is_decode() {
            TransportError::Body(message)
        } else {
            TransportError::Request(message)
        }
    }
}

/// KeychainError → StoreError
///
/// `NotFound` is handled by the caller as an absent entry; converting it here
/// only happens for operations where absence is unexpected.
pub(crate) trait IntoStoreError {
    fn into_store(self) -> StoreError;
}

impl IntoStoreError for KeychainError {
    fn into_store(self) -> StoreError {
        match self {
            KeychainError::AccessFailed(message) => StoreError::Backend(message),
            KeychainError::NotFound => StoreError::Backend("keychain entry not found".into()),
        }
    }
}
