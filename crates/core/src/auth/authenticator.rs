//! Per-request credential decoration

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tokenline_domain::constants::{
    CONTENT_TYPE_FORM, CONTENT_TYPE_JSON, HEADER_AUTHORIZATION, HEADER_AUTH_PROVIDER,
    HEADER_CONTENT_TYPE,
};
use tokenline_domain::{AuthMode, ClientConfig, OutgoingRequest};

use crate::session::SessionEngine;

/// Chooses the credential representation for each outgoing request
///
/// Precedence:
/// 1. token endpoint: form content type, no credential headers
/// 2. multipart body: `Authorization` only, no content type
/// 3. refreshable-token mode while logged in: bearer
/// 4. static-credential mode: basic plus `AuthProvider`
/// 5. otherwise: no credential
///
/// Cases 3-5 default the content type to JSON. Session state is only read.
pub struct RequestAuthenticator {
    config: Arc<ClientConfig>,
    engine: Arc<SessionEngine>,
}

impl RequestAuthenticator {
    pub fn new(config: Arc<ClientConfig>, engine: Arc<SessionEngine>) -> Self {
        Self { config, engine }
    }

    /// Decorate `request` in place
    pub fn apply(&self, request: &mut OutgoingRequest) {
        request.remove_header(HEADER_AUTHORIZATION);
        request.remove_header(HEADER_AUTH_PROVIDER);

        if self.config.is_token_url(&request.url) {
            request.set_header(HEADER_CONTENT_TYPE, CONTENT_TYPE_FORM);
            return;
        }

        let credential = self.credential();

        if request.body.is_multipart() {
            // The transport writes the boundary-bearing content type.
            request.remove_header(HEADER_CONTENT_TYPE);
            if let Some((authorization, _)) = credential {
                request.set_header(HEADER_AUTHORIZATION, authorization);
            }
            return;
        }

        if let Some((authorization, provider)) = credential {
            request.set_header(HEADER_AUTHORIZATION, authorization);
            if let Some(provider) = provider {
                request.set_header(HEADER_AUTH_PROVIDER, provider);
            }
        }
        if !request.has_header(HEADER_CONTENT_TYPE) {
            request.set_header(HEADER_CONTENT_TYPE, CONTENT_TYPE_JSON);
        }
    }

    /// `Authorization` value plus optional `AuthProvider` value
    fn credential(&self) -> Option<(String, Option<String>)> {
        match self.config.auth() {
            AuthMode::StaticCredential(basic) => {
                let encoded = STANDARD.encode(format!("{}:{}", basic.username, basic.password));
                Some((format!("Basic {encoded}"), Some(basic.provider.clone())))
            }
            AuthMode::RefreshableToken(_) => {
                let state = self.engine.state();
                (state.logged_in && !state.bearer_value.is_empty())
                    .then(|| (format!("Bearer {}", state.bearer_value), None))
            }
        }
    }
}
