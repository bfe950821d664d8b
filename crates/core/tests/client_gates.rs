//! Gated call surface tests
//!
//! Covers capability and logged-in gating in both misuse modes, request
//! decoration precedence and response classification.

mod support;

use std::sync::Arc;

use futures::FutureExt;
use serde_json::json;
use tokenline_core::RequestAuthenticator;
use tokenline_domain::{
    ApiCall, Capability, HttpMethod, MultipartPart, OutgoingRequest, RequestBody, SdkError,
    TransportError,
};

use support::{basic_settings, oauth_config, oauth_settings, settle, token_body, Harness, TOKEN_URL};

async fn logged_in(scope: &str) -> Harness {
    let harness = Harness::build(oauth_config(scope));
    harness.transport.respond(200, token_body("access-1", "refresh-1", 3600));
    harness.client.login("alice", "pw").await.unwrap();
    harness
}

fn authenticator(harness: &Harness) -> RequestAuthenticator {
    RequestAuthenticator::new(Arc::new(harness.client.config().clone()), Arc::clone(harness.client.engine()))
}

// ============================================================================
// Static-credential mode
// ============================================================================

/// Validates a static-credential call without any stored record.
///
/// Assertions:
/// - Basic credentials plus `AuthProvider` are attached.
/// - The default content type is JSON.
/// - Storage is never consulted.
#[tokio::test(start_paused = true)]
async fn static_mode_sends_basic_credentials() {
    let harness = Harness::build(basic_settings().validate().unwrap());
    harness.transport.respond(200, r#"{"items":[]}"#);

    assert!(harness.client.is_logged_in());
    assert!(harness.client.is_public_allowed());
    assert!(harness.client.is_internal_allowed());

    let response = harness.client.call(ApiCall::get(Capability::Private, "/samples")).unwrap().await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.content, json!({"items": []}));
    let request = harness.transport.last_request().unwrap();
    assert_eq!(request.url, "https://lims.example.com/samples");
    assert_eq!(request.header("Authorization"), Some("Basic c3ZjOnB3"));
    assert_eq!(request.header("AuthProvider"), Some("ldap"));
    assert_eq!(request.header("Content-Type"), Some("application/json"));
    assert_eq!(harness.durable.reads() + harness.ephemeral.reads(), 0);
}

// ============================================================================
// Capability gate
// ============================================================================

/// Validates a missing private scope in value mode.
///
/// Assertions:
/// - The call does not resolve synchronously.
/// - It resolves to `CapabilityMissing` after a tick with no network call.
#[tokio::test(start_paused = true)]
async fn missing_capability_resolves_after_a_tick() {
    let harness = logged_in("public").await;
    let calls_before = harness.transport.calls();
    assert!(!harness.client.is_internal_allowed());

    let mut pending = harness.client.call(ApiCall::get(Capability::Private, "admin/users")).unwrap();
    assert!((&mut pending).now_or_never().is_none());

    let err = pending.await.unwrap_err();
    assert_eq!(err, SdkError::CapabilityMissing(Capability::Private));
    assert_eq!(harness.transport.calls(), calls_before);
}

/// Validates fail-fast mode for a missing capability.
#[tokio::test(start_paused = true)]
async fn missing_capability_raises_when_configured() {
    let mut settings = oauth_settings("private");
    settings.raise_on_misuse = true;
    let harness = Harness::build(settings.validate().unwrap());

    let err = harness.client.call(ApiCall::get(Capability::Public, "tests")).err().unwrap();

    assert_eq!(err, SdkError::CapabilityMissing(Capability::Public));
    assert_eq!(harness.transport.calls(), 0);
}

/// Validates the logged-in gate in both modes.
///
/// Assertions:
/// - Value mode resolves to a 401-shaped `Unauthorized`.
/// - Fail-fast mode raises `AuthenticationRequired`.
#[tokio::test(start_paused = true)]
async fn logged_out_calls_are_refused() {
    let harness = Harness::build(oauth_config("public"));
    let err = harness.client.call(ApiCall::get(Capability::Public, "tests")).unwrap().await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert!(matches!(err, SdkError::Unauthorized { .. }));

    let mut settings = oauth_settings("public");
    settings.raise_on_misuse = true;
    let strict = Harness::build(settings.validate().unwrap());
    let err = strict.client.call(ApiCall::get(Capability::Public, "tests")).err().unwrap();
    assert_eq!(err, SdkError::AuthenticationRequired);

    assert_eq!(harness.transport.calls() + strict.transport.calls(), 0);
}

// ============================================================================
// Request decoration
// ============================================================================

/// Validates bearer decoration and the legacy version prefix.
#[tokio::test(start_paused = true)]
async fn logged_in_calls_carry_bearer() {
    let mut settings = oauth_settings("public");
    settings.legacy_version = Some("1.0".into());
    let harness = Harness::build(settings.validate().unwrap());
    harness.transport.respond(200, token_body("access-1", "refresh-1", 3600)).respond(201, "");
    harness.client.login("alice", "pw").await.unwrap();

    let call = ApiCall::post(Capability::Public, "tests", RequestBody::Json(json!({"name": "t"})))
        .expect_status(201);
    let response = harness.client.call(call).unwrap().await.unwrap();

    assert_eq!(response.status, 201);
    assert_eq!(response.content, serde_json::Value::Null);
    let request = harness.transport.last_request().unwrap();
    assert_eq!(request.url, "https://lims.example.com/1.0/tests");
    assert_eq!(request.method, HttpMethod::Post);
    assert_eq!(request.header("authorization"), Some("Bearer access-1"));
    assert!(!request.has_header("AuthProvider"));
}

/// Validates the token endpoint case: form content type, no credentials.
#[tokio::test(start_paused = true)]
async fn token_endpoint_gets_form_content_type_only() {
    let harness = logged_in("public").await;
    let mut request = OutgoingRequest::new(HttpMethod::Post, TOKEN_URL)
        .with_header("Authorization", "Bearer stale")
        .with_header("Content-Type", "application/json");

    authenticator(&harness).apply(&mut request);

    assert_eq!(request.header("content-type"), Some("application/x-www-form-urlencoded"));
    assert!(!request.has_header("authorization"));
    assert_eq!(request.headers.len(), 1);
}

/// Validates the multipart case: authorization only, no content type.
#[tokio::test(start_paused = true)]
async fn multipart_gets_authorization_only() {
    let harness = Harness::build(basic_settings().validate().unwrap());
    let mut request = OutgoingRequest::new(HttpMethod::Post, "https://lims.example.com/files")
        .with_header("Content-Type", "application/json")
        .with_body(RequestBody::Multipart(vec![MultipartPart::file(
            "file",
            "report.pdf",
            "application/pdf",
            vec![1, 2, 3],
        )]));

    authenticator(&harness).apply(&mut request);

    assert_eq!(request.header("Authorization"), Some("Basic c3ZjOnB3"));
    assert!(!request.has_header("AuthProvider"));
    assert!(!request.has_header("Content-Type"));
}

/// Validates that stale credentials are stripped once logged out and that a
/// caller-supplied content type survives.
#[tokio::test(start_paused = true)]
async fn logged_out_requests_lose_stale_credentials() {
    let harness = logged_in("public").await;
    harness.client.logout();
    let mut request = OutgoingRequest::new(HttpMethod::Get, "https://lims.example.com/tests")
        .with_header("Authorization", "Bearer access-1")
        .with_header("AuthProvider", "ldap")
        .with_header("Content-Type", "text/csv");

    authenticator(&harness).apply(&mut request);

    assert!(!request.has_header("Authorization"));
    assert!(!request.has_header("AuthProvider"));
    assert_eq!(request.header("Content-Type"), Some("text/csv"));
}

// ============================================================================
// Response classification
// ============================================================================

/// Validates status classification for non-401 responses.
#[tokio::test(start_paused = true)]
async fn responses_are_classified() {
    let harness = logged_in("public").await;
    harness
        .transport
        .respond(304, "")
        .respond(404, r#"{"message":"no such test"}"#)
        .fail(TransportError::Timeout("30s".into()));

    let not_modified = harness.client.call(ApiCall::get(Capability::Public, "tests/1")).unwrap().await.unwrap();
    assert_eq!(not_modified.status, 304);

    let missing = harness.client.call(ApiCall::get(Capability::Public, "tests/2")).unwrap().await.unwrap_err();
    assert_eq!(
        missing,
        SdkError::UnexpectedStatus {
            expected: 200,
            actual: 404,
            content: json!({"message": "no such test"}),
        }
    );

    let unreachable = harness.client.call(ApiCall::get(Capability::Public, "tests/3")).unwrap().await.unwrap_err();
    assert!(matches!(unreachable, SdkError::NetworkUnreachable(TransportError::Timeout(_))));
    assert_eq!(unreachable.status(), Some(0));
}

/// Validates that a server 401 kicks a background refresh.
///
/// Assertions:
/// - The caller sees `Unauthorized` with the server body.
/// - A refresh grant follows without caller involvement.
#[tokio::test(start_paused = true)]
async fn server_401_triggers_refresh() {
    let harness = logged_in("public").await;
    harness
        .transport
        .respond(401, r#"{"message":"expired"}"#)
        .respond(200, token_body("access-2", "refresh-1", 3600));

    let err = harness.client.call(ApiCall::get(Capability::Public, "tests")).unwrap().await.unwrap_err();
    assert_eq!(err, SdkError::Unauthorized { content: json!({"message": "expired"}) });

    settle().await;
    assert_eq!(harness.transport.token_calls(), 2);
    assert_eq!(harness.client.state().bearer_value, "access-2");
}
