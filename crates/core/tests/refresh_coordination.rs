//! Login and refresh coordination tests
//!
//! Runs the full client against a scripted transport under paused tokio time.

mod support;

use std::time::Duration;

use chrono::TimeDelta;
use tokenline_common::time::{Clock, MockClock};
use tokenline_core::RefreshOutcome;
use tokenline_domain::{
    ClientOptions, CredentialRecord, SdkError, StorageLocation, TransportError,
};

use support::{
    basic_settings, form_field, oauth_config, oauth_settings, settle, token_body, FakeTransport,
    Harness, MemoryKv, TOKEN_URL,
};

async fn logged_in_harness() -> Harness {
    let harness = Harness::build(oauth_config("public private"));
    harness.transport.respond(200, token_body("access-1", "refresh-1", 3600));
    harness.client.login("alice", "pw").await.unwrap();
    harness
}

// ============================================================================
// Login
// ============================================================================

/// Validates a password grant against the token endpoint.
///
/// Assertions:
/// - The form carries grant type, user credentials and client credentials.
/// - The token request has the form content type and no `Authorization`.
/// - The record is stored durably and the session is logged in.
#[tokio::test(start_paused = true)]
async fn login_commits_password_grant() {
    let harness = logged_in_harness().await;

    let request = harness.transport.last_request().unwrap();
    assert_eq!(request.url, TOKEN_URL);
    assert_eq!(form_field(&request, "grant_type"), Some("password"));
    assert_eq!(form_field(&request, "username"), Some("alice"));
    assert_eq!(form_field(&request, "password"), Some("pw"));
    assert_eq!(form_field(&request, "scope"), Some("public private"));
    assert_eq!(form_field(&request, "client_id"), Some("client-1"));
    assert_eq!(form_field(&request, "client_secret"), Some("s3cret"));
    assert_eq!(request.header("content-type"), Some("application/x-www-form-urlencoded"));
    assert!(!request.has_header("authorization"));

    let state = harness.client.state();
    assert!(state.logged_in);
    assert!(!state.refresh_due);
    assert_eq!(state.bearer_value, "access-1");
    assert_eq!(harness.client.username(), "alice");

    let stored = harness.durable.record().unwrap();
    assert_eq!(stored.grant_time, harness.now());
    assert_eq!(stored.expiry_time, stored.grant_time + TimeDelta::seconds(3600));
    assert!(stored.granted);
}

/// Validates "remember me = false": the record lands in the ephemeral store.
#[tokio::test(start_paused = true)]
async fn login_to_ephemeral_store() {
    let harness = Harness::build(oauth_config("public"));
    harness.transport.respond(200, token_body("a", "r", 3600));

    harness.client.login_to("alice", "pw", StorageLocation::Ephemeral).await.unwrap();

    assert!(harness.durable.record().is_none());
    assert_eq!(harness.ephemeral.record().unwrap().access_token, "a");
}

/// Validates that login failures leave the session untouched.
#[tokio::test(start_paused = true)]
async fn login_failures_keep_state() {
    let harness = Harness::build(oauth_config("public"));
    harness
        .transport
        .respond(401, r#"{"error":"invalid_grant"}"#)
        .respond(500, "boom")
        .respond(200, "not json")
        .fail(TransportError::Connect("refused".into()));

    let unauthorized = harness.client.login("alice", "bad").await.unwrap_err();
    assert_eq!(
        unauthorized,
        SdkError::Unauthorized { content: serde_json::json!({"error": "invalid_grant"}) }
    );
    assert!(matches!(
        harness.client.login("alice", "pw").await,
        Err(SdkError::UnexpectedStatus { actual: 500, .. })
    ));
    assert!(matches!(harness.client.login("alice", "pw").await, Err(SdkError::InvalidResponse(_))));
    let unreachable = harness.client.login("alice", "pw").await.unwrap_err();
    assert_eq!(unreachable.status(), Some(0));

    assert!(!harness.client.is_logged_in());
    assert!(harness.durable.record().is_none());
}

/// Validates the usage error for login in static-credential mode.
#[tokio::test(start_paused = true)]
async fn login_is_unsupported_in_static_mode() {
    let harness = Harness::build(basic_settings().validate().unwrap());

    let err = harness.client.login("alice", "pw").await.unwrap_err();

    assert!(matches!(err, SdkError::UnsupportedInMode { operation: "login", .. }));
    assert_eq!(harness.transport.calls(), 0);
    assert_eq!(harness.client.refresh().await, RefreshOutcome::Skipped);
}

// ============================================================================
// Refresh
// ============================================================================

/// Validates a refresh grant and the committed record.
///
/// Assertions:
/// - The form carries the current refresh token.
/// - The new record keeps username and refresh token, with a fresh grant time.
#[tokio::test(start_paused = true)]
async fn refresh_commits_new_access_token() {
    let harness = logged_in_harness().await;
    harness.clock.advance(Duration::from_secs(600));
    harness.transport.respond(200, token_body("access-2", "refresh-ignored", 1800));

    assert_eq!(harness.client.refresh().await, RefreshOutcome::Refreshed);

    let request = harness.transport.last_request().unwrap();
    assert_eq!(form_field(&request, "grant_type"), Some("refresh_token"));
    assert_eq!(form_field(&request, "refresh_token"), Some("refresh-1"));

    let record = harness.client.engine().credential().unwrap();
    assert_eq!(record.access_token, "access-2");
    assert_eq!(record.refresh_token, "refresh-1");
    assert_eq!(record.username, "alice");
    assert_eq!(record.grant_time, harness.now());
    assert_eq!(record.expires_in, 1800);
    assert_eq!(harness.client.state().bearer_value, "access-2");
}

/// Validates single-flight: two triggers in the same tick make one call.
#[tokio::test(start_paused = true)]
async fn concurrent_refreshes_share_one_exchange() {
    let harness = logged_in_harness().await;
    harness.transport.with_latency(Duration::from_millis(100));
    harness.transport.respond_always(200, token_body("access-2", "r", 3600));

    let (first, second) = tokio::join!(harness.client.refresh(), harness.client.refresh());

    assert_eq!(first, RefreshOutcome::Refreshed);
    assert_eq!(second, RefreshOutcome::Suppressed);
    assert_eq!(harness.transport.token_calls(), 2, "one login plus one refresh");
}

/// Validates the cooldown that follows every attempt.
#[tokio::test(start_paused = true)]
async fn refresh_guard_cools_down() {
    let harness = logged_in_harness().await;
    harness.transport.respond_always(200, token_body("access-2", "r", 3600));

    assert_eq!(harness.client.refresh().await, RefreshOutcome::Refreshed);
    assert_eq!(harness.client.refresh().await, RefreshOutcome::Suppressed);

    tokio::time::advance(Duration::from_secs(1)).await;
    assert_eq!(harness.client.refresh().await, RefreshOutcome::Refreshed);
    assert_eq!(harness.transport.token_calls(), 3);
}

/// Validates logout on an authentication rejection of the refresh grant.
///
/// Assertions:
/// - A 403 clears the credential from memory and both stores.
/// - Subscribers observe the logged-out state.
#[tokio::test(start_paused = true)]
async fn rejected_refresh_logs_out() {
    let harness = logged_in_harness().await;
    let mut states = harness.client.subscribe();
    harness.transport.respond(403, r#"{"error":"invalid_grant"}"#);

    let outcome = harness.client.refresh().await;

    assert_eq!(outcome, RefreshOutcome::Failed { logged_out: true });
    assert!(states.has_changed().unwrap());
    assert!(!states.borrow_and_update().logged_in);
    assert!(harness.durable.record().is_none());
    assert!(harness.ephemeral.record().is_none());
    assert_eq!(harness.client.engine().refresh_token(), "");
}

/// Validates that a 401 keeps the credential when auto-logout is disabled.
#[tokio::test(start_paused = true)]
async fn rejected_refresh_without_auto_logout_keeps_session() {
    let mut settings = oauth_settings("public");
    settings.options = ClientOptions { auto_logout_on_401: false };
    let harness = Harness::build(settings.validate().unwrap());
    harness.transport.respond(200, token_body("access-1", "refresh-1", 3600)).respond(401, "");
    harness.client.login("alice", "pw").await.unwrap();

    let outcome = harness.client.refresh().await;

    assert_eq!(outcome, RefreshOutcome::Failed { logged_out: false });
    assert!(harness.client.is_logged_in());
    assert_eq!(harness.client.state().bearer_value, "access-1");
}

/// Validates logout via the client and its idempotence.
#[tokio::test(start_paused = true)]
async fn logout_is_idempotent() {
    let harness = logged_in_harness().await;

    harness.client.logout();
    harness.client.logout();

    assert!(!harness.client.is_logged_in());
    assert!(harness.durable.record().is_none());
    assert_eq!(harness.client.refresh().await, RefreshOutcome::Skipped);
}

// ============================================================================
// Scheduled refresh
// ============================================================================

/// Validates the proactive path: a stored record becomes due and the
/// listener refreshes it without any caller involvement.
#[tokio::test(start_paused = true)]
async fn due_refresh_runs_in_background() {
    let clock = MockClock::new();
    let durable = MemoryKv::new();
    durable.put_record(&CredentialRecord::new(
        "stale",
        "refresh-1",
        "alice",
        clock.now() - TimeDelta::seconds(10),
        60,
    ));
    let transport = FakeTransport::new();
    transport.respond(200, token_body("fresh", "r", 3600));
    let harness = Harness::build_with(oauth_config("public"), durable, MemoryKv::new(), transport, clock);
    settle().await;
    assert_eq!(harness.client.state().bearer_value, "stale");

    tokio::time::advance(Duration::from_secs(48)).await;
    settle().await;

    let state = harness.client.state();
    assert_eq!(state.bearer_value, "fresh");
    assert!(!state.refresh_due);
    assert_eq!(harness.transport.token_calls(), 1);
}

/// Validates the retry after a transient refresh failure.
///
/// Assertions:
/// - A 500 keeps the session and `refresh_due` stays set.
/// - The next attempt happens 60s later and succeeds.
#[tokio::test(start_paused = true)]
async fn transient_failure_retries_after_a_minute() {
    let harness = Harness::build(oauth_config("public"));
    harness
        .transport
        .respond(200, token_body("access-1", "refresh-1", 1))
        .respond(500, "unavailable")
        .respond(200, token_body("access-2", "refresh-1", 3600));
    harness.client.login("alice", "pw").await.unwrap();
    settle().await;

    assert_eq!(harness.transport.token_calls(), 2);
    assert!(harness.client.is_logged_in());
    assert!(harness.client.state().refresh_due);

    tokio::time::advance(Duration::from_secs(59)).await;
    settle().await;
    assert_eq!(harness.transport.token_calls(), 2);

    tokio::time::advance(Duration::from_secs(2)).await;
    settle().await;
    assert_eq!(harness.transport.token_calls(), 3);
    assert_eq!(harness.client.state().bearer_value, "access-2");
    assert!(!harness.client.state().refresh_due);
}

/// Validates that tokens shorter-lived than the cooldown keep refreshing.
///
/// Assertions:
/// - A trigger suppressed by the cooldown fires again once it is over.
/// - The session stays logged in with a timer armed throughout.
#[tokio::test(start_paused = true)]
async fn short_lived_tokens_keep_refreshing() {
    let harness = Harness::build(oauth_config("public"));
    harness.transport.respond(200, token_body("access-1", "refresh-1", 3));
    harness.transport.respond_always(200, token_body("access-n", "refresh-1", 3));
    harness.client.login("alice", "pw").await.unwrap();

    for _ in 0..100 {
        tokio::time::advance(Duration::from_millis(100)).await;
        settle().await;
    }

    assert!(harness.transport.token_calls() >= 6, "got {}", harness.transport.token_calls());
    assert!(harness.client.engine().timer_armed());
    assert!(harness.client.is_logged_in());
    assert_eq!(harness.client.state().bearer_value, "access-n");
}
