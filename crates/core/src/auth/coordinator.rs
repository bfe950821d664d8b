//! Login and refresh exchanges against the token endpoint
//!
//! Refreshes are single-flight: a trigger arriving while one is in flight, or
//! within the cooldown that follows it, is dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokenline_common::time::Clock;
use tokenline_domain::constants::{
    GRANT_TYPE_PASSWORD, GRANT_TYPE_REFRESH_TOKEN, REFRESH_COOLDOWN, REFRESH_RETRY_DELAY,
};
use tokenline_domain::{
    ClientConfig, CredentialRecord, HttpMethod, OutgoingRequest, RawResponse,
    RefreshableTokenConfig, RequestBody, SdkError, StorageLocation, TokenResponse, TransportError,
};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::authenticator::RequestAuthenticator;
use super::ports::HttpTransport;
use crate::session::SessionEngine;

/// Result of a refresh trigger
///
/// Failures are handled here and never surfaced as errors.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new record was committed
    Refreshed,
    /// Another refresh was in flight or cooling down
    Suppressed,
    /// Nothing to refresh (static-credential mode or logged out)
    Skipped,
    /// The exchange failed; `logged_out` when the credential was cleared
    Failed { logged_out: bool },
}

/// Runs login/refresh exchanges and commits the results to the engine
pub struct AuthCoordinator {
    config: Arc<ClientConfig>,
    engine: Arc<SessionEngine>,
    authenticator: Arc<RequestAuthenticator>,
    transport: Arc<dyn HttpTransport>,
    clock: Arc<dyn Clock>,
    in_flight: AtomicBool,
    cooldown_until: Mutex<Option<Instant>>,
}

/// Closes the in-flight window even if the refresh future is dropped
struct InFlightGuard<'a> {
    coordinator: &'a AuthCoordinator,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        *self.coordinator.cooldown_until.lock() = Some(Instant::now() + REFRESH_COOLDOWN);
        self.coordinator.in_flight.store(false, Ordering::Release);
    }
}

impl AuthCoordinator {
    pub fn new(
        config: Arc<ClientConfig>,
        engine: Arc<SessionEngine>,
        authenticator: Arc<RequestAuthenticator>,
        transport: Arc<dyn HttpTransport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            engine,
            authenticator,
            transport,
            clock,
            in_flight: AtomicBool::new(false),
            cooldown_until: Mutex::new(None),
        }
    }

    fn oauth(&self, operation: &'static str) -> Result<&RefreshableTokenConfig, SdkError> {
        self.config.auth().refreshable().ok_or(SdkError::UnsupportedInMode {
            operation,
            mode: self.config.auth().name(),
        })
    }

    /// Password grant, stored where the last record went (durable initially)
    ///
    /// # Errors
    /// `UnsupportedInMode` in static-credential mode, otherwise the exchange
    /// or storage failure. State is untouched on failure.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), SdkError> {
        self.login_with(username, password, None).await
    }

    /// Password grant stored in `location`
    ///
    /// # Errors
    /// Same as [`AuthCoordinator::login`].
    pub async fn login_to(
        &self,
        username: &str,
        password: &str,
        location: StorageLocation,
    ) -> Result<(), SdkError> {
        self.login_with(username, password, Some(location)).await
    }

    #[instrument(skip(self, password))]
    async fn login_with(
        &self,
        username: &str,
        password: &str,
        location: Option<StorageLocation>,
    ) -> Result<(), SdkError> {
        let oauth = self.oauth("login")?;

        let mut form = vec![
            ("grant_type".to_string(), GRANT_TYPE_PASSWORD.to_string()),
            ("username".to_string(), username.to_string()),
            ("password".to_string(), password.to_string()),
        ];
        form.extend(client_fields(oauth));

        let response = self.exchange(form).await.map_err(SdkError::NetworkUnreachable)?;
        if !response.is_success() {
            warn!(status = response.status, "Login rejected by token endpoint");
            return Err(status_error(&response));
        }

        let token = parse_token(&response)?;
        let record = CredentialRecord::new(
            token.access_token,
            token.refresh_token.unwrap_or_default(),
            username,
            self.clock.now(),
            token.expires_in,
        );
        self.engine.set_credential(record, location)?;

        info!("Login succeeded");
        Ok(())
    }

    /// Refresh grant with the current refresh token
    ///
    /// An authentication rejection (401/403) clears the credential when
    /// `auto_logout_on_401` is set. Any other failure keeps the credential
    /// and re-arms the engine timer for a later retry.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> RefreshOutcome {
        let Ok(oauth) = self.oauth("refresh") else {
            return RefreshOutcome::Skipped;
        };
        let refresh_token = self.engine.refresh_token();
        if !self.engine.is_logged_in() || refresh_token.is_empty() {
            debug!("Refresh skipped, no active session");
            return RefreshOutcome::Skipped;
        }

        let cooldown_until = *self.cooldown_until.lock();
        if let Some(remaining) = cooldown_until
            .and_then(|until| until.checked_duration_since(Instant::now()))
            .filter(|remaining| !remaining.is_zero())
        {
            debug!(
                remaining_ms = u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX),
                "Refresh suppressed, cooling down"
            );
            // A due refresh must fire again once the cooldown is over.
            if self.engine.state().refresh_due {
                self.engine.rearm_refresh_timer(remaining);
            }
            return RefreshOutcome::Suppressed;
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Refresh suppressed, already in flight");
            return RefreshOutcome::Suppressed;
        }
        let _guard = InFlightGuard { coordinator: self };

        let username = self.engine.username();
        let mut form = vec![
            ("grant_type".to_string(), GRANT_TYPE_REFRESH_TOKEN.to_string()),
            ("refresh_token".to_string(), refresh_token.clone()),
        ];
        form.extend(client_fields(oauth));

        let response = match self.exchange(form).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Refresh failed, token endpoint unreachable");
                return self.retry_later();
            }
        };

        if matches!(response.status, 401 | 403) {
            if self.config.options().auto_logout_on_401 {
                warn!(status = response.status, "Refresh rejected, logging out");
                self.engine.clear_credential();
                return RefreshOutcome::Failed { logged_out: true };
            }
            warn!(status = response.status, "Refresh rejected, keeping credential");
            return self.retry_later();
        }
        if !response.is_success() {
            warn!(status = response.status, "Refresh failed with unexpected status");
            return self.retry_later();
        }

        let token = match parse_token(&response) {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Refresh response unreadable");
                return self.retry_later();
            }
        };

        // A logout or new login during the exchange wins.
        if self.engine.refresh_token() != refresh_token {
            info!("Session changed during refresh, discarding result");
            return RefreshOutcome::Skipped;
        }

        let record = CredentialRecord::new(
            token.access_token,
            refresh_token,
            username,
            self.clock.now(),
            token.expires_in,
        );
        if let Err(e) = self.engine.set_credential(record, None) {
            warn!(error = %e, "Refreshed credential could not be stored");
            return self.retry_later();
        }

        info!("Access token refreshed");
        RefreshOutcome::Refreshed
    }

    fn retry_later(&self) -> RefreshOutcome {
        self.engine.rearm_refresh_timer(REFRESH_RETRY_DELAY);
        RefreshOutcome::Failed { logged_out: false }
    }

    /// Clear the credential (idempotent)
    pub fn logout(&self) {
        self.engine.clear_credential();
    }

    /// Refresh whenever the engine reports `refresh_due`
    ///
    /// Returns `None` outside a tokio runtime or in static-credential mode.
    /// The caller owns the task and aborts it on shutdown.
    pub fn spawn_refresh_listener(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self.config.auth().is_static() {
            return None;
        }
        let Ok(runtime) = Handle::try_current() else {
            warn!("No tokio runtime available, refresh listener not started");
            return None;
        };

        let mut states = self.engine.subscribe();
        let coordinator = Arc::clone(self);
        Some(runtime.spawn(async move {
            loop {
                let due = states.borrow_and_update().refresh_due;
                if due {
                    let outcome = coordinator.refresh().await;
                    debug!(?outcome, "Scheduled refresh finished");
                }
                if states.changed().await.is_err() {
                    break;
                }
            }
        }))
    }

    async fn exchange(
        &self,
        form: Vec<(String, String)>,
    ) -> Result<RawResponse, TransportError> {
        let mut request = OutgoingRequest::new(HttpMethod::Post, self.config.token_url())
            .with_body(RequestBody::Form(form));
        self.authenticator.apply(&mut request);
        self.transport.execute(request).await
    }
}

fn client_fields(oauth: &RefreshableTokenConfig) -> [(String, String); 3] {
    [
        ("scope".to_string(), oauth.scope.clone()),
        ("client_id".to_string(), oauth.client_id.clone()),
        ("client_secret".to_string(), oauth.client_secret.clone()),
    ]
}

fn parse_token(response: &RawResponse) -> Result<TokenResponse, SdkError> {
    serde_json::from_str(&response.body).map_err(|e| SdkError::InvalidResponse(e.to_string()))
}

fn status_error(response: &RawResponse) -> SdkError {
    let content = response.content();
    if response.status == 401 {
        SdkError::Unauthorized { content }
    } else {
        SdkError::UnexpectedStatus { expected: 200, actual: response.status, content }
    }
}
