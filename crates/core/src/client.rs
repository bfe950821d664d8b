//! Session client facade
//!
//! Wires the engine, coordinator, authenticator and gate together and
//! exposes the generic gated call used by endpoint wrappers.

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokenline_common::error::{ErrorClassification, ErrorSeverity};
use tokenline_common::time::Clock;
use tokenline_domain::{
    ApiCall, ApiResponse, ClientConfig, OutgoingRequest, RawResponse, SdkError, SessionState,
    StorageLocation,
};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::auth::ports::HttpTransport;
use crate::auth::{AuthCoordinator, CapabilityGate, RefreshOutcome, RequestAuthenticator};
use crate::session::{CredentialStore, SessionEngine};

/// Future returned by [`SessionClient::call`]
pub type CallFuture<'a> = BoxFuture<'a, Result<ApiResponse, SdkError>>;

/// Session-aware client for one server
pub struct SessionClient {
    config: Arc<ClientConfig>,
    engine: Arc<SessionEngine>,
    coordinator: Arc<AuthCoordinator>,
    authenticator: Arc<RequestAuthenticator>,
    gate: CapabilityGate,
    transport: Arc<dyn HttpTransport>,
    refresh_listener: Option<JoinHandle<()>>,
}

impl SessionClient {
    /// Build a client and start the refresh listener on the ambient runtime
    pub fn new(
        config: ClientConfig,
        transport: Arc<dyn HttpTransport>,
        store: CredentialStore,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let config = Arc::new(config);
        let engine = Arc::new(SessionEngine::new(Arc::clone(&config), store, Arc::clone(&clock)));
        let authenticator =
            Arc::new(RequestAuthenticator::new(Arc::clone(&config), Arc::clone(&engine)));
        let coordinator = Arc::new(AuthCoordinator::new(
            Arc::clone(&config),
            Arc::clone(&engine),
            Arc::clone(&authenticator),
            Arc::clone(&transport),
            clock,
        ));
        let gate = CapabilityGate::new(Arc::clone(&config), Arc::clone(&engine));
        let refresh_listener = coordinator.spawn_refresh_listener();

        Self { config, engine, coordinator, authenticator, gate, transport, refresh_listener }
    }

    /// Validated configuration this client was built with
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Underlying session engine
    #[must_use]
    pub fn engine(&self) -> &Arc<SessionEngine> {
        &self.engine
    }

    /// Issue a gated API call
    ///
    /// The outer `Err` is the fail-fast channel used when `raise_on_misuse` is
    /// set. Otherwise a refused call still returns a future, which resolves to
    /// the error after yielding once and without touching the network.
    ///
    /// # Errors
    /// `CapabilityMissing` or `AuthenticationRequired` when `raise_on_misuse`
    /// is set and the gate refuses the call.
    pub fn call(&self, call: ApiCall) -> Result<CallFuture<'_>, SdkError> {
        if let Err(rejection) = self.gate.check(call.capability) {
            if self.config.raise_on_misuse() {
                return Err(rejection.into_raised());
            }
            let error = rejection.into_value();
            return Ok(async move {
                tokio::task::yield_now().await;
                Err(error)
            }
            .boxed());
        }

        let request = OutgoingRequest::new(call.method, self.config.api_url(&call.path))
            .with_body(call.body);
        let expected = call.expected_status;
        Ok(self.send(request, expected).boxed())
    }

    async fn send(&self, mut request: OutgoingRequest, expected: u16) -> Result<ApiResponse, SdkError> {
        self.authenticator.apply(&mut request);
        debug!(method = %request.method, url = %request.url, "Sending API request");

        let response = match self.transport.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                let err = SdkError::NetworkUnreachable(e);
                log_failure(&err);
                return Err(err);
            }
        };
        self.classify(expected, response)
    }

    fn classify(&self, expected: u16, response: RawResponse) -> Result<ApiResponse, SdkError> {
        let status = response.status;
        if response.is_success() || status == 304 {
            return Ok(ApiResponse { status, content: response.content() });
        }

        let content = response.content();
        let err = if status == 401 {
            self.kick_refresh();
            SdkError::Unauthorized { content }
        } else {
            SdkError::UnexpectedStatus { expected, actual: status, content }
        };
        log_failure(&err);
        Err(err)
    }

    /// Background refresh after a server 401 in refreshable-token mode
    fn kick_refresh(&self) {
        if self.config.auth().is_static() || !self.engine.is_logged_in() {
            return;
        }
        let Ok(runtime) = Handle::try_current() else {
            return;
        };
        let coordinator = Arc::clone(&self.coordinator);
        drop(runtime.spawn(async move {
            let outcome = coordinator.refresh().await;
            debug!(?outcome, "Refresh after 401 finished");
        }));
    }

    /// # Errors
    /// See [`AuthCoordinator::login`].
    pub async fn login(&self, username: &str, password: &str) -> Result<(), SdkError> {
        self.coordinator.login(username, password).await
    }

    /// Log in and store the credential in `location`
    ///
    /// # Errors
    /// See [`AuthCoordinator::login`].
    pub async fn login_to(
        &self,
        username: &str,
        password: &str,
        location: StorageLocation,
    ) -> Result<(), SdkError> {
        self.coordinator.login_to(username, password, location).await
    }

    /// Clear the credential from memory and both stores
    pub fn logout(&self) {
        self.coordinator.logout();
    }

    /// Run a refresh grant now, subject to single-flight and cooldown
    pub async fn refresh(&self) -> RefreshOutcome {
        self.coordinator.refresh().await
    }

    /// See [`SessionEngine::is_logged_in`]
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.engine.is_logged_in()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.engine.subscribe()
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.engine.state()
    }

    /// Username of the current session, empty when none
    #[must_use]
    pub fn username(&self) -> String {
        self.engine.username()
    }

    #[must_use]
    pub fn is_public_allowed(&self) -> bool {
        self.gate.is_public_allowed()
    }

    #[must_use]
    pub fn is_internal_allowed(&self) -> bool {
        self.gate.is_internal_allowed()
    }
}

impl Drop for SessionClient {
    fn drop(&mut self) {
        if let Some(listener) = self.refresh_listener.take() {
            listener.abort();
        }
    }
}

fn log_failure(err: &SdkError) {
    match err.severity() {
        ErrorSeverity::Critical | ErrorSeverity::Error => {
            error!(error = %err, status = ?err.status(), "API call failed");
        }
        ErrorSeverity::Warning | ErrorSeverity::Info => {
            warn!(error = %err, status = ?err.status(), retryable = err.is_retryable(), "API call failed");
        }
    }
}
