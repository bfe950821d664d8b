//! Shared test helpers for `tokenline-core` integration tests.
//!
//! Provides a scripted HTTP transport and in-memory key/value stores so the
//! session tests can focus on behaviour instead of plumbing.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokenline_common::time::{Clock, MockClock};
use tokenline_core::{CredentialStore, HttpTransport, KeyValueStore, SessionClient, SessionEngine};
use tokenline_domain::{
    BasicSettings, ClientConfig, ClientSettings, CredentialRecord, OAuthSettings,
    OutgoingRequest, RawResponse, RequestBody, StoreError, TransportError,
};

pub const HOST: &str = "https://lims.example.com";
pub const TOKEN_URL: &str = "https://lims.example.com/webauth/oauth/token";
pub const STORAGE_KEY: &str = "session-store-key";

// ============================================================================
// Transport
// ============================================================================

/// Transport answering from a script, recording every request
#[derive(Default)]
pub struct FakeTransport {
    script: Mutex<VecDeque<Result<RawResponse, TransportError>>>,
    fallback: Mutex<Option<RawResponse>>,
    requests: Mutex<Vec<OutgoingRequest>>,
    latency: Mutex<Option<Duration>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue one response
    pub fn respond(&self, status: u16, body: impl Into<String>) -> &Self {
        self.script.lock().push_back(Ok(RawResponse::new(status, body)));
        self
    }

    /// Queue one transport failure
    pub fn fail(&self, error: TransportError) -> &Self {
        self.script.lock().push_back(Err(error));
        self
    }

    /// Response used once the script is exhausted
    pub fn respond_always(&self, status: u16, body: impl Into<String>) {
        *self.fallback.lock() = Some(RawResponse::new(status, body));
    }

    /// Simulated network latency (virtual time)
    pub fn with_latency(&self, latency: Duration) {
        *self.latency.lock() = Some(latency);
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests(&self) -> Vec<OutgoingRequest> {
        self.requests.lock().clone()
    }

    pub fn last_request(&self) -> Option<OutgoingRequest> {
        self.requests.lock().last().cloned()
    }

    pub fn token_calls(&self) -> usize {
        self.requests.lock().iter().filter(|r| r.url == TOKEN_URL).count()
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn execute(&self, request: OutgoingRequest) -> Result<RawResponse, TransportError> {
        self.requests.lock().push(request);

        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let scripted = self.script.lock().pop_front();
        match scripted {
            Some(result) => result,
            None => self
                .fallback
                .lock()
                .clone()
                .ok_or_else(|| TransportError::Connect("no scripted response".into())),
        }
    }
}

/// Form field value of a token endpoint request
pub fn form_field<'a>(request: &'a OutgoingRequest, name: &str) -> Option<&'a str> {
    match &request.body {
        RequestBody::Form(fields) => {
            fields.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
        }
        _ => None,
    }
}

pub fn token_body(access: &str, refresh: &str, expires_in: u64) -> String {
    serde_json::json!({
        "access_token": access,
        "refresh_token": refresh,
        "expires_in": expires_in,
        "scope": "public private",
        "token_type": "bearer",
    })
    .to_string()
}

// ============================================================================
// Storage
// ============================================================================

/// In-memory key/value store counting reads
#[derive(Default)]
pub struct MemoryKv {
    entries: Mutex<HashMap<String, String>>,
    reads: AtomicUsize,
    fail_writes: AtomicBool,
}

impl MemoryKv {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn fail_writes(&self, enabled: bool) {
        self.fail_writes.store(enabled, Ordering::SeqCst);
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    pub fn record(&self) -> Option<CredentialRecord> {
        self.raw(STORAGE_KEY).and_then(|raw| serde_json::from_str(&raw).ok())
    }

    pub fn put_record(&self, record: &CredentialRecord) {
        let raw = serde_json::to_string(record).unwrap();
        self.entries.lock().insert(STORAGE_KEY.to_string(), raw);
    }

    pub fn put_raw(&self, value: &str) {
        self.entries.lock().insert(STORAGE_KEY.to_string(), value.to_string());
    }
}

impl KeyValueStore for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected write failure".into()));
        }
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn oauth_settings(scope: &str) -> ClientSettings {
    ClientSettings {
        host: HOST.into(),
        oauth: Some(OAuthSettings {
            client_id: "client-1".into(),
            client_secret: "s3cret".into(),
            scope: scope.into(),
            storage_key: None,
        }),
        ..ClientSettings::default()
    }
}

pub fn basic_settings() -> ClientSettings {
    ClientSettings {
        host: HOST.into(),
        basic: Some(BasicSettings {
            username: "svc".into(),
            password: "pw".into(),
            provider: "ldap".into(),
        }),
        ..ClientSettings::default()
    }
}

pub fn oauth_config(scope: &str) -> ClientConfig {
    oauth_settings(scope).validate().unwrap()
}

/// Everything a test needs to poke at a client from the outside
pub struct Harness {
    pub client: SessionClient,
    pub transport: Arc<FakeTransport>,
    pub durable: Arc<MemoryKv>,
    pub ephemeral: Arc<MemoryKv>,
    pub clock: MockClock,
}

impl Harness {
    pub fn build(config: ClientConfig) -> Self {
        Self::build_with(
            config,
            MemoryKv::new(),
            MemoryKv::new(),
            FakeTransport::new(),
            MockClock::new(),
        )
    }

    pub fn build_with(
        config: ClientConfig,
        durable: Arc<MemoryKv>,
        ephemeral: Arc<MemoryKv>,
        transport: Arc<FakeTransport>,
        clock: MockClock,
    ) -> Self {
        let store = CredentialStore::new(durable.clone(), ephemeral.clone(), STORAGE_KEY);
        let shared_clock: Arc<dyn Clock> = Arc::new(clock.clone());
        let client = SessionClient::new(config, transport.clone(), store, shared_clock);
        Self { client, transport, durable, ephemeral, clock }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

/// Engine without a coordinator, so nothing reacts to `refresh_due`
pub fn build_engine(
    config: ClientConfig,
    durable: &Arc<MemoryKv>,
    ephemeral: &Arc<MemoryKv>,
    clock: &MockClock,
) -> SessionEngine {
    let store = CredentialStore::new(durable.clone(), ephemeral.clone(), STORAGE_KEY);
    SessionEngine::new(Arc::new(config), store, Arc::new(clock.clone()))
}

/// Let spawned tasks run to their next await point
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
