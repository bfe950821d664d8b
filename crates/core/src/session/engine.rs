//! Session engine
//!
//! Owns the in-memory credential record, computes expiry, arms the proactive
//! refresh timer and publishes [`SessionState`] through a `watch` channel.
//!
//! Every mutation takes the single engine lock for the whole update and
//! publishes once while holding it, so subscribers only ever observe fully
//! formed states. The refresh timer is a spawned sleep task; re-arming aborts
//! the previous task first and a generation counter discards a task that had
//! already woken up when it was superseded.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokenline_common::time::Clock;
use tokenline_domain::constants::{MAX_REFRESH_DELAY, REFRESH_SAFETY_MARGIN};
use tokenline_domain::{ClientConfig, CredentialRecord, SessionState, StorageLocation, StoreError};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::store::CredentialStore;

/// Delay before the refresh timer should fire for a record expiring at
/// `expiry`
///
/// `max(0, min(expiry - now - 2.5s, 1h))`
#[must_use]
pub fn refresh_delay(expiry: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    let remaining = expiry.signed_duration_since(now).to_std().unwrap_or(Duration::ZERO);
    remaining.saturating_sub(REFRESH_SAFETY_MARGIN).min(MAX_REFRESH_DELAY)
}

struct EngineInner {
    record: Option<CredentialRecord>,
    location: StorageLocation,
    timer: Option<JoinHandle<()>>,
    timer_generation: u64,
}

impl EngineInner {
    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.timer_generation = self.timer_generation.wrapping_add(1);
    }
}

/// State shared with timer tasks
struct EngineShared {
    inner: Mutex<EngineInner>,
    state: watch::Sender<SessionState>,
}

impl EngineShared {
    fn mark_refresh_due(&self, generation: u64) {
        let inner = self.inner.lock();
        if inner.timer_generation != generation {
            return;
        }
        // Notifies on every fire while logged in so a re-armed timer wakes
        // listeners even when the flag is already set.
        let fired = self.state.send_if_modified(|state| {
            if !state.logged_in {
                return false;
            }
            state.refresh_due = true;
            true
        });
        if fired {
            debug!("Refresh timer fired, refresh due");
        }
    }
}

/// Credential state machine for one client
pub struct SessionEngine {
    config: Arc<ClientConfig>,
    store: CredentialStore,
    clock: Arc<dyn Clock>,
    shared: Arc<EngineShared>,
}

impl SessionEngine {
    /// Initialize from configuration
    ///
    /// Static-credential mode is logged in immediately and never touches
    /// storage. Refreshable-token mode adopts the stored record, if any,
    /// remembering which backend it came from. The record is written back
    /// there, which drops a stale copy in the other backend; a failed write
    /// is logged and the record is adopted anyway.
    pub fn new(config: Arc<ClientConfig>, store: CredentialStore, clock: Arc<dyn Clock>) -> Self {
        let initial = if config.auth().is_static() {
            SessionState::static_credential()
        } else {
            SessionState::logged_out()
        };
        let (state, _) = watch::channel(initial);

        let engine = Self {
            config,
            store,
            clock,
            shared: Arc::new(EngineShared {
                inner: Mutex::new(EngineInner {
                    record: None,
                    location: StorageLocation::default(),
                    timer: None,
                    timer_generation: 0,
                }),
                state,
            }),
        };

        if engine.is_static() {
            info!(mode = engine.config.auth().name(), "Session engine initialized");
            return engine;
        }

        match engine.store.load() {
            Some((record, location)) => {
                let record = record.with_recomputed_expiry();
                let mut inner = engine.shared.inner.lock();
                if let Err(e) = engine.store.save(&record, location) {
                    warn!(?location, error = %e, "Failed to rewrite restored credential");
                }
                engine.commit(&mut inner, record, location);
                drop(inner);
                info!(
                    ?location,
                    logged_in = engine.is_logged_in(),
                    "Session engine restored stored credential"
                );
            }
            None => debug!("No stored credential, starting logged out"),
        }
        engine
    }

    fn is_static(&self) -> bool {
        self.config.auth().is_static()
    }

    /// Adopt a new credential record
    ///
    /// `location` overrides the remembered store; `None` keeps writing where
    /// the last record went (durable initially). No-op in static-credential
    /// mode.
    ///
    /// # Errors
    /// Returns the storage failure; the in-memory state is left untouched.
    pub fn set_credential(
        &self,
        record: CredentialRecord,
        location: Option<StorageLocation>,
    ) -> Result<(), StoreError> {
        if self.is_static() {
            debug!("Ignoring credential record in static-credential mode");
            return Ok(());
        }

        let mut inner = self.shared.inner.lock();
        let location = location.unwrap_or(inner.location);
        let record = record.with_recomputed_expiry();

        self.store.save(&record, location)?;
        self.commit(&mut inner, record, location);
        Ok(())
    }

    fn commit(&self, inner: &mut EngineInner, record: CredentialRecord, location: StorageLocation) {
        let logged_in = record.has_tokens();
        let bearer = record.access_token.clone();

        if logged_in {
            let delay = refresh_delay(record.expiry_time, self.clock.now());
            self.arm_timer(inner, delay);
        } else {
            inner.cancel_timer();
        }
        inner.record = Some(record);
        inner.location = location;

        self.shared.state.send_modify(|state| {
            state.logged_in = logged_in;
            state.refresh_due = false;
            state.bearer_value = bearer;
        });
    }

    /// Discard the credential and erase both stores (idempotent)
    ///
    /// No-op in static-credential mode. A storage failure is logged; the
    /// in-memory session is cleared regardless.
    pub fn clear_credential(&self) {
        if self.is_static() {
            return;
        }

        let mut inner = self.shared.inner.lock();
        inner.cancel_timer();
        let had_record = inner.record.take().is_some();

        if let Err(e) = self.store.erase() {
            warn!(error = %e, "Failed to erase stored credential");
        }

        let changed = self.shared.state.send_if_modified(|state| {
            let cleared = SessionState::logged_out();
            if *state == cleared {
                return false;
            }
            *state = cleared;
            true
        });
        if had_record || changed {
            info!("Credential cleared");
        }
    }

    /// Re-arm the refresh timer with the policy delay floored at `min_delay`
    ///
    /// Does nothing unless a logged-in record is held.
    pub fn rearm_refresh_timer(&self, min_delay: Duration) {
        let mut inner = self.shared.inner.lock();
        let Some(expiry) =
            inner.record.as_ref().filter(|record| record.has_tokens()).map(|r| r.expiry_time)
        else {
            return;
        };
        let delay = refresh_delay(expiry, self.clock.now()).max(min_delay);
        self.arm_timer(&mut inner, delay);
    }

    fn arm_timer(&self, inner: &mut EngineInner, delay: Duration) {
        inner.cancel_timer();
        let generation = inner.timer_generation;

        let Ok(runtime) = Handle::try_current() else {
            warn!("No tokio runtime available, refresh timer not armed");
            return;
        };

        let deadline = tokio::time::Instant::now() + delay;
        let shared = Arc::clone(&self.shared);
        inner.timer = Some(runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            shared.mark_refresh_due(generation);
        }));
        debug!(delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX), "Refresh timer armed");
    }

    /// Subscribe to state changes; the current value is replayed first
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.shared.state.subscribe()
    }

    /// Current state snapshot
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.shared.state.borrow().clone()
    }

    /// Whether both tokens are held (always true in static-credential mode)
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.shared.state.borrow().logged_in
    }

    /// Current access token, empty when logged out
    #[must_use]
    pub fn bearer_value(&self) -> String {
        self.shared.state.borrow().bearer_value.clone()
    }

    /// Refresh token of the held record, empty when none
    #[must_use]
    pub fn refresh_token(&self) -> String {
        self.shared.inner.lock().record.as_ref().map(|r| r.refresh_token.clone()).unwrap_or_default()
    }

    /// Username of the held record, empty when none
    #[must_use]
    pub fn username(&self) -> String {
        self.shared.inner.lock().record.as_ref().map(|r| r.username.clone()).unwrap_or_default()
    }

    /// Copy of the held record
    #[must_use]
    pub fn credential(&self) -> Option<CredentialRecord> {
        self.shared.inner.lock().record.clone()
    }

    /// Store the next record is written to unless overridden
    #[must_use]
    pub fn storage_location(&self) -> StorageLocation {
        self.shared.inner.lock().location
    }

    /// Whether a refresh timer is pending
    #[must_use]
    pub fn timer_armed(&self) -> bool {
        self.shared.inner.lock().timer.as_ref().is_some_and(|timer| !timer.is_finished())
    }
}

impl Drop for SessionEngine {
    fn drop(&mut self) {
        self.shared.inner.lock().cancel_timer();
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    #[test]
    fn delay_subtracts_safety_margin() {
        let now = Utc::now();
        let delay = refresh_delay(now + TimeDelta::seconds(60), now);
        assert_eq!(delay, Duration::from_millis(57_500));
    }

    #[test]
    fn delay_is_capped_at_one_hour() {
        let now = Utc::now();
        assert_eq!(refresh_delay(now + TimeDelta::days(30), now), MAX_REFRESH_DELAY);
        assert_eq!(refresh_delay(DateTime::<Utc>::MAX_UTC, now), MAX_REFRESH_DELAY);
    }

    #[test]
    fn delay_never_negative() {
        let now = Utc::now();
        assert_eq!(refresh_delay(now - TimeDelta::seconds(10), now), Duration::ZERO);
        assert_eq!(refresh_delay(now + TimeDelta::seconds(2), now), Duration::ZERO);
    }
}
