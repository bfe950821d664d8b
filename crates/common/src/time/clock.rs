//! Wall-clock sources
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use tokenline_common::time::{Clock, MockClock};
//!
//! let mock = MockClock::new();
//! let start = mock.now();
//! mock.advance(Duration::from_secs(5));
//! assert_eq!((mock.now() - start).num_seconds(), 5);
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// Source of the current wall-clock time
pub trait Clock: Send + Sync {
    /// Current UTC time
    fn now(&self) -> DateTime<Utc>;
}

/// Real system clock for production use
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// Manually driven clock for tests
///
/// Time only moves when [`MockClock::advance`] or [`MockClock::set`] is
/// called. Clones share the same underlying instant.
#[derive(Debug, Clone)]
pub struct MockClock {
    current: Arc<Mutex<DateTime<Utc>>>,
}

impl MockClock {
    /// Create a mock clock frozen at the current system time
    #[must_use]
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// Create a mock clock frozen at `instant`
    #[must_use]
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self { current: Arc::new(Mutex::new(instant)) }
    }

    /// Move the clock forward
    ///
    /// Durations that would overflow the representable range are ignored.
    pub fn advance(&self, duration: Duration) {
        let Ok(delta) = chrono::Duration::from_std(duration) else {
            return;
        };
        let mut current = self.current.lock();
        if let Some(next) = current.checked_add_signed(delta) {
            *current = next;
        }
    }

    /// Jump to a specific instant
    pub fn set(&self, instant: DateTime<Utc>) {
        *self.current.lock() = instant;
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock()
    }
}
