//! Error classification shared by every Tokenline error type
//!
//! Library crates define their own `thiserror` enums; this module only
//! provides the vocabulary used to reason about them uniformly:
//!
//! - **`ErrorClassification`**: retryability and severity of an error
//! - **`ErrorSeverity`**: a unified severity scale used when logging
//!
//! | Level | Use Case | Examples |
//! |-------|----------|----------|
//! | **Info** | Expected conditions | Not logged in, capability not granted |
//! | **Warning** | Degraded but operational | Server unreachable, transient refresh failure |
//! | **Error** | Failure requiring attention | Unexpected status, storage failure |
//! | **Critical** | Integrity at risk | Invalid configuration reaching runtime |

use std::fmt;
use std::time::Duration;

/// Severity levels for errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    /// Informational, expected conditions
    Info,
    /// Degraded but still operational
    Warning,
    /// Failure that needs attention
    Error,
    /// Integrity at risk
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        };
        f.write_str(label)
    }
}

/// Standard interface for classifying errors by their characteristics
pub trait ErrorClassification {
    /// Whether repeating the same operation later may succeed
    fn is_retryable(&self) -> bool;

    /// Severity used for logging and alerting
    fn severity(&self) -> ErrorSeverity;

    /// Whether the error needs immediate attention
    fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Critical
    }

    /// Suggested delay before retrying, if any
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}
