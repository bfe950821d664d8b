//! Time abstraction for testability
//!
//! Session code reads wall-clock time through [`Clock`] so that expiry
//! arithmetic can be tested against a fixed instant.

mod clock;

pub use clock::{Clock, MockClock, SystemClock};
