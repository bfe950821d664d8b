//! Observable session state

use std::fmt;

/// Snapshot published by the session engine on every change
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Static-credential mode, or both tokens present
    pub logged_in: bool,
    /// The refresh timer fired while logged in and no new record has arrived yet
    pub refresh_due: bool,
    /// Current access token, empty when logged out
    pub bearer_value: String,
}

impl SessionState {
    /// State of a refreshable-token session with no credential
    #[must_use]
    pub fn logged_out() -> Self {
        Self::default()
    }

    /// State of a static-credential session
    #[must_use]
    pub fn static_credential() -> Self {
        Self { logged_in: true, ..Self::default() }
    }
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("logged_in", &self.logged_in)
            .field("refresh_due", &self.refresh_due)
            .field("has_bearer", &!self.bearer_value.is_empty())
            .finish()
    }
}
