//! SDK constants
//!
//! Centralized location for the timing, path and header constants shared by
//! the engine and the adapters.

use std::time::Duration;

// Refresh scheduling
/// Lead time subtracted from the expiry when arming the refresh timer
pub const REFRESH_SAFETY_MARGIN: Duration = Duration::from_millis(2_500);
/// Upper bound on a single refresh timer delay
pub const MAX_REFRESH_DELAY: Duration = Duration::from_secs(60 * 60);
/// How long the in-flight refresh guard stays closed after an attempt
pub const REFRESH_COOLDOWN: Duration = Duration::from_secs(1);
/// Minimum delay before retrying after a transient refresh failure
pub const REFRESH_RETRY_DELAY: Duration = Duration::from_secs(60);

// Storage
pub const DEFAULT_STORAGE_KEY: &str = "session-store-key";
pub const DEFAULT_KEYCHAIN_SERVICE: &str = "tokenline";

// Token endpoint
/// Path of the token endpoint relative to the host (never version-prefixed)
pub const TOKEN_PATH: &str = "webauth/oauth/token";
pub const GRANT_TYPE_PASSWORD: &str = "password";
pub const GRANT_TYPE_REFRESH_TOKEN: &str = "refresh_token";

// Headers
pub const HEADER_AUTHORIZATION: &str = "Authorization";
pub const HEADER_AUTH_PROVIDER: &str = "AuthProvider";
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";
pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";

// Capability scope markers
pub const SCOPE_PUBLIC: &str = "public";
pub const SCOPE_PRIVATE: &str = "private";

// Environment
/// Prefix for configuration environment variables
pub const ENV_PREFIX: &str = "TOKENLINE_";
