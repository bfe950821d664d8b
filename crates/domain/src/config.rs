//! Client configuration
//!
//! [`ClientSettings`] is the raw, deserializable shape read from the
//! environment or a config file. [`ClientSettings::validate`] turns it into an
//! immutable [`ClientConfig`] or fails with a numbered [`ConfigError`].

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::{DEFAULT_STORAGE_KEY, SCOPE_PRIVATE, SCOPE_PUBLIC, TOKEN_PATH};
use crate::errors::ConfigError;

/// Raw client settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Server base URL
    pub host: String,
    /// Optional path prefix for API calls (never applied to the token endpoint)
    pub legacy_version: Option<String>,
    /// Static-credential mode block
    pub basic: Option<BasicSettings>,
    /// Refreshable-token mode block
    pub oauth: Option<OAuthSettings>,
    pub options: ClientOptions,
    /// Fail synchronously on capability/login misuse instead of resolving to
    /// an error value
    pub raise_on_misuse: bool,
}

/// Static-credential settings
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicSettings {
    pub username: String,
    pub password: String,
    pub provider: String,
}

/// Refreshable-token settings
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthSettings {
    pub client_id: String,
    pub client_secret: String,
    pub scope: String,
    pub storage_key: Option<String>,
}

/// Behavioural options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientOptions {
    /// Clear the credential when the token endpoint rejects a refresh
    #[serde(default = "default_true")]
    pub auto_logout_on_401: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self { auto_logout_on_401: true }
    }
}

fn default_true() -> bool {
    true
}

impl fmt::Debug for BasicSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicSettings")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("provider", &self.provider)
            .finish()
    }
}

impl fmt::Debug for OAuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthSettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("scope", &self.scope)
            .field("storage_key", &self.storage_key)
            .finish()
    }
}

impl ClientSettings {
    /// Validate into an immutable configuration
    ///
    /// # Errors
    /// Returns the first [`ConfigError`] found, checking the host before the
    /// auth mode.
    pub fn validate(self) -> Result<ClientConfig, ConfigError> {
        let host = normalize_host(&self.host)?;

        let api_base = match self.legacy_version.as_deref().map(|v| v.trim_matches('/')) {
            Some(version) if !version.is_empty() => format!("{host}{version}/"),
            _ => host.clone(),
        };
        let token_url = format!("{host}{TOKEN_PATH}");

        let auth = match (self.basic, self.oauth) {
            (None, None) => return Err(ConfigError::NoAuthMode),
            (Some(_), Some(_)) => return Err(ConfigError::BothAuthModes),
            (Some(basic), None) => AuthMode::StaticCredential(validate_basic(basic)?),
            (None, Some(oauth)) => AuthMode::RefreshableToken(validate_oauth(oauth)?),
        };

        Ok(ClientConfig {
            host,
            api_base,
            token_url,
            auth,
            options: self.options,
            raise_on_misuse: self.raise_on_misuse,
        })
    }
}

impl TryFrom<ClientSettings> for ClientConfig {
    type Error = ConfigError;

    fn try_from(settings: ClientSettings) -> Result<Self, Self::Error> {
        settings.validate()
    }
}

fn normalize_host(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::MissingHost);
    }

    let parsed = Url::parse(trimmed).map_err(|e| ConfigError::InvalidHost(format!("{trimmed}: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.cannot_be_a_base() {
        return Err(ConfigError::InvalidHost(trimmed.to_string()));
    }

    let mut host = trimmed.to_string();
    if !host.ends_with('/') {
        host.push('/');
    }
    Ok(host)
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn validate_basic(basic: BasicSettings) -> Result<StaticCredentialConfig, ConfigError> {
    if is_blank(&basic.username) {
        return Err(ConfigError::MissingBasicUsername);
    }
    if basic.password.is_empty() {
        return Err(ConfigError::MissingBasicPassword);
    }
    if is_blank(&basic.provider) {
        return Err(ConfigError::MissingAuthProvider);
    }
    Ok(StaticCredentialConfig {
        username: basic.username,
        password: basic.password,
        provider: basic.provider,
    })
}

fn validate_oauth(oauth: OAuthSettings) -> Result<RefreshableTokenConfig, ConfigError> {
    if is_blank(&oauth.client_id) {
        return Err(ConfigError::MissingClientId);
    }
    if is_blank(&oauth.client_secret) {
        return Err(ConfigError::MissingClientSecret);
    }
    if is_blank(&oauth.scope) {
        return Err(ConfigError::MissingScope);
    }
    let storage_key = oauth
        .storage_key
        .filter(|key| !is_blank(key))
        .unwrap_or_else(|| DEFAULT_STORAGE_KEY.to_string());

    Ok(RefreshableTokenConfig {
        client_id: oauth.client_id,
        client_secret: oauth.client_secret,
        scope: oauth.scope,
        storage_key,
    })
}

/// Validated, immutable client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    host: String,
    api_base: String,
    token_url: String,
    auth: AuthMode,
    options: ClientOptions,
    raise_on_misuse: bool,
}

impl ClientConfig {
    /// Host with a trailing slash
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Base URL for API calls (host plus the optional legacy version prefix)
    #[must_use]
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Absolute URL of the token endpoint
    #[must_use]
    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    #[must_use]
    pub fn auth(&self) -> &AuthMode {
        &self.auth
    }

    #[must_use]
    pub fn options(&self) -> ClientOptions {
        self.options
    }

    #[must_use]
    pub fn raise_on_misuse(&self) -> bool {
        self.raise_on_misuse
    }

    /// Join `path` onto the API base
    #[must_use]
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path.trim_start_matches('/'))
    }

    /// Whether `url` addresses the token endpoint
    #[must_use]
    pub fn is_token_url(&self, url: &str) -> bool {
        url.split(['?', '#']).next() == Some(self.token_url.as_str())
    }
}

/// Exactly one authentication mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMode {
    StaticCredential(StaticCredentialConfig),
    RefreshableToken(RefreshableTokenConfig),
}

impl AuthMode {
    /// Mode name used in logs and usage errors
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::StaticCredential(_) => "static-credential",
            Self::RefreshableToken(_) => "refreshable-token",
        }
    }

    #[must_use]
    pub fn is_static(&self) -> bool {
        matches!(self, Self::StaticCredential(_))
    }

    #[must_use]
    pub fn refreshable(&self) -> Option<&RefreshableTokenConfig> {
        match self {
            Self::RefreshableToken(config) => Some(config),
            Self::StaticCredential(_) => None,
        }
    }
}

/// Fixed credentials sent on every request
#[derive(Clone, PartialEq, Eq)]
pub struct StaticCredentialConfig {
    pub username: String,
    pub password: String,
    pub provider: String,
}

/// Client credentials for the token endpoint
#[derive(Clone, PartialEq, Eq)]
pub struct RefreshableTokenConfig {
    pub client_id: String,
    pub client_secret: String,
    pub scope: String,
    /// Entry name used in both credential stores
    pub storage_key: String,
}

impl RefreshableTokenConfig {
    #[must_use]
    pub fn grants_public(&self) -> bool {
        self.scope.contains(SCOPE_PUBLIC)
    }

    #[must_use]
    pub fn grants_private(&self) -> bool {
        self.scope.contains(SCOPE_PRIVATE)
    }
}

impl fmt::Debug for StaticCredentialConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentialConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("provider", &self.provider)
            .finish()
    }
}

impl fmt::Debug for RefreshableTokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshableTokenConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("scope", &self.scope)
            .field("storage_key", &self.storage_key)
            .finish()
    }
}
