//! Configuration loader
//!
//! Loads client settings from environment variables or files, then runs the
//! same validation as [`ClientSettings::validate`].
//!
//! ## Loading Strategy
//! 1. Read `.env` if present (existing variables win)
//! 2. Attempt to load from environment variables
//! 3. If `TOKENLINE_HOST` is not set, fall back to loading from file
//! 4. Probes multiple paths for config files
//! 5. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `TOKENLINE_HOST`: Server base URL (required)
//! - `TOKENLINE_LEGACY_VERSION`: API path prefix
//! - `TOKENLINE_BASIC_USERNAME`, `TOKENLINE_BASIC_PASSWORD`,
//!   `TOKENLINE_BASIC_PROVIDER`: static-credential mode
//! - `TOKENLINE_OAUTH_CLIENT_ID`, `TOKENLINE_OAUTH_CLIENT_SECRET`,
//!   `TOKENLINE_OAUTH_SCOPE`, `TOKENLINE_OAUTH_STORAGE_KEY`: refreshable-token
//!   mode
//! - `TOKENLINE_AUTO_LOGOUT_ON_401`: `true`/`false` (default `true`)
//! - `TOKENLINE_RAISE_ON_MISUSE`: `true`/`false` (default `false`)
//!
//! A mode block is considered present as soon as one of its variables is set,
//! so a half-configured block fails validation instead of being ignored.
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./tokenline.json` or `./tokenline.toml` (current working directory)
//! 2. `../tokenline.json` or `../tokenline.toml` (parent directory)
//! 3. `../../tokenline.json` or `../../tokenline.toml` (grandparent directory)
//! 4. Relative to executable location

use std::path::{Path, PathBuf};

use tokenline_domain::constants::ENV_PREFIX;
use tokenline_domain::{
    BasicSettings, ClientConfig, ClientOptions, ClientSettings, OAuthSettings,
};

use crate::errors::{InfraError, InfraResult};

const CONFIG_STEM: &str = "tokenline";

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns the environment error when `TOKENLINE_HOST` is set but the rest is
/// invalid, otherwise whatever [`load_from_file`] returns.
pub fn load() -> InfraResult<ClientConfig> {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "Ignoring unreadable .env file"),
    }

    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(InfraError::MissingEnv(name)) => {
            tracing::debug!(variable = %name, "Environment incomplete, trying file");
            load_from_file(None)
        }
        Err(e) => Err(e),
    }
}

/// Load configuration from `TOKENLINE_*` environment variables
///
/// # Errors
/// `MissingEnv` without `TOKENLINE_HOST`, `InvalidEnv` for unparsable
/// booleans, `Config` when validation fails.
pub fn load_from_env() -> InfraResult<ClientConfig> {
    let settings = settings_from_vars(|name| std::env::var(name).ok())?;
    Ok(settings.validate()?)
}

/// Build raw settings from a variable lookup
///
/// # Errors
/// See [`load_from_env`]; no validation is run here.
pub fn settings_from_vars<F>(lookup: F) -> InfraResult<ClientSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |suffix: &str| lookup(&format!("{ENV_PREFIX}{suffix}"));

    let host = var("HOST").ok_or_else(|| InfraError::MissingEnv(format!("{ENV_PREFIX}HOST")))?;

    let basic_vars = [var("BASIC_USERNAME"), var("BASIC_PASSWORD"), var("BASIC_PROVIDER")];
    let basic = if basic_vars.iter().any(Option::is_some) {
        let [username, password, provider] = basic_vars;
        Some(BasicSettings {
            username: username.unwrap_or_default(),
            password: password.unwrap_or_default(),
            provider: provider.unwrap_or_default(),
        })
    } else {
        None
    };

    let oauth_vars = [var("OAUTH_CLIENT_ID"), var("OAUTH_CLIENT_SECRET"), var("OAUTH_SCOPE")];
    let storage_key = var("OAUTH_STORAGE_KEY");
    let oauth = if oauth_vars.iter().any(Option::is_some) || storage_key.is_some() {
        let [client_id, client_secret, scope] = oauth_vars;
        Some(OAuthSettings {
            client_id: client_id.unwrap_or_default(),
            client_secret: client_secret.unwrap_or_default(),
            scope: scope.unwrap_or_default(),
            storage_key,
        })
    } else {
        None
    };

    let defaults = ClientOptions::default();
    let options = ClientOptions {
        auto_logout_on_401: env_bool(&lookup, "AUTO_LOGOUT_ON_401", defaults.auto_logout_on_401)?,
    };

    Ok(ClientSettings {
        host,
        legacy_version: var("LEGACY_VERSION"),
        basic,
        oauth,
        options,
        raise_on_misuse: env_bool(&lookup, "RAISE_ON_MISUSE", false)?,
    })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes [`probe_config_paths`]. Format is detected by
/// file extension.
///
/// # Errors
/// Returns `InfraError` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - Validation fails
pub fn load_from_file(path: Option<PathBuf>) -> InfraResult<ClientConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(InfraError::ConfigNotFound(p));
            }
            p
        }
        None => probe_config_paths().ok_or(InfraError::NoConfigFile)?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|source| InfraError::ConfigRead { path: config_path.clone(), source })?;

    Ok(parse_settings(&contents, &config_path)?.validate()?)
}

/// Parse raw settings from file content, format chosen by `path`'s extension
///
/// # Errors
/// `ConfigFormat` on syntax errors, `UnsupportedFormat` for other extensions.
pub fn parse_settings(contents: &str, path: &Path) -> InfraResult<ClientSettings> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| InfraError::ConfigFormat { format: "TOML", message: e.to_string() }),
        "json" => serde_json::from_str(contents)
            .map_err(|e| InfraError::ConfigFormat { format: "JSON", message: e.to_string() }),
        other => Err(InfraError::UnsupportedFormat(other.to_string())),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        for dir in [cwd.clone(), cwd.join(".."), cwd.join("../..")] {
            candidates.extend(candidates_in(&dir));
        }
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(candidates_in(exe_dir));
        }
    }

    candidates.into_iter().find(|path| path.is_file())
}

fn candidates_in(dir: &Path) -> [PathBuf; 2] {
    [dir.join(format!("{CONFIG_STEM}.json")), dir.join(format!("{CONFIG_STEM}.toml"))]
}

fn env_bool<F>(lookup: &F, suffix: &str, default: bool) -> InfraResult<bool>
where
    F: Fn(&str) -> Option<String>,
{
    let name = format!("{ENV_PREFIX}{suffix}");
    match lookup(&name) {
        None => Ok(default),
        Some(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(InfraError::InvalidEnv { name, value }),
        },
    }
}
