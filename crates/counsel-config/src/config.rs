//! Configuration management for the client.

use crate::{ConfigError, ConfigResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default API origin (can be overridden at compile time via COUNSEL_API_URL).
pub const DEFAULT_API_BASE_URL: &str = match option_env!("COUNSEL_API_URL") {
    Some(url) => url,
    None => "http://localhost:5000/api",
};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 15_000;

/// Default name of the server-issued session cookie.
pub const DEFAULT_SESSION_COOKIE_NAME: &str = "connect.sid";

/// Default name of the readable CSRF cookie.
pub const DEFAULT_CSRF_COOKIE_NAME: &str = "XSRF-TOKEN";

/// Paths under this prefix never go through refresh-and-retry.
pub const DEFAULT_AUTH_PATH_PREFIX: &str = "/auth/";

/// Window after a login during which startup re-validation is skipped.
pub const DEFAULT_LOGIN_GRACE_PERIOD_MS: u64 = 5_000;

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// API origin every request path is joined onto.
    pub api_base_url: String,
    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// Session cookie name (matched only, never parsed).
    pub session_cookie_name: String,
    /// CSRF cookie name.
    pub csrf_cookie_name: String,
    /// Path prefix of the authentication namespace.
    pub auth_path_prefix: String,
    /// Login grace period in milliseconds.
    pub login_grace_period_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            session_cookie_name: DEFAULT_SESSION_COOKIE_NAME.to_string(),
            csrf_cookie_name: DEFAULT_CSRF_COOKIE_NAME.to_string(),
            auth_path_prefix: DEFAULT_AUTH_PATH_PREFIX.to_string(),
            login_grace_period_ms: DEFAULT_LOGIN_GRACE_PERIOD_MS,
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file, falling back to defaults,
    /// then apply environment overrides.
    pub fn load(paths: &Paths) -> ConfigResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, paths: &Paths) -> ConfigResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    fn load_from_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply `COUNSEL_*` overrides using `lookup` to read variables.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("COUNSEL_API_URL") {
            self.api_base_url = url.trim().to_string();
        }
        if let Some(level) = get("COUNSEL_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(raw) = get("COUNSEL_REQUEST_TIMEOUT_MS") {
            match raw.trim().parse::<u64>() {
                Ok(ms) => self.request_timeout_ms = ms,
                Err(_) => tracing::warn!(value = %raw, "Ignoring invalid COUNSEL_REQUEST_TIMEOUT_MS"),
            }
        }
    }

    /// Check values that cannot be caught by deserialization.
    pub fn validate(&self) -> ConfigResult<()> {
        self.api_base_url()?;

        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Config(
                "request_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if !self.auth_path_prefix.starts_with('/') {
            return Err(ConfigError::Config(format!(
                "auth_path_prefix must start with '/': {}",
                self.auth_path_prefix
            )));
        }
        if self.session_cookie_name.is_empty() || self.csrf_cookie_name.is_empty() {
            return Err(ConfigError::Config(
                "cookie names must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Get the API base URL as a parsed URL.
    pub fn api_base_url(&self) -> ConfigResult<Url> {
        Url::parse(&self.api_base_url).map_err(ConfigError::from)
    }

    /// Per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Login grace period.
    pub fn login_grace_period(&self) -> Duration {
        Duration::from_millis(self.login_grace_period_ms)
    }
}
