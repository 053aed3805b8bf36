//! Client configuration parsed from environment variables.
//!
//! Nothing here is hardcoded into the pipeline: the binary loads `.env` via
//! `dotenvy` and then calls [`ClientConfig::from_env`]; tests build configs
//! directly.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_UPLOADS_BASE_URL: &str = "http://localhost:5000/uploads";
pub const DEFAULT_IDENTITY_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";
pub const DEFAULT_TOKEN_BASE_URL: &str = "https://securetoken.googleapis.com/v1";
pub const DEFAULT_COUNTRY_CODE: &str = "+234";
pub const DEFAULT_NOTIFICATION_POLL_INTERVAL_MS: u64 = 30_000;
pub const DEFAULT_APPROVAL_POLL_INTERVAL_MS: u64 = 15_000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SESSION_FILE: &str = ".matchbook-session.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL in {var}: {value}")]
    InvalidUrl { var: &'static str, value: String },
    #[error("invalid country code in {var}: {value}")]
    InvalidCountryCode { var: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl HttpTimeouts {
    #[must_use]
    pub fn request(self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    #[must_use]
    pub fn connect(self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

/// Identity provider endpoints and key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityConfig {
    pub api_key: Option<String>,
    pub identity_base_url: String,
    pub token_base_url: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            identity_base_url: DEFAULT_IDENTITY_BASE_URL.to_owned(),
            token_base_url: DEFAULT_TOKEN_BASE_URL.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend REST root, without trailing slash.
    pub api_base_url: String,
    /// Root for uploaded media links.
    pub uploads_base_url: String,
    pub notification_poll_interval: Duration,
    pub approval_poll_interval: Duration,
    /// E.164 prefix applied to local numbers, e.g. `+234`.
    pub default_country_code: String,
    pub timeouts: HttpTimeouts,
    pub identity: IdentityConfig,
    /// Durable session marker location.
    pub session_file: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_owned(),
            uploads_base_url: DEFAULT_UPLOADS_BASE_URL.to_owned(),
            notification_poll_interval: Duration::from_millis(DEFAULT_NOTIFICATION_POLL_INTERVAL_MS),
            approval_poll_interval: Duration::from_millis(DEFAULT_APPROVAL_POLL_INTERVAL_MS),
            default_country_code: DEFAULT_COUNTRY_CODE.to_owned(),
            timeouts: HttpTimeouts::default(),
            identity: IdentityConfig::default(),
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
        }
    }
}

impl ClientConfig {
    /// Build typed config from environment variables.
    ///
    /// All optional:
    /// - `MATCHBOOK_API_BASE_URL`: default `http://localhost:5000/api`
    /// - `MATCHBOOK_UPLOADS_BASE_URL`: default `http://localhost:5000/uploads`
    /// - `MATCHBOOK_NOTIFICATION_POLL_INTERVAL_MS`: default 30000
    /// - `MATCHBOOK_APPROVAL_POLL_INTERVAL_MS`: default 15000
    /// - `MATCHBOOK_DEFAULT_COUNTRY_CODE`: default `+234`
    /// - `MATCHBOOK_REQUEST_TIMEOUT_SECS` / `MATCHBOOK_CONNECT_TIMEOUT_SECS`
    /// - `MATCHBOOK_IDENTITY_API_KEY`, `MATCHBOOK_IDENTITY_BASE_URL`, `MATCHBOOK_TOKEN_BASE_URL`
    /// - `MATCHBOOK_SESSION_FILE`: default `.matchbook-session.json`
    ///
    /// # Errors
    ///
    /// Returns an error if a URL is not http(s) or the country code is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_base_url = env_url("MATCHBOOK_API_BASE_URL", DEFAULT_API_BASE_URL)?;
        let uploads_base_url = env_url("MATCHBOOK_UPLOADS_BASE_URL", DEFAULT_UPLOADS_BASE_URL)?;
        let identity_base_url = env_url("MATCHBOOK_IDENTITY_BASE_URL", DEFAULT_IDENTITY_BASE_URL)?;
        let token_base_url = env_url("MATCHBOOK_TOKEN_BASE_URL", DEFAULT_TOKEN_BASE_URL)?;

        let default_country_code =
            std::env::var("MATCHBOOK_DEFAULT_COUNTRY_CODE").unwrap_or_else(|_| DEFAULT_COUNTRY_CODE.to_owned());
        if !valid_country_code(&default_country_code) {
            return Err(ConfigError::InvalidCountryCode {
                var: "MATCHBOOK_DEFAULT_COUNTRY_CODE",
                value: default_country_code,
            });
        }

        let api_key = std::env::var("MATCHBOOK_IDENTITY_API_KEY")
            .ok()
            .filter(|v| !v.trim().is_empty());

        Ok(Self {
            api_base_url,
            uploads_base_url,
            notification_poll_interval: Duration::from_millis(nonzero(
                env_parse("MATCHBOOK_NOTIFICATION_POLL_INTERVAL_MS", DEFAULT_NOTIFICATION_POLL_INTERVAL_MS),
                DEFAULT_NOTIFICATION_POLL_INTERVAL_MS,
            )),
            approval_poll_interval: Duration::from_millis(nonzero(
                env_parse("MATCHBOOK_APPROVAL_POLL_INTERVAL_MS", DEFAULT_APPROVAL_POLL_INTERVAL_MS),
                DEFAULT_APPROVAL_POLL_INTERVAL_MS,
            )),
            default_country_code,
            timeouts: HttpTimeouts {
                request_secs: env_parse("MATCHBOOK_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
                connect_secs: env_parse("MATCHBOOK_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
            },
            identity: IdentityConfig { api_key, identity_base_url, token_base_url },
            session_file: std::env::var("MATCHBOOK_SESSION_FILE")
                .map_or_else(|_| PathBuf::from(DEFAULT_SESSION_FILE), PathBuf::from),
        })
    }

    /// Absolute link for an uploaded asset path as stored by the backend.
    #[must_use]
    pub fn upload_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_owned();
        }
        format!("{}/{}", self.uploads_base_url, path.trim_start_matches('/'))
    }
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn nonzero(value: u64, default: u64) -> u64 {
    if value == 0 { default } else { value }
}

fn env_url(var: &'static str, default: &str) -> Result<String, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_owned());
    normalize_base_url(&raw).ok_or(ConfigError::InvalidUrl { var, value: raw })
}

/// Trim whitespace and trailing slashes; reject anything that is not http(s).
pub(crate) fn normalize_base_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let rest = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))?;
    if rest.is_empty() {
        return None;
    }
    Some(trimmed.to_owned())
}

fn valid_country_code(code: &str) -> bool {
    let Some(digits) = code.strip_prefix('+') else {
        return false;
    };
    (1..=3).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
