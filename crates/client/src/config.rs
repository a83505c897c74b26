//! Client configuration.
//!
//! Values come from the environment, falling back to defaults:
//!
//! - `OCTOOPS_API_URL`: backend base URL, including the `/api` prefix
//! - `OCTOOPS_TOKEN_PATH`: file that persists the session token
//! - `OCTOOPS_REQUEST_TIMEOUT_SECS`: per-request timeout in seconds

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("cannot determine a data directory for the token file; set OCTOOPS_TOKEN_PATH")]
    NoDataDir,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL without trailing slash.
    pub api_url: String,
    pub token_path: PathBuf,
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(api_url: impl Into<String>, token_path: impl Into<PathBuf>) -> Self {
        Self {
            api_url: normalize_url(api_url.into()),
            token_path: token_path.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup (tests, layered sources).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("OCTOOPS_API_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                key: "OCTOOPS_API_URL",
                reason: format!("'{api_url}' is not an http(s) URL"),
            });
        }

        let token_path = match lookup("OCTOOPS_TOKEN_PATH").filter(|v| !v.trim().is_empty()) {
            Some(path) => PathBuf::from(path),
            None => default_token_path()?,
        };

        let request_timeout = match lookup("OCTOOPS_REQUEST_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|e| ConfigError::Invalid {
                    key: "OCTOOPS_REQUEST_TIMEOUT_SECS",
                    reason: format!("{e}"),
                })?;
                if secs == 0 {
                    return Err(ConfigError::Invalid {
                        key: "OCTOOPS_REQUEST_TIMEOUT_SECS",
                        reason: "must be greater than zero".to_string(),
                    });
                }
                Duration::from_secs(secs)
            }
            None => DEFAULT_REQUEST_TIMEOUT,
        };

        Ok(Self::new(api_url, token_path).with_request_timeout(request_timeout))
    }
}

/// `<data_dir>/octoops/token`.
pub fn default_token_path() -> Result<PathBuf, ConfigError> {
    let base = dirs::data_dir().ok_or(ConfigError::NoDataDir)?;
    Ok(base.join("octoops").join("token"))
}

fn normalize_url(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}
