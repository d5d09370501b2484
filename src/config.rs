//! # Client Configuration
//!
//! Endpoints and timeouts used by [`SheetsClient`](crate::client::SheetsClient)
//! and the OAuth flows. Defaults point at Google's production endpoints;
//! environment variables can redirect them (for example at a local fake
//! while testing).
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `SIMPLESHEET_API_BASE_URL` | `api_base_url` | [`DEFAULT_API_BASE_URL`] |
//! | `SIMPLESHEET_TOKEN_URL` | `token_url` | [`DEFAULT_TOKEN_URL`] |
//! | `SIMPLESHEET_REQUEST_TIMEOUT_SECS` | `request_timeout` | 30 |

use std::env;
use std::time::Duration;

use crate::error::{Error, Result};

// =============================================================================
// Configuration
// =============================================================================

/// Base URL of the spreadsheets collection.
pub const DEFAULT_API_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// OAuth2 token endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Default per-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Environment variable overriding [`ClientConfig::api_base_url`].
pub const API_BASE_URL_ENV: &str = "SIMPLESHEET_API_BASE_URL";

/// Environment variable overriding [`ClientConfig::token_url`].
pub const TOKEN_URL_ENV: &str = "SIMPLESHEET_TOKEN_URL";

/// Environment variable overriding [`ClientConfig::request_timeout`].
pub const REQUEST_TIMEOUT_ENV: &str = "SIMPLESHEET_REQUEST_TIMEOUT_SECS";

/// Endpoints and timeouts for remote calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the spreadsheets collection, without a trailing slash.
    pub api_base_url: String,

    /// OAuth2 token endpoint used by the authorization-code and refresh flows.
    pub token_url: String,

    /// Timeout applied by [`ReqwestTransport`](crate::transport::ReqwestTransport)
    /// to each request.
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Builds a configuration from defaults plus environment overrides.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup(API_BASE_URL_ENV) {
            config.api_base_url = url;
        }
        if let Some(url) = lookup(TOKEN_URL_ENV) {
            config.token_url = url;
        }
        if let Some(secs) = lookup(REQUEST_TIMEOUT_ENV) {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                Error::Config(format!("{REQUEST_TIMEOUT_ENV} must be a whole number of seconds, got '{secs}'"))
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }

        config.api_base_url = config.api_base_url.trim_end_matches('/').to_string();
        Ok(config)
    }

    /// Overrides the API base URL.
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            (API_BASE_URL_ENV, "http://localhost:8080/v4/spreadsheets/"),
            (REQUEST_TIMEOUT_ENV, "5"),
        ]
        .into_iter()
        .collect();
        let config = ClientConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.api_base_url, "http://localhost:8080/v4/spreadsheets");
        assert_eq!(config.token_url, DEFAULT_TOKEN_URL);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_bad_timeout() {
        let err = ClientConfig::from_lookup(|k| {
            (k == REQUEST_TIMEOUT_ENV).then(|| "soon".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
