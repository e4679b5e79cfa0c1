//! Client configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{AgentBayError, Result};

/// Environment variable holding the API key.
pub const ENV_API_KEY: &str = "AGENTBAY_API_KEY";
/// Environment variable overriding the service endpoint.
pub const ENV_ENDPOINT: &str = "AGENTBAY_ENDPOINT";
/// Environment variable overriding the request timeout in milliseconds.
pub const ENV_TIMEOUT_MS: &str = "AGENTBAY_TIMEOUT_MS";

/// Default service endpoint.
pub const DEFAULT_ENDPOINT: &str = "wuyingai.cn-shanghai.aliyuncs.com";
/// Default request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

/// Client configuration.
///
/// Explicit values win over environment variables, which win over defaults.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// API key sent as a bearer token.
    pub api_key: String,
    /// Service endpoint, with or without scheme.
    pub endpoint: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &crate::sanitize::REDACTED)
            .field("endpoint", &self.endpoint)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

impl Config {
    /// Create a configuration with an explicit API key and default endpoint.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    /// Resolve configuration from the process environment.
    ///
    /// # Errors
    /// Returns error if no API key is set or the timeout is not a number.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration, preferring `api_key` over the environment.
    ///
    /// # Errors
    /// Returns error if no API key is available or the timeout is not a number.
    pub fn resolve(api_key: Option<String>) -> Result<Self> {
        let mut config = Self::from_lookup(|key| {
            if key == ENV_API_KEY {
                api_key.clone().or_else(|| std::env::var(key).ok())
            } else {
                std::env::var(key).ok()
            }
        })?;
        config.api_key = config.api_key.trim().to_string();
        Ok(config)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup(ENV_API_KEY)
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                AgentBayError::Config(format!(
                    "API key is required; pass it explicitly or set {ENV_API_KEY}"
                ))
            })?;

        let endpoint = lookup(ENV_ENDPOINT)
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        let timeout_ms = match lookup(ENV_TIMEOUT_MS) {
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| {
                AgentBayError::Config(format!("{ENV_TIMEOUT_MS} must be milliseconds: {e}"))
            })?,
            None => DEFAULT_TIMEOUT_MS,
        };

        Ok(Self {
            api_key,
            endpoint,
            timeout_ms,
        })
    }

    /// Override the endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Override the request timeout.
    #[must_use]
    pub const fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Request timeout as a `Duration`.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Endpoint as a base URL, `https://` added when no scheme is given.
    #[must_use]
    pub fn base_url(&self) -> String {
        let endpoint = self.endpoint.trim().trim_end_matches('/');
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            format!("https://{endpoint}")
        }
    }

    /// Check that the configuration is usable.
    ///
    /// # Errors
    /// Returns error if the API key or endpoint is empty, or the timeout is zero.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(AgentBayError::Config("API key is empty".to_string()));
        }
        if self.endpoint.trim().is_empty() {
            return Err(AgentBayError::Config("endpoint is empty".to_string()));
        }
        if self.timeout_ms == 0 {
            return Err(AgentBayError::Config("timeout must be positive".to_string()));
        }
        Ok(())
    }
}
