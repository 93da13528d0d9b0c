//! Reqwest transport configuration.

use std::time::Duration;

use eazy_upload::{Error, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Default timeout for upload requests: 30 seconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Default base URL upload paths are resolved against.
pub const DEFAULT_BASE_URL: &str = "http://localhost/";

/// Configuration for the reqwest upload transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReqwestConfig {
    /// Base URL every upload path is resolved against.
    #[serde(default = "default_base_url")]
    pub base_url: Url,

    /// Request timeout in milliseconds, covering the whole exchange.
    #[serde(default = "default_timeout_ms")]
    pub http_timeout_ms: u64,

    /// User-Agent header to send with requests.
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_base_url() -> Url {
    Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid")
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl Default for ReqwestConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            http_timeout_ms: default_timeout_ms(),
            user_agent: None,
        }
    }
}

impl ReqwestConfig {
    /// Creates a configuration for the given base URL.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the URL cannot be parsed or cannot
    /// serve as a base.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let base_url = Url::parse(base_url.as_ref()).map_err(|e| {
            Error::configuration(format!("Invalid base URL '{}': {}", base_url.as_ref(), e))
        })?;

        if base_url.cannot_be_a_base() {
            return Err(Error::configuration(format!(
                "Base URL '{base_url}' cannot be used as a base"
            )));
        }

        Ok(Self {
            base_url,
            ..Self::default()
        })
    }

    /// Returns the timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    /// Returns the effective timeout, using default if zero.
    pub fn effective_timeout(&self) -> Duration {
        if self.http_timeout_ms == 0 {
            Duration::from_millis(DEFAULT_TIMEOUT_MS)
        } else {
            self.timeout()
        }
    }

    /// Returns the effective user agent, using default if not set.
    pub fn effective_user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(Self::default_user_agent)
    }

    /// Returns the default user agent string.
    fn default_user_agent() -> String {
        format!("eazy-upload/{}", env!("CARGO_PKG_VERSION"))
    }

    /// Set the timeout in milliseconds.
    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.http_timeout_ms = timeout_ms;
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Resolves an upload path against the base URL.
    ///
    /// Absolute URLs are used as given.
    ///
    /// # Errors
    ///
    /// Returns an invalid input error if the path cannot be joined.
    pub fn resolve(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::invalid_input(format!("Invalid upload URL '{path}': {e}")))
    }
}
