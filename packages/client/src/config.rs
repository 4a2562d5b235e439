//! Territory API connection settings.
//!
//! A default configuration is embedded at compile time from
//! `services/territory_api.toml`. Callers may parse their own TOML instead,
//! and `CANVASS_API_URL` / `CANVASS_API_TOKEN` override whatever was loaded.

use serde::Deserialize;

use crate::ClientError;

const EMBEDDED_CONFIG: &str = include_str!("../services/territory_api.toml");

/// Connection settings for [`crate::http::HttpTerritoryApi`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiConfig {
    /// API root, without a trailing slash (e.g. `"https://api.example.com/v1"`).
    pub base_url: String,
    /// Bearer token sent with every request.
    #[serde(default)]
    pub token: Option<String>,
    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Retries for overlap checks on transient failures. Building
    /// detection and create/update are never retried.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

const fn default_request_timeout_secs() -> u64 {
    30
}

const fn default_max_retries() -> u32 {
    3
}

impl ApiConfig {
    /// Returns the embedded default configuration.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML is malformed (a build-time guarantee
    /// since the file ships with the crate).
    #[must_use]
    pub fn embedded() -> Self {
        Self::from_toml_str(EMBEDDED_CONFIG)
            .unwrap_or_else(|e| panic!("Failed to parse embedded territory API config: {e}"))
    }

    /// Parses a configuration from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] if the TOML is malformed or the
    /// base URL is empty.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ClientError> {
        let config: Self = toml::de::from_str(toml_str).map_err(|e| ClientError::Config {
            message: e.to_string(),
        })?;
        config.validated()
    }

    /// Applies the `CANVASS_API_URL` / `CANVASS_API_TOKEN` environment
    /// overrides.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(
            std::env::var("CANVASS_API_URL").ok(),
            std::env::var("CANVASS_API_TOKEN").ok(),
        )
    }

    /// Replaces the base URL and token when overrides are present.
    #[must_use]
    pub fn with_overrides(mut self, base_url: Option<String>, token: Option<String>) -> Self {
        if let Some(url) = base_url.filter(|u| !u.trim().is_empty()) {
            log::debug!("Overriding territory API base URL with {url}");
            self.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            self.token = Some(token);
        }
        self
    }

    /// Checks the base URL and strips its trailing slash.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] if the base URL is empty.
    pub fn validated(mut self) -> Result<Self, ClientError> {
        if self.base_url.trim().is_empty() {
            return Err(ClientError::Config {
                message: "base_url must not be empty".to_string(),
            });
        }
        self.base_url = self.base_url.trim_end_matches('/').to_string();
        Ok(self)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::embedded()
    }
}
