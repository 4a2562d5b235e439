//! CLI configuration file.
//!
//! ```toml
//! [api]
//! base_url = "https://api.example.com/v1"
//! max_retries = 2
//!
//! [engine]
//! validation_timeout_ms = 15000
//! ```
//!
//! Both tables are optional. A missing `[api]` table falls back to the
//! embedded API settings.

use std::path::Path;

use canvass_client::ClientError;
use canvass_client::config::ApiConfig;
use canvass_draft::EngineConfig;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub api: ApiConfig,
    pub engine: EngineConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::embedded(),
            engine: EngineConfig::default(),
        }
    }
}

impl CliConfig {
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ClientError> {
        let config: Self = toml::de::from_str(toml_str).map_err(|e| ClientError::Config {
            message: e.to_string(),
        })?;
        Ok(Self {
            api: config.api.validated()?,
            ..config
        })
    }

    /// Loads `path` if given, else the defaults, then applies the
    /// `CANVASS_API_URL` / `CANVASS_API_TOKEN` overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ClientError> {
        let config = match path {
            Some(path) => {
                let contents =
                    std::fs::read_to_string(path).map_err(|e| ClientError::Config {
                        message: format!("{}: {e}", path.display()),
                    })?;
                Self::from_toml_str(&contents)?
            }
            None => Self::default(),
        };

        Ok(Self {
            api: config.api.with_env_overrides(),
            ..config
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = CliConfig::from_toml_str("").unwrap();
        assert_eq!(config, CliConfig::default());
    }

    #[test]
    fn tables_override_their_own_fields() {
        let config = CliConfig::from_toml_str(
            r#"
            [api]
            base_url = "https://api.example.com/v1/"
            token = "secret"

            [engine]
            validation_timeout_ms = 1500
            "#,
        )
        .unwrap();

        assert_eq!(config.api.base_url, "https://api.example.com/v1");
        assert_eq!(config.api.token.as_deref(), Some("secret"));
        assert_eq!(config.api.max_retries, 3);
        assert_eq!(config.engine.validation_timeout_ms, 1500);
        assert_eq!(
            config.engine.save_timeout_ms,
            EngineConfig::default().save_timeout_ms
        );
    }

    #[test]
    fn empty_base_url_is_rejected() {
        let result = CliConfig::from_toml_str("[api]\nbase_url = \"  \"\n");
        assert!(matches!(result, Err(ClientError::Config { .. })));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let result = CliConfig::load(Some(Path::new("/nonexistent/canvass.toml")));
        assert!(matches!(result, Err(ClientError::Config { message }) if message.contains("canvass.toml")));
    }
}
