//! Client configuration with TOML file support, environment variable
//! overrides, and sensible defaults.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Client configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Base URL of the Prometheus API endpoint
    pub api_url: String,

    /// Extra headers attached to every request (e.g. authorization)
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Directory for the range-query cache; caching is off when unset
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Evaluation timeout in seconds, forwarded to the engine per request
    #[serde(default)]
    pub timeout: Option<f64>,
}

impl ClientConfig {
    /// Build a config with only the API URL set
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            headers: HashMap::new(),
            cache_dir: None,
            timeout: None,
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Failed to read config file {}: {}", path, e))
        })?;

        toml::from_str(&contents).map_err(|e| {
            Error::Configuration(format!("Failed to parse config file {}: {}", path, e))
        })
    }

    /// Load configuration with environment variable overrides
    pub fn from_file_with_env(path: &str) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("PROMGRID_API_URL") {
            self.api_url = url;
        }
        if let Ok(dir) = std::env::var("PROMGRID_CACHE_DIR") {
            self.cache_dir = Some(PathBuf::from(dir));
        }
        if let Ok(timeout) = std::env::var("PROMGRID_TIMEOUT_SECS") {
            if let Ok(t) = timeout.parse() {
                self.timeout = Some(t);
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_url.is_empty() {
            return Err(Error::Configuration("api_url cannot be empty".to_string()));
        }
        url::Url::parse(&self.api_url)
            .map_err(|e| Error::Configuration(format!("Invalid api_url: {}", e)))?;

        if let Some(t) = self.timeout {
            if t <= 0.0 {
                return Err(Error::Configuration(
                    "timeout must be positive".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config() {
        let config = ClientConfig::new("http://localhost:9090/");
        assert!(config.headers.is_empty());
        assert!(config.cache_dir.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_toml() {
        let config: ClientConfig = toml::from_str(
            r#"
            api_url = "http://prom.internal:9090/"
            cache_dir = "/var/cache/promgrid"
            timeout = 30.0

            [headers]
            Authorization = "Bearer token"
            "#,
        )
        .unwrap();

        assert_eq!(config.api_url, "http://prom.internal:9090/");
        assert_eq!(config.cache_dir, Some(PathBuf::from("/var/cache/promgrid")));
        assert_eq!(config.timeout, Some(30.0));
        assert_eq!(config.headers["Authorization"], "Bearer token");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ClientConfig::new("not a url");
        assert!(config.validate().is_err());

        config.api_url = "http://localhost:9090/".to_string();
        config.timeout = Some(-1.0);
        assert!(config.validate().is_err());
    }
}
