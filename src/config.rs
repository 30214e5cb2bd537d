//! Configuration module for the log aggregator
//! Holds the HTTP server settings, upstream feed endpoints and result limits

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Absolute cap on per-source results, whatever the configuration says
pub const HARD_LIMIT_CEILING: usize = 1000;

/// Main configuration structure for the aggregator service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Upstream IDS feeds
    pub sources: SourcesConfig,
    /// Result-size limits
    pub limits: LimitsConfig,
    /// Deployment environment, controls error detail
    pub environment: AppEnvironment,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Whole-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Enable permissive CORS for the dashboard
    pub enable_cors: bool,
}

/// Endpoints of the three upstream feeds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub host_ids: SourceEndpoint,
    pub network_ids: SourceEndpoint,
    pub correlation: SourceEndpoint,
}

/// One upstream endpoint with its own time budget
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceEndpoint {
    pub url: String,
    pub timeout_secs: u64,
}

/// Limits applied to every aggregation request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Per-source limit when the client sends none
    pub default_limit: usize,
    /// Per-source ceiling
    pub max_limit: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppEnvironment {
    #[default]
    Production,
    Development,
}

impl AppEnvironment {
    pub fn is_development(&self) -> bool {
        matches!(self, AppEnvironment::Development)
    }
}

impl std::str::FromStr for AppEnvironment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(AppEnvironment::Production),
            "development" | "dev" => Ok(AppEnvironment::Development),
            other => Err(anyhow::anyhow!("Unknown environment: {}", other)),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            sources: SourcesConfig::default(),
            limits: LimitsConfig::default(),
            environment: AppEnvironment::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_secs: 30,
            enable_cors: true,
        }
    }
}

impl SourceEndpoint {
    fn local(url: &str, timeout: Duration) -> Self {
        Self {
            url: url.to_string(),
            timeout_secs: timeout.as_secs(),
        }
    }

    pub fn parsed_url(&self) -> Result<Url> {
        Url::parse(&self.url).with_context(|| format!("Invalid URL: {}", self.url))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            host_ids: SourceEndpoint::local(
                "http://127.0.0.1:8000/alerts.json",
                crate::sources::host_ids::DEFAULT_TIMEOUT,
            ),
            network_ids: SourceEndpoint::local(
                "http://127.0.0.1:8001/snort-logs",
                crate::sources::network_ids::DEFAULT_TIMEOUT,
            ),
            correlation: SourceEndpoint::local(
                "http://127.0.0.1:8002/correlation-logs",
                crate::sources::correlation::DEFAULT_TIMEOUT,
            ),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            default_limit: 100,
            max_limit: HARD_LIMIT_CEILING,
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables and defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// File if it exists, defaults otherwise; environment variables win either way
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file {} not found, using defaults", path.display());
            Config::default()
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Override with environment variables
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var("LOG_AGGREGATOR_HOST") {
            self.server.host = host;
        }

        if let Ok(port) = std::env::var("LOG_AGGREGATOR_PORT") {
            self.server.port = port.parse().context("Invalid LOG_AGGREGATOR_PORT")?;
        }

        if let Ok(url) = std::env::var("HOST_IDS_URL") {
            self.sources.host_ids.url = url;
        }

        if let Ok(url) = std::env::var("NETWORK_IDS_URL") {
            self.sources.network_ids.url = url;
        }

        if let Ok(url) = std::env::var("CORRELATION_URL") {
            self.sources.correlation.url = url;
        }

        if let Ok(env) = std::env::var("APP_ENV") {
            self.environment = env.parse().context("Invalid APP_ENV")?;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.server.request_timeout_secs == 0 {
            return Err(anyhow::anyhow!("Request timeout cannot be 0"));
        }

        for (name, endpoint) in self.sources.named() {
            let url = endpoint
                .parsed_url()
                .with_context(|| format!("{} URL is not valid", name))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(anyhow::anyhow!(
                    "{} URL must use http or https: {}",
                    name,
                    endpoint.url
                ));
            }
            if endpoint.timeout_secs == 0 {
                return Err(anyhow::anyhow!("{} timeout cannot be 0", name));
            }
        }

        if self.limits.max_limit == 0 || self.limits.max_limit > HARD_LIMIT_CEILING {
            return Err(anyhow::anyhow!(
                "max_limit must be between 1 and {}",
                HARD_LIMIT_CEILING
            ));
        }

        if self.limits.default_limit == 0 || self.limits.default_limit > self.limits.max_limit {
            return Err(anyhow::anyhow!(
                "default_limit must be between 1 and max_limit ({})",
                self.limits.max_limit
            ));
        }

        Ok(())
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}

impl SourcesConfig {
    fn named(&self) -> [(&'static str, &SourceEndpoint); 3] {
        [
            ("host_ids", &self.host_ids),
            ("network_ids", &self.network_ids),
            ("correlation", &self.correlation),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sources.host_ids.timeout(), Duration::from_secs(10));
        assert_eq!(config.sources.network_ids.timeout(), Duration::from_secs(5));
        assert_eq!(config.sources.correlation.timeout(), Duration::from_secs(5));
        assert_eq!(config.limits.default_limit, 100);
        assert_eq!(config.environment, AppEnvironment::Production);
    }

    #[test]
    fn test_config_loading_from_toml() {
        let config_content = r#"
environment = "development"

[server]
host = "127.0.0.1"
port = 9090

[sources.host_ids]
url = "http://10.0.0.2:8000/alerts.json"
timeout_secs = 3

[limits]
default_limit = 50
"#;

        let temp_file = std::env::temp_dir().join("siem_log_aggregator_test_config.toml");
        std::fs::write(&temp_file, config_content).unwrap();

        let config = Config::from_file(&temp_file).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.request_timeout_secs, 30);
        assert_eq!(config.sources.host_ids.url, "http://10.0.0.2:8000/alerts.json");
        assert_eq!(config.sources.host_ids.timeout_secs, 3);
        assert_eq!(config.sources.network_ids.timeout_secs, 5);
        assert_eq!(config.limits.default_limit, 50);
        assert_eq!(config.limits.max_limit, 1000);
        assert!(config.environment.is_development());

        let _ = std::fs::remove_file(&temp_file);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.limits.max_limit = 5000;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.limits.default_limit = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.sources.correlation.url = "ftp://example.com/logs".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.sources.host_ids.url = "not a url".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.sources.network_ids.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!("dev".parse::<AppEnvironment>().unwrap(), AppEnvironment::Development);
        assert_eq!("Production".parse::<AppEnvironment>().unwrap(), AppEnvironment::Production);
        assert!("staging".parse::<AppEnvironment>().is_err());
    }
}
