//! Configuration management for the sankey service
//!
//! Configuration is read from a TOML file, every field has a default, and a
//! handful of environment variables override the file:
//!
//! | Variable | Field |
//! |---|---|
//! | `SANKEY_LISTEN_ADDR` | `server.listen_addr` |
//! | `SANKEY_LOG_LEVEL` | `server.log_level` |
//! | `SANKEY_CLICKHOUSE_URL` | `clickhouse.url` |
//! | `SANKEY_CLICKHOUSE_TABLE` | `clickhouse.table` |
//!
//! ```toml
//! [server]
//! listen_addr = "127.0.0.1:8080"
//!
//! [clickhouse]
//! url = "http://clickhouse:8123"
//! table = "flows"
//!
//! [sankey]
//! max_limit = 50
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ApplicationConfig {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Flow store settings
    #[serde(default)]
    pub clickhouse: ClickHouseConfig,

    /// Request limits
    #[serde(default)]
    pub sankey: SankeyConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Log level (error, warn, info, debug, trace), used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// CORS allowed origins (empty = any origin)
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
}

/// ClickHouse HTTP interface configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClickHouseConfig {
    /// Base URL of the HTTP interface
    #[serde(default = "default_clickhouse_url")]
    pub url: String,

    /// Database holding the flows table
    #[serde(default = "default_database")]
    pub database: String,

    /// User name
    #[serde(default = "default_username")]
    pub username: String,

    /// Password
    #[serde(default)]
    pub password: Option<String>,

    /// Table substituted for `{table}`
    #[serde(default = "default_table")]
    pub table: String,

    /// Per-query timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Limits applied to incoming sankey requests
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SankeyConfig {
    /// Largest accepted `limit`
    #[serde(default = "default_max_limit")]
    pub max_limit: u64,

    /// Largest accepted number of dimensions
    #[serde(default = "default_max_dimensions")]
    pub max_dimensions: usize,
}

// Default value functions
fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_clickhouse_url() -> String {
    "http://127.0.0.1:8123".to_string()
}
fn default_database() -> String {
    "default".to_string()
}
fn default_username() -> String {
    "default".to_string()
}
fn default_table() -> String {
    "flows".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_limit() -> u64 {
    50
}
fn default_max_dimensions() -> usize {
    10
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            log_level: default_log_level(),
            cors_allowed_origins: Vec::new(),
        }
    }
}

impl Default for ClickHouseConfig {
    fn default() -> Self {
        Self {
            url: default_clickhouse_url(),
            database: default_database(),
            username: default_username(),
            password: None,
            table: default_table(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for SankeyConfig {
    fn default() -> Self {
        Self {
            max_limit: default_max_limit(),
            max_dimensions: default_max_dimensions(),
        }
    }
}

impl ApplicationConfig {
    /// Parse configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| Error::Configuration(format!("failed to parse config: {}", e)))
    }

    /// Load configuration from a TOML file, apply env overrides and validate
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("failed to read {}: {}", path.display(), e))
        })?;
        let mut config = Self::from_toml(&contents)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Defaults with env overrides applied
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(addr) = std::env::var("SANKEY_LISTEN_ADDR") {
            self.server.listen_addr = addr;
        }
        if let Ok(level) = std::env::var("SANKEY_LOG_LEVEL") {
            self.server.log_level = level;
        }
        if let Ok(url) = std::env::var("SANKEY_CLICKHOUSE_URL") {
            self.clickhouse.url = url;
        }
        if let Ok(table) = std::env::var("SANKEY_CLICKHOUSE_TABLE") {
            self.clickhouse.table = table;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.listen_addr.trim().is_empty() {
            return Err(Error::Configuration("listen address cannot be empty".into()));
        }

        let url = self.clickhouse.url.as_str();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::Configuration(format!(
                "clickhouse url must use http or https, got '{}'",
                url
            )));
        }
        if self.clickhouse.table.trim().is_empty() {
            return Err(Error::Configuration("clickhouse table cannot be empty".into()));
        }
        if self.clickhouse.timeout_secs == 0 {
            return Err(Error::Configuration("clickhouse timeout must be > 0".into()));
        }

        if self.sankey.max_limit == 0 {
            return Err(Error::Configuration("sankey max_limit must be > 0".into()));
        }
        if self.sankey.max_dimensions < 2 {
            return Err(Error::Configuration(
                "sankey max_dimensions must be at least 2".into(),
            ));
        }

        Ok(())
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Serialization(format!("failed to serialize config: {}", e)))
    }
}
