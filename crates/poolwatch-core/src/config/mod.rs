//! Application configuration with layered loading.
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded in this order (later overrides earlier):
//!
//! 1. **Compiled defaults**: Hardcoded in struct `Default` implementations
//! 2. **Config file**: TOML or YAML file named by the `POOLWATCH_CONFIG` env var
//! 3. **Environment variables**: `POOLWATCH__*` env vars override specific fields
//!
//! # Configuration Sections
//!
//! - [`ServerConfig`]: HTTP listener settings
//! - [`AnchorsConfig`]: Chain-node endpoints and settle delay
//! - [`ExplorerConfig`]: Chain explorer used for tipset lookups
//! - [`WinConfig`]: Classifier timing, retry policy and history size
//! - [`MetricsConfig`]: Prometheus metrics endpoint
//! - [`LoggingConfig`]: Log level and format
//!
//! # Example
//!
//! ```toml
//! [server]
//! bind_port = 8090
//!
//! [anchors]
//! settle_delay_seconds = 2
//!
//! [[anchors.endpoints]]
//! url = "http://10.0.0.5:1234/rpc/v0"
//! timeout_seconds = 3
//! user = "lotus"
//! password = "secret"
//! ```

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// IP address to bind to. Defaults to `127.0.0.1`.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port to listen on. Must be greater than 0. Defaults to `8090`.
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,

    /// Maximum number of in-flight HTTP requests. Defaults to `256`.
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_bind_port() -> u16 {
    8090
}

fn default_max_concurrent_requests() -> usize {
    256
}

/// A chain node queried for the current head.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnchorEndpointConfig {
    /// Optional label for logs. Defaults to the URL.
    #[serde(default)]
    pub name: Option<String>,

    /// JSON-RPC URL. Must start with `http` or `https`.
    pub url: String,

    /// Per-query timeout in seconds. Defaults to `5`.
    #[serde(default = "default_endpoint_timeout_seconds", alias = "timeout")]
    pub timeout_seconds: u64,

    /// Basic-auth user. Empty or absent disables auth.
    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

fn default_endpoint_timeout_seconds() -> u64 {
    5
}

/// Anchor resolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorsConfig {
    /// Pause before each refresh so chain propagation can settle. Defaults to `0`.
    #[serde(default, alias = "hardcore_delay")]
    pub settle_delay_seconds: u64,

    /// Chain nodes to query. Cannot be empty.
    #[serde(default)]
    pub endpoints: Vec<AnchorEndpointConfig>,
}

/// Chain explorer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplorerConfig {
    /// Base URL; lookups go to `{base_url}/tipset/{height}`.
    #[serde(default = "default_explorer_base_url")]
    pub base_url: String,

    /// Per-lookup timeout in seconds. Defaults to `3`.
    #[serde(default = "default_explorer_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_explorer_base_url() -> String {
    "https://api.filscout.com/api/v1".to_string()
}

fn default_explorer_timeout_seconds() -> u64 {
    3
}

/// Win classification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WinConfig {
    /// Seconds between classifier ticks. Defaults to `60`.
    #[serde(default = "default_tick_interval_seconds")]
    pub tick_interval_seconds: u64,

    /// Minimum report age before classification. Defaults to `300`.
    #[serde(default = "default_cutoff_seconds")]
    pub cutoff_seconds: u64,

    /// Win and orphan history capacity. Defaults to `1024`.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// `took` at or above this marks an orphan as a timeout. Defaults to `25`.
    #[serde(default = "default_timeout_threshold_seconds")]
    pub timeout_threshold_seconds: u64,

    /// Failed lookups tolerated before a report is dropped. Defaults to `10`.
    #[serde(default = "default_max_lookup_attempts")]
    pub max_lookup_attempts: u32,

    /// Reports older than this are dropped instead of retried. Defaults to `3600`.
    #[serde(default = "default_max_retry_age_seconds")]
    pub max_retry_age_seconds: u64,
}

fn default_tick_interval_seconds() -> u64 {
    60
}

fn default_cutoff_seconds() -> u64 {
    300
}

fn default_history_capacity() -> usize {
    1024
}

fn default_timeout_threshold_seconds() -> u64 {
    25
}

fn default_max_lookup_attempts() -> u32 {
    10
}

fn default_max_retry_age_seconds() -> u64 {
    3600
}

/// Prometheus metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Whether `/metrics` is served. Defaults to `true`.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

/// Application logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "trace", "debug", "info", "warn", "error"). Defaults to `"info"`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: `"json"` or `"pretty"`. Defaults to `"pretty"`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

/// Root application configuration.
///
/// Environment overrides use the `POOLWATCH` prefix with `__` as a separator
/// (e.g. `POOLWATCH__SERVER__BIND_PORT=9000`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub anchors: AnchorsConfig,

    #[serde(default)]
    pub explorer: ExplorerConfig,

    #[serde(default)]
    pub win: WinConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            bind_port: default_bind_port(),
            max_concurrent_requests: default_max_concurrent_requests(),
        }
    }
}

impl Default for AnchorsConfig {
    fn default() -> Self {
        Self {
            settle_delay_seconds: 0,
            endpoints: vec![AnchorEndpointConfig {
                name: Some("local-lotus".to_string()),
                url: "http://127.0.0.1:1234/rpc/v0".to_string(),
                timeout_seconds: default_endpoint_timeout_seconds(),
                user: None,
                password: None,
            }],
        }
    }
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            base_url: default_explorer_base_url(),
            timeout_seconds: default_explorer_timeout_seconds(),
        }
    }
}

impl Default for WinConfig {
    fn default() -> Self {
        Self {
            tick_interval_seconds: default_tick_interval_seconds(),
            cutoff_seconds: default_cutoff_seconds(),
            history_capacity: default_history_capacity(),
            timeout_threshold_seconds: default_timeout_threshold_seconds(),
            max_lookup_attempts: default_max_lookup_attempts(),
            max_retry_age_seconds: default_max_retry_age_seconds(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), format: default_log_format() }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML or YAML file with environment overrides.
    ///
    /// A missing file is not an error; defaults and environment still apply.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be parsed or deserialized.
    pub fn from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        let config_builder = Config::builder()
            .add_source(File::with_name(&config_path.as_ref().to_string_lossy()).required(false))
            .add_source(Environment::with_prefix("POOLWATCH").separator("__"))
            .build()?;

        config_builder.try_deserialize()
    }

    /// Loads configuration from `config/config.toml`, or the path in `POOLWATCH_CONFIG`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration cannot be loaded or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("POOLWATCH_CONFIG").unwrap_or_else(|_| "config/config.toml".to_string());
        Self::from_file(&config_path)
    }

    /// Returns the parsed socket address for the HTTP server.
    ///
    /// # Errors
    ///
    /// Returns an error string if the address cannot be parsed.
    pub fn socket_addr(&self) -> Result<std::net::SocketAddr, String> {
        format!("{}:{}", self.server.bind_address, self.server.bind_port)
            .parse()
            .map_err(|_| {
                format!(
                    "Invalid socket address: {}:{}",
                    self.server.bind_address, self.server.bind_port
                )
            })
    }

    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.anchors.settle_delay_seconds)
    }

    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.win.tick_interval_seconds)
    }

    /// Validates the configuration for correctness and consistency.
    ///
    /// # Errors
    ///
    /// Returns a descriptive error string if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.anchors.endpoints.is_empty() {
            return Err("No anchor endpoints configured".to_string());
        }

        for endpoint in &self.anchors.endpoints {
            if !endpoint.url.starts_with("http") {
                return Err(format!("Invalid anchor URL: {}", endpoint.url));
            }
            if endpoint.timeout_seconds == 0 {
                return Err(format!("Anchor timeout must be greater than 0: {}", endpoint.url));
            }
        }

        if !self.explorer.base_url.starts_with("http") {
            return Err(format!("Invalid explorer URL: {}", self.explorer.base_url));
        }

        if self.explorer.timeout_seconds == 0 {
            return Err("Explorer timeout must be greater than 0".to_string());
        }

        if self.win.tick_interval_seconds == 0 {
            return Err("Win tick interval must be greater than 0".to_string());
        }

        if self.win.cutoff_seconds == 0 {
            return Err("Win cutoff must be greater than 0".to_string());
        }

        if self.win.history_capacity < 2 {
            return Err("History capacity must be at least 2".to_string());
        }

        if self.win.max_lookup_attempts == 0 {
            return Err("Max lookup attempts must be greater than 0".to_string());
        }

        if self.win.max_retry_age_seconds <= self.win.cutoff_seconds {
            return Err(format!(
                "Max retry age ({}s) must exceed the win cutoff ({}s)",
                self.win.max_retry_age_seconds, self.win.cutoff_seconds
            ));
        }

        if self.server.bind_port == 0 {
            return Err("Bind port must be greater than 0".to_string());
        }

        if self.server.max_concurrent_requests == 0 {
            return Err("Max concurrent requests must be greater than 0".to_string());
        }

        if !["json", "pretty"].contains(&self.logging.format.as_str()) {
            return Err("Logging format must be 'json' or 'pretty'".to_string());
        }

        Ok(())
    }
}
