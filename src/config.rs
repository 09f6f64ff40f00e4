//! Application configuration
//!
//! Loaded from YAML, then overridden from the environment (after `.env`).
//! Every field has a default, so an almost empty file is valid.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config file: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid environment variable {name}: {reason}")]
    InvalidEnvVar { name: String, reason: String },

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

pub const ENV_API_URL: &str = "PANEL_API_URL";
pub const ENV_WS_URL: &str = "PANEL_WS_URL";
pub const ENV_DEBUG: &str = "PANEL_DEBUG";

/// Top-level dashboard transport configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_base_url: String,
    pub ws_url: String,
    /// Forces `debug` logging
    pub debug: bool,
    pub log_level: String,
    pub http: HttpSettings,
    pub socket: SocketSettings,
    pub log_shipping: LogShippingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub timeout_ms: u64,
    pub retries: u32,
    pub retry_delay_ms: u64,
    /// File holding the persisted bearer token
    pub token_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocketSettings {
    pub heartbeat_interval_ms: u64,
    pub heartbeat_timeout_ms: Option<u64>,
    pub connection_timeout_ms: u64,
    pub reconnect_interval_ms: u64,
    pub reconnect_decay: f64,
    pub max_reconnect_interval_ms: u64,
    pub max_reconnect_attempts: u32,
    pub auto_reconnect: bool,
    pub queue_messages: bool,
    pub max_queue_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogShippingSettings {
    pub enabled: bool,
    /// Endpoint relative to `api_base_url`
    pub endpoint: String,
    pub batch_size: usize,
    pub flush_interval_ms: u64,
    pub min_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080/api".to_string(),
            ws_url: "ws://localhost:8080/ws".to_string(),
            debug: false,
            log_level: "info".to_string(),
            http: HttpSettings::default(),
            socket: SocketSettings::default(),
            log_shipping: LogShippingSettings::default(),
        }
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            retries: 1,
            retry_delay_ms: 1000,
            token_path: None,
        }
    }
}

impl Default for SocketSettings {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: 30_000,
            heartbeat_timeout_ms: None,
            connection_timeout_ms: 10_000,
            reconnect_interval_ms: 1000,
            reconnect_decay: 1.5,
            max_reconnect_interval_ms: 30_000,
            max_reconnect_attempts: 10,
            auto_reconnect: true,
            queue_messages: true,
            max_queue_size: 100,
        }
    }
}

impl Default for LogShippingSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "/logs".to_string(),
            batch_size: 50,
            flush_interval_ms: 5000,
            min_level: "info".to_string(),
        }
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl SocketSettings {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn heartbeat_timeout(&self) -> Option<Duration> {
        self.heartbeat_timeout_ms.map(Duration::from_millis)
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }

    pub fn max_reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.max_reconnect_interval_ms)
    }
}

impl LogShippingSettings {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}

impl AppConfig {
    /// Load configuration from YAML file and .env
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self> {
        let yaml_content = std::fs::read_to_string(config_path)?;
        let mut config = Self::from_yaml(&yaml_content)?;

        // Don't fail if .env doesn't exist
        dotenv::dotenv().ok();
        config.apply_env(|name| std::env::var(name).ok())?;

        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Apply `PANEL_*` overrides read through `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = lookup(ENV_API_URL) {
            self.api_base_url = url;
        }
        if let Some(url) = lookup(ENV_WS_URL) {
            self.ws_url = url;
        }
        if let Some(raw) = lookup(ENV_DEBUG) {
            self.debug = parse_flag(&raw).ok_or_else(|| ConfigError::InvalidEnvVar {
                name: ENV_DEBUG.to_string(),
                reason: format!("expected true/false, got '{}'", raw),
            })?;
        }
        Ok(())
    }

    /// Effective log level; `debug: true` wins over `log_level`
    pub fn effective_log_level(&self) -> &str {
        if self.debug {
            "debug"
        } else {
            &self.log_level
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.api_base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "api_base_url must not be empty".to_string(),
            ));
        }

        if self.ws_url.trim().is_empty() {
            return Err(ConfigError::ValidationError("ws_url must not be empty".to_string()));
        }

        if self.socket.reconnect_decay < 1.0 {
            return Err(ConfigError::ValidationError(
                "socket.reconnect_decay must be at least 1.0".to_string(),
            ));
        }

        if self.socket.heartbeat_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "socket.heartbeat_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.socket.connection_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "socket.connection_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.socket.max_queue_size == 0 {
            return Err(ConfigError::ValidationError(
                "socket.max_queue_size must be greater than 0".to_string(),
            ));
        }

        if self.log_shipping.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "log_shipping.batch_size must be greater than 0".to_string(),
            ));
        }

        if self.log_shipping.min_level.parse::<tracing::Level>().is_err() {
            return Err(ConfigError::ValidationError(format!(
                "log_shipping.min_level '{}' is not a log level",
                self.log_shipping.min_level
            )));
        }

        Ok(())
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
