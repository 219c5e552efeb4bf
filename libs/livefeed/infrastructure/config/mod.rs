use crate::infrastructure::dhan::{
    DHAN_FEED_URL, MAX_INSTRUMENTS_PER_CONNECTION, MAX_INSTRUMENTS_PER_REQUEST,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config file: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarMissing(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Live feed service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveFeedConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    #[serde(default)]
    pub subscription: SubscriptionConfig,
    #[serde(default)]
    pub server: ServerConfig,
    /// Accounts file backing the static directory
    #[serde(default)]
    pub accounts_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_feed_url")]
    pub url: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: default_feed_url(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl FeedConfig {
    /// `None` when the timeout is disabled (0)
    pub fn connect_timeout(&self) -> Option<Duration> {
        (self.connect_timeout_secs > 0).then(|| Duration::from_secs(self.connect_timeout_secs))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// When false a dropped socket is never reopened automatically
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_instruments")]
    pub max_instruments: usize,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_instruments: default_max_instruments(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_feed_url() -> String {
    DHAN_FEED_URL.to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_initial_delay_ms() -> u64 {
    2_000
}

fn default_max_delay_ms() -> u64 {
    60_000
}

fn default_max_attempts() -> u32 {
    10
}

fn default_batch_size() -> usize {
    MAX_INSTRUMENTS_PER_REQUEST
}

fn default_max_instruments() -> usize {
    MAX_INSTRUMENTS_PER_CONNECTION
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for LiveFeedConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            feed: FeedConfig::default(),
            reconnect: ReconnectConfig::default(),
            subscription: SubscriptionConfig::default(),
            server: ServerConfig::default(),
            accounts_path: None,
        }
    }
}

impl LiveFeedConfig {
    /// Load configuration from YAML file and .env
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self> {
        let yaml_content = std::fs::read_to_string(config_path)?;
        Self::from_yaml_str(&yaml_content)
    }

    /// Parse, apply environment overrides and validate
    pub fn from_yaml_str(yaml_content: &str) -> Result<Self> {
        let mut config: LiveFeedConfig = serde_yaml::from_str(yaml_content)?;

        dotenv::dotenv().ok();
        config.apply_env_overrides();

        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DHAN_FEED_URL") {
            info!("Overriding feed URL from environment variable");
            self.feed.url = url;
        }

        if let Ok(addr) = std::env::var("LIVEFEED_BIND_ADDR") {
            info!("Overriding bind address from environment variable");
            self.server.bind_addr = addr;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "log_level must be one of: {}",
                valid_levels.join(", ")
            )));
        }

        if !(self.feed.url.starts_with("ws://") || self.feed.url.starts_with("wss://")) {
            return Err(ConfigError::ValidationError(
                "feed.url must be a ws:// or wss:// URL".to_string(),
            ));
        }

        if self.reconnect.initial_delay_ms == 0 {
            return Err(ConfigError::ValidationError(
                "reconnect.initial_delay_ms must be greater than 0".to_string(),
            ));
        }

        if self.reconnect.max_delay_ms < self.reconnect.initial_delay_ms {
            return Err(ConfigError::ValidationError(
                "reconnect.max_delay_ms must be at least reconnect.initial_delay_ms".to_string(),
            ));
        }

        if self.subscription.batch_size == 0
            || self.subscription.batch_size > MAX_INSTRUMENTS_PER_REQUEST
        {
            return Err(ConfigError::ValidationError(format!(
                "subscription.batch_size must be between 1 and {}",
                MAX_INSTRUMENTS_PER_REQUEST
            )));
        }

        if self.subscription.max_instruments == 0
            || self.subscription.max_instruments > MAX_INSTRUMENTS_PER_CONNECTION
        {
            return Err(ConfigError::ValidationError(format!(
                "subscription.max_instruments must be between 1 and {}",
                MAX_INSTRUMENTS_PER_CONNECTION
            )));
        }

        if self.server.bind_addr.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "server.bind_addr cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Log configuration summary
    pub fn log(&self) {
        info!("Configuration loaded:");
        info!("  Feed URL: {}", self.feed.url);
        info!("  Connect timeout: {} seconds", self.feed.connect_timeout_secs);
        if self.reconnect.enabled {
            info!(
                "  Reconnect: {}ms doubling to {}ms, {} attempts",
                self.reconnect.initial_delay_ms,
                self.reconnect.max_delay_ms,
                self.reconnect.max_attempts
            );
        } else {
            info!("  Reconnect: disabled");
        }
        info!(
            "  Subscription: batches of {}, at most {} instruments",
            self.subscription.batch_size, self.subscription.max_instruments
        );
        info!("  Bind address: {}", self.server.bind_addr);
        info!("  Log level: {}", self.log_level);
        if let Some(path) = &self.accounts_path {
            info!("  Accounts file: {}", path);
        }
    }
}
