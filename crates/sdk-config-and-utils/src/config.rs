//! Configuration management for the SDK core.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default database file name inside the data directory.
pub const DEFAULT_DATABASE_FILE_NAME: &str = "core.db";

/// Default endpoint merged shard batches are addressed to.
pub const DEFAULT_BATCH_ENDPOINT_URL: &str = "https://localhost/batch";

/// Environment variable overriding the log level.
pub const LOG_LEVEL_ENV: &str = "SDK_LOG_LEVEL";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Shard batching settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchingConfig {
    /// Number of buffered shards that triggers a flush.
    pub threshold: usize,
    /// Maximum shards merged into one request.
    pub chunk_size: usize,
    /// URL merged requests are addressed to.
    pub endpoint_url: String,
    /// Lifetime given to new shards, in milliseconds.
    pub shard_ttl_ms: i64,
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            threshold: 1,
            chunk_size: 10,
            endpoint_url: DEFAULT_BATCH_ENDPOINT_URL.to_string(),
            shard_ttl_ms: i64::MAX,
        }
    }
}

/// Main configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
    #[serde(default = "default_database_file_name")]
    pub database_file_name: String,
    #[serde(default)]
    pub batching: BatchingConfig,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_database_file_name() -> String {
    DEFAULT_DATABASE_FILE_NAME.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            database_file_name: default_database_file_name(),
            batching: BatchingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the config file, falling back to defaults,
    /// then apply environment overrides and validate.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the config file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    /// Override configuration from environment variables.
    fn load_from_env(&mut self) {
        self.apply_env_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from `lookup`. Only the log level can be overridden.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(log_level) = lookup(LOG_LEVEL_ENV).filter(|v| !v.trim().is_empty()) {
            self.log_level = log_level.trim().to_string();
        }
    }

    /// Reject settings the batching pipeline cannot run with.
    pub fn validate(&self) -> CoreResult<()> {
        if self.database_file_name.trim().is_empty() {
            return Err(CoreError::Config(
                "database_file_name must not be empty".to_string(),
            ));
        }
        if self.batching.threshold == 0 {
            return Err(CoreError::Config(
                "batching.threshold must be at least 1".to_string(),
            ));
        }
        if self.batching.chunk_size == 0 {
            return Err(CoreError::Config(
                "batching.chunk_size must be at least 1".to_string(),
            ));
        }
        if self.batching.shard_ttl_ms <= 0 {
            return Err(CoreError::Config(
                "batching.shard_ttl_ms must be positive".to_string(),
            ));
        }
        self.batch_endpoint_url()?;
        Ok(())
    }

    /// Get the batch endpoint as a parsed URL.
    pub fn batch_endpoint_url(&self) -> CoreResult<Url> {
        Url::parse(&self.batching.endpoint_url).map_err(CoreError::from)
    }
}
