use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {namespace} cache TTL: {value}s. Must be at least 1 second")]
    InvalidTtl { namespace: &'static str, value: u64 },

    #[error("Invalid max_entries: {0}. Must be at least 1")]
    InvalidMaxEntries(usize),

    #[error("Invalid max_in_flight: {0}. Must be between 1 and 256")]
    InvalidMaxInFlight(usize),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Data source path cannot be empty")]
    EmptyDataSourcePath,
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .dealsense/config.yaml (project config)
    /// 3. .dealsense/local.yaml (project local overrides, optional)
    /// 4. Environment variables (DEALSENSE_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".dealsense/config.yaml"))
            .merge(Yaml::file(".dealsense/local.yaml"))
            .merge(Env::prefixed("DEALSENSE_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honoring environment overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed("DEALSENSE_").split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.cache.request_ttl_secs == 0 {
            return Err(ConfigError::InvalidTtl {
                namespace: "request",
                value: 0,
            });
        }
        if config.cache.item_ttl_secs == 0 {
            return Err(ConfigError::InvalidTtl {
                namespace: "item",
                value: 0,
            });
        }
        if config.cache.max_entries == 0 {
            return Err(ConfigError::InvalidMaxEntries(config.cache.max_entries));
        }

        if config.fan_out.max_in_flight == 0 || config.fan_out.max_in_flight > 256 {
            return Err(ConfigError::InvalidMaxInFlight(config.fan_out.max_in_flight));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        if config.data_source.path.trim().is_empty() {
            return Err(ConfigError::EmptyDataSourcePath);
        }

        Ok(())
    }
}
