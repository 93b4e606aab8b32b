use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Dealsense
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Cache configuration for both namespaces
    #[serde(default)]
    pub cache: CacheConfig,

    /// Fan-out executor configuration
    #[serde(default)]
    pub fan_out: FanOutConfig,

    /// What to do when some classification keys stay unresolved
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Record source configuration
    #[serde(default)]
    pub data_source: DataSourceConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            fan_out: FanOutConfig::default(),
            failure_policy: FailurePolicy::default(),
            data_source: DataSourceConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// TTL cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CacheConfig {
    /// TTL for whole aggregation responses
    #[serde(default = "default_request_ttl_secs")]
    pub request_ttl_secs: u64,

    /// TTL for per-title classification results
    #[serde(default = "default_item_ttl_secs")]
    pub item_ttl_secs: u64,

    /// Capacity of each namespace
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

const fn default_request_ttl_secs() -> u64 {
    600
}

const fn default_item_ttl_secs() -> u64 {
    7 * 24 * 60 * 60
}

const fn default_max_entries() -> usize {
    10_000
}

impl CacheConfig {
    pub const fn request_ttl(&self) -> Duration {
        Duration::from_secs(self.request_ttl_secs)
    }

    pub const fn item_ttl(&self) -> Duration {
        Duration::from_secs(self.item_ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            request_ttl_secs: default_request_ttl_secs(),
            item_ttl_secs: default_item_ttl_secs(),
            max_entries: default_max_entries(),
        }
    }
}

/// Fan-out executor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FanOutConfig {
    /// Maximum classification calls in flight across all requests
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,

    /// Per-call timeout in milliseconds (0 disables the timeout)
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
}

const fn default_max_in_flight() -> usize {
    10
}

const fn default_call_timeout_ms() -> u64 {
    30_000
}

impl FanOutConfig {
    pub const fn call_timeout(&self) -> Option<Duration> {
        if self.call_timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.call_timeout_ms))
        }
    }
}

impl Default for FanOutConfig {
    fn default() -> Self {
        Self {
            max_in_flight: default_max_in_flight(),
            call_timeout_ms: default_call_timeout_ms(),
        }
    }
}

/// Policy applied when the fan-out leaves some keys in error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Report failed keys as unresolved stakeholders.
    #[default]
    Tolerant,
    /// Fail the whole aggregation and cache nothing.
    Strict,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tolerant => f.write_str("tolerant"),
            Self::Strict => f.write_str("strict"),
        }
    }
}

/// Record source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DataSourceConfig {
    /// Path to the JSON records file
    #[serde(default = "default_data_source_path")]
    pub path: String,
}

fn default_data_source_path() -> String {
    ".dealsense/records.json".to_string()
}

impl Default for DataSourceConfig {
    fn default() -> Self {
        Self {
            path: default_data_source_path(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format
    #[serde(default)]
    pub format: LogFormat,

    /// Directory for log files (optional, if None logs only to stdout)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Enable console logging (written to stderr)
    #[serde(default = "default_true")]
    pub enable_console: bool,

    /// Log rotation policy
    #[serde(default)]
    pub rotation: RotationPolicy,
}

fn default_log_level() -> String {
    "info".to_string()
}

const fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            log_dir: None,
            enable_console: true,
            rotation: RotationPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    #[default]
    Daily,
    Hourly,
    Never,
}
