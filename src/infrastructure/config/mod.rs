//! Configuration management infrastructure
//!
//! Hierarchical configuration using figment:
//! - Programmatic defaults
//! - YAML file loading
//! - `DEALSENSE_*` environment overrides
//! - Validation into a typed [`ConfigError`]

pub mod loader;

pub use loader::{ConfigError, ConfigLoader};
