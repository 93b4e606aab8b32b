//! Dealsense - cached stakeholder aggregation
//!
//! Dealsense collects the attendees of a deal or account, collapses them to
//! unique stakeholders, and labels each one as a decision-maker or not using a
//! slow, blocking title classifier. Two TTL caches keep the classifier quiet:
//! a request-level cache of whole responses and an item-level cache of
//! per-title results shared across requests.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, errors and port traits
//! - **Service Layer** (`services`): TTL cache store, fan-out executor, aggregation pipeline
//! - **Adapters** (`adapters`): JSON file record source, keyword classifier, clocks
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use dealsense::adapters::{JsonFileRecordSource, KeywordClassifier};
//! use dealsense::domain::models::Config;
//! use dealsense::domain::ports::SystemClock;
//! use dealsense::services::{FanOutExecutor, StakeholderAggregator, StakeholderCaches};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let executor = FanOutExecutor::new(Arc::new(KeywordClassifier::new()), &config.fan_out);
//!     let caches = StakeholderCaches::from_config(&config.cache, Arc::new(SystemClock));
//!     let aggregator = StakeholderAggregator::new(
//!         Arc::new(JsonFileRecordSource::new(&config.data_source.path)),
//!         Arc::new(executor),
//!         Arc::new(caches),
//!         config.failure_policy,
//!     );
//!     let response = aggregator.aggregate("Deal-A").await?;
//!     println!("{} decision makers", response.summary.decision_makers);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{AggregationError, ClassificationError, FetchError};
pub use domain::models::{
    AggregationResponse, ClassificationKey, ClassificationResult, Config, FailurePolicy,
    StakeholderVerdict,
};
pub use domain::ports::{Clock, RecordSource, TitleClassifier};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{CacheStore, FanOutExecutor, StakeholderAggregator, StakeholderCaches};
