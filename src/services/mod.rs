//! Service layer: cache store, fan-out executor and the aggregation pipeline.

pub mod aggregation_service;
pub mod cache_keys;
pub mod fan_out;
pub mod stakeholder_dedup;
pub mod ttl_cache;

pub use aggregation_service::{
    AggregationStage, CacheStatsReport, ClearReport, StakeholderAggregator, StakeholderCaches,
};
pub use cache_keys::CacheNamespace;
pub use fan_out::{FanOutExecutor, FanOutResults};
pub use stakeholder_dedup::{deduplicate, DedupOutcome};
pub use ttl_cache::{CacheEntry, CacheEntryStats, CacheStats, CacheStore};
