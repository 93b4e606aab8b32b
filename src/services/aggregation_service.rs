//! Stakeholder aggregation pipeline.
//!
//! ```text
//! CHECK_REQUEST_CACHE ─hit─────────────────────────────────────────────▶ DONE
//!        │ miss
//!        ▼
//! FETCH_RECORDS ─▶ DEDUPLICATE ─▶ PARTITION_KEYS ─▶ FAN_OUT_MISSES ─▶ MERGE
//!        │ error                                                       │
//!        ▼                                                             ▼
//!      FAILED ◀──────────── strict policy, unresolved keys ──── WRITE_CACHES ─▶ DONE
//! ```
//!
//! The request cache short-circuits repeated aggregations; the item cache
//! lets different aggregations share classification results per title.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::{AggregationError, AggregationResult, ClassificationError};
use crate::domain::models::{
    AggregationResponse, CacheConfig, ClassificationKey, ClassificationResult,
    ClassifiedStakeholder, FailurePolicy, RecordProjection, StakeholderVerdict,
};
use crate::domain::ports::{Clock, RecordSource, SystemClock};
use crate::services::cache_keys::{self, CacheNamespace};
use crate::services::fan_out::FanOutExecutor;
use crate::services::stakeholder_dedup::deduplicate;
use crate::services::ttl_cache::{CacheStats, CacheStore};

/// Pipeline stages, used for structured logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationStage {
    CheckRequestCache,
    FetchRecords,
    Deduplicate,
    PartitionKeys,
    FanOutMisses,
    Merge,
    WriteCaches,
    Done,
    Failed,
}

impl fmt::Display for AggregationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CheckRequestCache => "check_request_cache",
            Self::FetchRecords => "fetch_records",
            Self::Deduplicate => "deduplicate",
            Self::PartitionKeys => "partition_keys",
            Self::FanOutMisses => "fan_out_misses",
            Self::Merge => "merge",
            Self::WriteCaches => "write_caches",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// The two process-lifetime caches.
pub struct StakeholderCaches {
    pub request: CacheStore<Arc<AggregationResponse>>,
    pub item: CacheStore<ClassificationResult>,
}

impl StakeholderCaches {
    pub fn from_config(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            request: CacheStore::with_clock(config.request_ttl(), clock.clone())
                .with_max_entries(config.max_entries),
            item: CacheStore::with_clock(config.item_ttl(), clock)
                .with_max_entries(config.max_entries),
        }
    }

    /// Snapshot of both namespaces.
    pub fn stats(&self) -> CacheStatsReport {
        let namespaces = CacheNamespace::ALL
            .into_iter()
            .map(|namespace| (namespace, self.stats_for(namespace)))
            .collect();
        CacheStatsReport { namespaces }
    }

    pub fn stats_for(&self, namespace: CacheNamespace) -> CacheStats {
        match namespace {
            CacheNamespace::Request => self.request.stats(),
            CacheNamespace::Item => self.item.stats(),
        }
    }

    /// Clear one logical key (an aggregation id or a title) or the whole namespace.
    pub fn clear(&self, namespace: CacheNamespace, key: Option<&str>) -> ClearReport {
        let full_key = key.map(|k| namespace.key_for(k));
        let entries_cleared = match namespace {
            CacheNamespace::Request => self.request.clear(full_key.as_deref()),
            CacheNamespace::Item => self.item.clear(full_key.as_deref()),
        };
        info!(
            namespace = %namespace,
            key = full_key.as_deref().unwrap_or("*"),
            entries_cleared,
            "cache cleared"
        );
        ClearReport {
            namespace,
            key: full_key,
            entries_cleared,
        }
    }
}

/// Stats for every namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStatsReport {
    pub namespaces: BTreeMap<CacheNamespace, CacheStats>,
}

/// Result of a clear request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearReport {
    pub namespace: CacheNamespace,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub entries_cleared: usize,
}

/// Cache-aware stakeholder aggregation.
pub struct StakeholderAggregator {
    source: Arc<dyn RecordSource>,
    executor: Arc<FanOutExecutor>,
    caches: Arc<StakeholderCaches>,
    policy: FailurePolicy,
    projection: RecordProjection,
    clock: Arc<dyn Clock>,
}

impl StakeholderAggregator {
    pub fn new(
        source: Arc<dyn RecordSource>,
        executor: Arc<FanOutExecutor>,
        caches: Arc<StakeholderCaches>,
        policy: FailurePolicy,
    ) -> Self {
        Self {
            source,
            executor,
            caches,
            policy,
            projection: RecordProjection::stakeholder(),
            clock: Arc::new(SystemClock),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Ask the record source for extra attributes on top of identity and title.
    #[must_use]
    pub fn with_projection(mut self, projection: RecordProjection) -> Self {
        self.projection = projection;
        self
    }

    pub const fn policy(&self) -> FailurePolicy {
        self.policy
    }

    pub const fn caches(&self) -> &Arc<StakeholderCaches> {
        &self.caches
    }

    /// Aggregate and classify the stakeholders of one aggregation.
    #[instrument(skip(self), fields(policy = %self.policy))]
    pub async fn aggregate(
        &self,
        aggregation_id: &str,
    ) -> AggregationResult<Arc<AggregationResponse>> {
        let aggregation_id = aggregation_id.trim();
        if aggregation_id.is_empty() {
            return Err(AggregationError::InvalidRequest(
                "aggregation id cannot be empty".to_string(),
            ));
        }
        let request_key = cache_keys::request_key(aggregation_id);

        if let Some(cached) = self.caches.request.get(&request_key) {
            debug!(
                stage = %AggregationStage::CheckRequestCache,
                request_key = %request_key,
                "request cache hit"
            );
            return Ok(cached);
        }

        let records = self
            .source
            .fetch_projected_records(aggregation_id, &self.projection)
            .await
            .map_err(|err| {
                warn!(stage = %AggregationStage::Failed, error = %err, "record fetch failed");
                AggregationError::from(err)
            })?;
        debug!(stage = %AggregationStage::FetchRecords, records = records.len(), "records fetched");

        let dedup = deduplicate(records);
        debug!(
            stage = %AggregationStage::Deduplicate,
            stakeholders = dedup.stakeholders.len(),
            keys = dedup.keys.len(),
            skipped = dedup.skipped_records,
            "stakeholders deduplicated"
        );

        let (mut resolved, misses) = self.partition_keys(&dedup.keys);
        debug!(
            stage = %AggregationStage::PartitionKeys,
            hits = resolved.len(),
            misses = misses.len(),
            "classification keys partitioned"
        );

        let fresh = self.executor.execute(misses).await;
        debug!(stage = %AggregationStage::FanOutMisses, results = fresh.len(), "fan-out complete");

        let mut computed = Vec::with_capacity(fresh.len());
        let mut failed: BTreeMap<ClassificationKey, ClassificationError> = BTreeMap::new();
        for (key, outcome) in fresh {
            match outcome {
                Ok(result) => {
                    computed.push(result.clone());
                    resolved.insert(key, result);
                }
                Err(err) => {
                    failed.insert(key, err);
                }
            }
        }
        for key in &dedup.keys {
            if !resolved.contains_key(key) && !failed.contains_key(key) {
                failed.insert(
                    key.clone(),
                    ClassificationError::Aborted {
                        key: key.to_string(),
                        reason: "no result returned".to_string(),
                    },
                );
            }
        }

        if !failed.is_empty() && self.policy == FailurePolicy::Strict {
            let failed_keys: Vec<String> = failed.keys().map(ToString::to_string).collect();
            warn!(
                stage = %AggregationStage::Failed,
                failed = failed_keys.len(),
                "unresolved keys under strict policy, nothing cached"
            );
            return Err(AggregationError::PartialResultPolicyViolation { failed_keys });
        }

        let stakeholders = dedup
            .stakeholders
            .into_iter()
            .map(|stakeholder| {
                let verdict = match stakeholder.classification_key() {
                    None => StakeholderVerdict::Untitled,
                    Some(key) => match resolved.get(&key) {
                        Some(result) => StakeholderVerdict::Classified {
                            result: result.clone(),
                        },
                        None => {
                            let error = failed
                                .get(&key)
                                .map(ToString::to_string)
                                .unwrap_or_default();
                            StakeholderVerdict::Unresolved { key, error }
                        }
                    },
                };
                ClassifiedStakeholder {
                    stakeholder,
                    verdict,
                }
            })
            .collect();

        let response = Arc::new(AggregationResponse::new(
            request_key.clone(),
            aggregation_id.to_string(),
            self.clock.now(),
            stakeholders,
            dedup.skipped_records,
        ));
        debug!(stage = %AggregationStage::Merge, unresolved = failed.len(), "results merged");

        for result in computed {
            self.caches.item.set(cache_keys::item_key(&result.key), result);
        }
        if response.is_complete() {
            self.caches.request.set(request_key, response.clone());
        }
        debug!(
            stage = %AggregationStage::WriteCaches,
            request_cached = response.is_complete(),
            "caches written"
        );

        info!(
            stage = %AggregationStage::Done,
            stakeholders = response.summary.total_stakeholders,
            decision_makers = response.summary.decision_makers,
            unresolved = response.summary.unresolved,
            "aggregation complete"
        );
        Ok(response)
    }

    /// Snapshot of both caches.
    pub fn cache_stats(&self) -> CacheStatsReport {
        self.caches.stats()
    }

    /// Clear one logical key or a whole namespace.
    pub fn clear_cache(&self, namespace: CacheNamespace, key: Option<&str>) -> ClearReport {
        self.caches.clear(namespace, key)
    }

    /// Split keys into item-cache hits and misses.
    fn partition_keys(
        &self,
        keys: &[ClassificationKey],
    ) -> (HashMap<ClassificationKey, ClassificationResult>, Vec<ClassificationKey>) {
        let mut hits = HashMap::with_capacity(keys.len());
        let mut misses = Vec::new();
        for key in keys {
            match self.caches.item.get(&cache_keys::item_key(key)) {
                Some(result) => {
                    hits.insert(key.clone(), result);
                }
                None => misses.push(key.clone()),
            }
        }
        (hits, misses)
    }
}
