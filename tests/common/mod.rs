//! Common test utilities for integration tests
//!
//! Counting test doubles for the two ports the aggregator drives, plus
//! builders for aggregators wired to a manual clock.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dealsense::adapters::ManualClock;
use dealsense::domain::errors::{ClassificationError, FetchError};
use dealsense::domain::models::{
    CacheConfig, ClassificationKey, FailurePolicy, FanOutConfig, RawRecord, RecordProjection,
    TitleVerdict,
};
use dealsense::domain::ports::{Clock, RecordSource, TitleClassifier};
use dealsense::services::{FanOutExecutor, StakeholderAggregator, StakeholderCaches};

/// Setup test logging
#[allow(dead_code)]
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Build a raw attendee record.
#[allow(dead_code)]
pub fn record(email: &str, name: &str, title: Option<&str>) -> RawRecord {
    RawRecord {
        email: Some(email.to_string()),
        name: Some(name.to_string()),
        title: title.map(String::from),
        ..Default::default()
    }
}

/// Record source backed by a map, counting fetches.
#[derive(Default)]
pub struct InMemoryRecordSource {
    deals: Mutex<HashMap<String, Vec<RawRecord>>>,
    fetches: AtomicUsize,
}

#[allow(dead_code)]
impl InMemoryRecordSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deal(self, id: &str, records: Vec<RawRecord>) -> Self {
        self.put_deal(id, records);
        self
    }

    /// Replace the records of a deal, as if the CRM changed underneath.
    pub fn put_deal(&self, id: &str, records: Vec<RawRecord>) {
        self.deals.lock().unwrap().insert(id.to_string(), records);
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordSource for InMemoryRecordSource {
    async fn fetch_projected_records(
        &self,
        aggregation_id: &str,
        _projection: &RecordProjection,
    ) -> Result<Vec<RawRecord>, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .deals
            .lock()
            .unwrap()
            .get(aggregation_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Classifier that records per-key calls and peak concurrency.
///
/// Titles containing "vp", "chief" or "head" are decision-makers. Keys in
/// `failing` are rejected.
#[derive(Default)]
pub struct CountingClassifier {
    calls: Mutex<HashMap<String, usize>>,
    total: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    delay: Duration,
    failing: HashSet<String>,
}

#[allow(dead_code)]
impl CountingClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing_on(mut self, key: &str) -> Self {
        self.failing.insert(key.to_string());
        self
    }

    pub fn total_calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, key: &str) -> usize {
        self.calls.lock().unwrap().get(key).copied().unwrap_or(0)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl TitleClassifier for CountingClassifier {
    fn classify(&self, key: &ClassificationKey) -> Result<TitleVerdict, ClassificationError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.total.fetch_add(1, Ordering::SeqCst);
        *self
            .calls
            .lock()
            .unwrap()
            .entry(key.as_str().to_string())
            .or_insert(0) += 1;

        if self.failing.contains(key.as_str()) {
            return Err(ClassificationError::rejected(key.as_str(), "scripted failure"));
        }
        let title = key.as_str();
        Ok(TitleVerdict {
            is_decision_maker: ["vp", "chief", "head"].iter().any(|m| title.contains(m)),
        })
    }
}

/// Everything a pipeline test needs to observe.
#[allow(dead_code)]
pub struct Harness {
    pub aggregator: StakeholderAggregator,
    pub source: Arc<InMemoryRecordSource>,
    pub classifier: Arc<CountingClassifier>,
    pub executor: Arc<FanOutExecutor>,
    pub clock: Arc<ManualClock>,
}

/// Wire an aggregator over the doubles with default cache settings.
#[allow(dead_code)]
pub fn harness(
    source: InMemoryRecordSource,
    classifier: CountingClassifier,
    policy: FailurePolicy,
) -> Harness {
    harness_with(source, classifier, policy, 10)
}

#[allow(dead_code)]
pub fn harness_with(
    source: InMemoryRecordSource,
    classifier: CountingClassifier,
    policy: FailurePolicy,
    max_in_flight: usize,
) -> Harness {
    let source = Arc::new(source);
    let classifier = Arc::new(classifier);
    let clock = Arc::new(ManualClock::default());
    let dyn_clock: Arc<dyn Clock> = clock.clone();

    let fan_out = FanOutConfig {
        max_in_flight,
        call_timeout_ms: 0,
    };
    let executor = Arc::new(
        FanOutExecutor::new(classifier.clone(), &fan_out).with_clock(dyn_clock.clone()),
    );
    let caches = StakeholderCaches::from_config(&CacheConfig::default(), dyn_clock.clone());

    let aggregator =
        StakeholderAggregator::new(source.clone(), executor.clone(), Arc::new(caches), policy)
            .with_clock(dyn_clock);

    Harness {
        aggregator,
        source,
        classifier,
        executor,
        clock,
    }
}

/// Poll `condition` every 10ms until it holds or `timeout_ms` passes.
#[allow(dead_code)]
pub async fn wait_for<F>(mut condition: F, timeout_ms: u64) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
