//! Bounded fan-out executor for title classification.
//!
//! Runs one blocking classifier call per distinct key, never more than
//! `max_in_flight` at a time across every caller sharing the executor, and
//! returns only once every submitted call has finished or timed out.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, instrument, warn};

use crate::domain::errors::ClassificationError;
use crate::domain::models::{ClassificationKey, ClassificationResult, FanOutConfig};
use crate::domain::ports::{Clock, SystemClock, TitleClassifier};

/// Per-key outcome of a fan-out, one entry per submitted key.
pub type FanOutResults = HashMap<ClassificationKey, Result<ClassificationResult, ClassificationError>>;

/// Worker-budgeted executor around a [`TitleClassifier`].
///
/// Share one instance (behind an `Arc`) between all requests: the semaphore
/// it owns is the global worker budget. When the budget is exhausted further
/// submissions wait for a permit rather than spawning more calls.
pub struct FanOutExecutor {
    classifier: Arc<dyn TitleClassifier>,
    permits: Arc<Semaphore>,
    max_in_flight: usize,
    call_timeout: Option<Duration>,
    clock: Arc<dyn Clock>,
}

impl FanOutExecutor {
    pub fn new(classifier: Arc<dyn TitleClassifier>, config: &FanOutConfig) -> Self {
        let max_in_flight = config.max_in_flight.max(1);
        Self {
            classifier,
            permits: Arc::new(Semaphore::new(max_in_flight)),
            max_in_flight,
            call_timeout: config.call_timeout(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Stamp results with `clock` instead of the system clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub const fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    pub const fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout
    }

    /// Permits not currently held by a running classifier call.
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Stop accepting work.
    ///
    /// Calls already holding a permit run to completion. Keys still waiting
    /// for a permit, and every later submission, fail with
    /// [`ClassificationError::ExecutorClosed`].
    pub fn close(&self) {
        self.permits.close();
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }

    /// Classify every key concurrently.
    ///
    /// Keys must already be distinct. A failure or timeout is recorded against
    /// its own key and never cancels sibling calls.
    #[instrument(skip_all, fields(keys = keys.len(), budget = self.max_in_flight))]
    pub async fn execute(&self, keys: Vec<ClassificationKey>) -> FanOutResults {
        if keys.is_empty() {
            return HashMap::new();
        }

        let mut handles = Vec::with_capacity(keys.len());
        for key in keys {
            let Ok(permit) = self.permits.clone().acquire_owned().await else {
                handles.push((key, None));
                continue;
            };

            let handle = tokio::spawn(classify_one(
                key.clone(),
                self.classifier.clone(),
                self.clock.clone(),
                self.call_timeout,
                permit,
            ));
            handles.push((key, Some(handle)));
        }

        // Collect results
        let mut results = HashMap::with_capacity(handles.len());
        for (key, handle) in handles {
            let outcome = match handle {
                Some(handle) => handle.await.unwrap_or_else(|err| {
                    Err(ClassificationError::Aborted {
                        key: key.to_string(),
                        reason: err.to_string(),
                    })
                }),
                None => Err(ClassificationError::ExecutorClosed),
            };

            match &outcome {
                Ok(result) => debug!(
                    key = %key,
                    is_decision_maker = result.is_decision_maker,
                    "title classified"
                ),
                Err(error) => warn!(key = %key, error = %error, "title classification failed"),
            }
            results.insert(key, outcome);
        }

        results
    }
}

/// Run one classifier call on the blocking pool.
///
/// The permit is released when the classifier returns, not when the caller
/// gives up, so a timed-out call still counts against the budget.
async fn classify_one(
    key: ClassificationKey,
    classifier: Arc<dyn TitleClassifier>,
    clock: Arc<dyn Clock>,
    call_timeout: Option<Duration>,
    permit: OwnedSemaphorePermit,
) -> Result<ClassificationResult, ClassificationError> {
    let call_key = key.clone();
    let call = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        classifier.classify(&call_key)
    });

    let joined = match call_timeout {
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(joined) => joined,
            Err(_) => {
                return Err(ClassificationError::TimedOut {
                    key: key.to_string(),
                    timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                });
            }
        },
        None => call.await,
    };

    let verdict = joined.map_err(|err| ClassificationError::Aborted {
        key: key.to_string(),
        reason: err.to_string(),
    })??;

    Ok(ClassificationResult {
        key,
        is_decision_maker: verdict.is_decision_maker,
        computed_at: clock.now(),
    })
}
