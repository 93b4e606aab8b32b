//! CLI command handlers

pub mod aggregate;
pub mod batch;

use std::sync::Arc;
use std::time::Duration;

use crate::adapters::{JsonFileRecordSource, KeywordClassifier};
use crate::cli::types::RuntimeArgs;
use crate::domain::models::{Config, FailurePolicy};
use crate::domain::ports::{Clock, SystemClock};
use crate::services::{FanOutExecutor, StakeholderAggregator, StakeholderCaches};

/// Wire the configured adapters into one aggregator with a fresh cache pair.
pub fn build_aggregator(config: &Config, runtime: &RuntimeArgs) -> StakeholderAggregator {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let classifier = match runtime.classifier_latency_ms {
        Some(ms) => KeywordClassifier::new().with_latency(Duration::from_millis(ms)),
        None => KeywordClassifier::new(),
    };
    let executor =
        FanOutExecutor::new(Arc::new(classifier), &config.fan_out).with_clock(clock.clone());
    let caches = StakeholderCaches::from_config(&config.cache, clock.clone());
    let source = JsonFileRecordSource::new(&config.data_source.path);

    let policy = if runtime.strict {
        FailurePolicy::Strict
    } else {
        config.failure_policy
    };

    StakeholderAggregator::new(Arc::new(source), Arc::new(executor), Arc::new(caches), policy)
        .with_clock(clock)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_flag_overrides_config_policy() {
        let config = Config::default();

        let tolerant = build_aggregator(&config, &RuntimeArgs::default());
        assert_eq!(tolerant.policy(), FailurePolicy::Tolerant);

        let strict = build_aggregator(
            &config,
            &RuntimeArgs {
                strict: true,
                classifier_latency_ms: None,
            },
        );
        assert_eq!(strict.policy(), FailurePolicy::Strict);
    }
}
