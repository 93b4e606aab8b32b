//! End-to-end tests for the cache-aware aggregation pipeline.

mod common;

use common::{harness, harness_with, record, wait_for, CountingClassifier, InMemoryRecordSource};
use dealsense::domain::errors::AggregationError;
use dealsense::domain::models::{FailurePolicy, StakeholderVerdict};
use dealsense::services::CacheNamespace;
use std::sync::Arc;
use std::time::Duration;

fn deal_a() -> Vec<dealsense::domain::models::RawRecord> {
    vec![
        record("ada@acme.io", "Ada", Some("VP Engineering")),
        record("bob@acme.io", "Bob", Some("Software Engineer")),
        record("cy@acme.io", "Cy", Some("Chief Financial Officer")),
    ]
}

#[tokio::test]
async fn test_repeat_request_is_served_from_request_cache() {
    let h = harness(
        InMemoryRecordSource::new().with_deal("Deal-A", deal_a()),
        CountingClassifier::new(),
        FailurePolicy::Tolerant,
    );

    let first = h.aggregator.aggregate("Deal-A").await.unwrap();
    let calls_after_first = h.classifier.total_calls();
    let second = h.aggregator.aggregate("Deal-A").await.unwrap();

    assert_eq!(calls_after_first, 3);
    assert_eq!(h.source.fetches(), 1, "no second fetch");
    assert_eq!(h.classifier.total_calls(), 3, "no second classification");
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(
        serde_json::to_string(&*first).unwrap(),
        serde_json::to_string(&*second).unwrap()
    );
    assert_eq!(first.summary.decision_makers, 2);
}

#[tokio::test]
async fn test_request_key_trims_surrounding_whitespace() {
    let h = harness(
        InMemoryRecordSource::new().with_deal("Deal-A", deal_a()),
        CountingClassifier::new(),
        FailurePolicy::Tolerant,
    );

    h.aggregator.aggregate("Deal-A").await.unwrap();
    let again = h.aggregator.aggregate("  Deal-A ").await.unwrap();

    assert_eq!(h.source.fetches(), 1);
    assert_eq!(again.request_key, "stakeholders:Deal-A");
}

#[tokio::test]
async fn test_other_spellings_do_not_share_a_cached_response() {
    let h = harness(
        InMemoryRecordSource::new().with_deal("Deal-A", deal_a()),
        CountingClassifier::new(),
        FailurePolicy::Tolerant,
    );

    let lower = h.aggregator.aggregate("deal-a").await.unwrap();
    assert!(lower.stakeholders.is_empty(), "source only knows Deal-A");

    let exact = h.aggregator.aggregate("Deal-A").await.unwrap();
    assert_eq!(h.source.fetches(), 2);
    assert_eq!(exact.request_key, "stakeholders:Deal-A");
    assert_eq!(exact.summary.total_stakeholders, 3);
    assert_eq!(exact.summary.decision_makers, 2);
}

#[tokio::test]
async fn test_titles_are_reused_across_requests() {
    let h = harness(
        InMemoryRecordSource::new()
            .with_deal("Deal-A", deal_a())
            .with_deal(
                "Deal-B",
                vec![
                    record("dee@globex.io", "Dee", Some("vp   engineering")),
                    record("eve@globex.io", "Eve", Some("Head of Procurement")),
                ],
            ),
        CountingClassifier::new(),
        FailurePolicy::Tolerant,
    );

    h.aggregator.aggregate("Deal-A").await.unwrap();
    let deal_b = h.aggregator.aggregate("Deal-B").await.unwrap();

    assert_eq!(h.source.fetches(), 2);
    assert_eq!(h.classifier.calls_for("vp engineering"), 1, "served from item cache");
    assert_eq!(h.classifier.calls_for("head of procurement"), 1);
    assert_eq!(h.classifier.total_calls(), 4);
    assert_eq!(deal_b.summary.decision_makers, 2);
}

#[tokio::test]
async fn test_shared_titles_are_classified_once_per_request() {
    let records = vec![
        record("a@x.co", "A", Some("CTO")),
        record("b@x.co", "B", Some("cto")),
        record("c@x.co", "C", Some(" CTO ")),
        record("d@x.co", "D", Some("Engineer")),
        record("e@x.co", "E", Some("engineer")),
        record("f@x.co", "F", Some("Designer")),
        record("A@X.CO", "A again", Some("CTO")),
    ];
    let h = harness(
        InMemoryRecordSource::new().with_deal("Deal-C", records),
        CountingClassifier::new(),
        FailurePolicy::Tolerant,
    );

    let response = h.aggregator.aggregate("Deal-C").await.unwrap();

    assert_eq!(response.summary.total_stakeholders, 6, "duplicate identity collapsed");
    assert_eq!(h.classifier.total_calls(), 3, "one call per distinct key");
    assert_eq!(h.classifier.calls_for("cto"), 1);
}

#[tokio::test]
async fn test_tolerant_policy_isolates_a_failing_key() {
    let records = vec![
        record("a@x.co", "A", Some("VP Engineering")),
        record("b@x.co", "B", Some("CTO")),
        record("c@x.co", "C", Some("Head of Sales")),
        record("d@x.co", "D", Some("Engineer")),
        record("e@x.co", "E", Some("CFO")),
    ];
    let h = harness(
        InMemoryRecordSource::new().with_deal("Deal-D", records),
        CountingClassifier::new().failing_on("cfo"),
        FailurePolicy::Tolerant,
    );

    let response = h.aggregator.aggregate("Deal-D").await.unwrap();

    assert_eq!(response.summary.unresolved, 1);
    assert!(!response.is_complete());
    match &response.stakeholders[4].verdict {
        StakeholderVerdict::Unresolved { key, error } => {
            assert_eq!(key.as_str(), "cfo");
            assert!(error.contains("scripted failure"));
        }
        other => panic!("expected unresolved verdict, got {other:?}"),
    }

    let stats = h.aggregator.cache_stats();
    assert_eq!(stats.namespaces[&CacheNamespace::Item].count, 4, "successes cached");
    assert_eq!(
        stats.namespaces[&CacheNamespace::Request].count,
        0,
        "incomplete response not cached"
    );

    // Only the failed key is retried.
    h.aggregator.aggregate("Deal-D").await.unwrap();
    assert_eq!(h.source.fetches(), 2);
    assert_eq!(h.classifier.calls_for("cfo"), 2);
    assert_eq!(h.classifier.calls_for("cto"), 1);
}

#[tokio::test]
async fn test_strict_policy_fails_and_caches_nothing() {
    let records = vec![
        record("a@x.co", "A", Some("VP Engineering")),
        record("b@x.co", "B", Some("CTO")),
        record("c@x.co", "C", Some("Head of Sales")),
        record("d@x.co", "D", Some("Engineer")),
        record("e@x.co", "E", Some("CFO")),
    ];
    let h = harness(
        InMemoryRecordSource::new().with_deal("Deal-E", records),
        CountingClassifier::new().failing_on("cfo"),
        FailurePolicy::Strict,
    );

    let err = h.aggregator.aggregate("Deal-E").await.unwrap_err();

    assert_eq!(
        err,
        AggregationError::PartialResultPolicyViolation {
            failed_keys: vec!["cfo".to_string()],
        }
    );
    assert_eq!(h.classifier.total_calls(), 5);
    let stats = h.aggregator.cache_stats();
    assert_eq!(stats.namespaces[&CacheNamespace::Item].count, 0, "four successes not cached");
    assert_eq!(stats.namespaces[&CacheNamespace::Request].count, 0);
}

#[tokio::test]
async fn test_request_entry_expires_at_ttl_while_items_survive() {
    let h = harness(
        InMemoryRecordSource::new().with_deal("Deal-A", deal_a()),
        CountingClassifier::new(),
        FailurePolicy::Tolerant,
    );

    h.aggregator.aggregate("Deal-A").await.unwrap();

    h.clock.advance_secs(599);
    h.aggregator.aggregate("Deal-A").await.unwrap();
    assert_eq!(h.source.fetches(), 1, "still live one second before expiry");

    h.clock.advance_secs(1);
    h.aggregator.aggregate("Deal-A").await.unwrap();
    assert_eq!(h.source.fetches(), 2, "expired exactly at the TTL");
    assert_eq!(h.classifier.total_calls(), 3, "item cache still warm");

    h.clock.advance_secs(7 * 24 * 60 * 60);
    h.aggregator.aggregate("Deal-A").await.unwrap();
    assert_eq!(h.source.fetches(), 3);
    assert_eq!(h.classifier.total_calls(), 6, "items expired too");
}

#[tokio::test]
async fn test_source_changes_are_visible_only_after_expiry() {
    let h = harness(
        InMemoryRecordSource::new().with_deal("Deal-A", deal_a()),
        CountingClassifier::new(),
        FailurePolicy::Tolerant,
    );

    h.aggregator.aggregate("Deal-A").await.unwrap();
    h.source.put_deal("Deal-A", vec![record("zed@acme.io", "Zed", Some("CEO"))]);

    let stale = h.aggregator.aggregate("Deal-A").await.unwrap();
    assert_eq!(stale.summary.total_stakeholders, 3);

    h.clock.advance_secs(600);
    let fresh = h.aggregator.aggregate("Deal-A").await.unwrap();
    assert_eq!(fresh.summary.total_stakeholders, 1);
}

#[tokio::test]
async fn test_clearing_namespaces() {
    let h = harness(
        InMemoryRecordSource::new().with_deal("Deal-A", deal_a()),
        CountingClassifier::new(),
        FailurePolicy::Tolerant,
    );
    h.aggregator.aggregate("Deal-A").await.unwrap();

    let report = h.aggregator.clear_cache(CacheNamespace::Item, Some("VP  Engineering"));
    assert_eq!(report.entries_cleared, 1);
    assert_eq!(report.key.as_deref(), Some("title:vp engineering"));

    // The request entry still answers without touching the classifier.
    h.aggregator.aggregate("Deal-A").await.unwrap();
    assert_eq!(h.classifier.total_calls(), 3);

    let report = h.aggregator.clear_cache(CacheNamespace::Request, None);
    assert_eq!(report.entries_cleared, 1);

    h.aggregator.aggregate("Deal-A").await.unwrap();
    assert_eq!(h.source.fetches(), 2);
    assert_eq!(h.classifier.calls_for("vp engineering"), 2, "cleared key recomputed");
    assert_eq!(h.classifier.total_calls(), 4);
}

#[tokio::test]
async fn test_empty_and_untitled_deals_need_no_classifier() {
    let h = harness(
        InMemoryRecordSource::new().with_deal(
            "Deal-U",
            vec![
                record("a@x.co", "A", None),
                record("b@x.co", "B", Some("   ")),
            ],
        ),
        CountingClassifier::new(),
        FailurePolicy::Strict,
    );

    let untitled = h.aggregator.aggregate("Deal-U").await.unwrap();
    assert!(untitled
        .stakeholders
        .iter()
        .all(|s| s.verdict == StakeholderVerdict::Untitled));

    let empty = h.aggregator.aggregate("Deal-Nobody").await.unwrap();
    assert!(empty.stakeholders.is_empty());
    assert_eq!(h.classifier.total_calls(), 0);

    h.aggregator.aggregate("Deal-Nobody").await.unwrap();
    assert_eq!(h.source.fetches(), 2, "empty response is cached like any other");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_share_the_worker_budget() {
    let mut source = InMemoryRecordSource::new();
    for deal in 0..4 {
        let records = (0..8)
            .map(|i| {
                record(
                    &format!("p{i}@deal{deal}.io"),
                    &format!("Person {i}"),
                    Some(&format!("Title {deal}-{i}")),
                )
            })
            .collect();
        source = source.with_deal(&format!("Deal-{deal}"), records);
    }
    let h = harness_with(
        source,
        CountingClassifier::new().with_delay(Duration::from_millis(15)),
        FailurePolicy::Tolerant,
        3,
    );

    let runs = (0..4).map(|deal| {
        let aggregator = &h.aggregator;
        async move { aggregator.aggregate(&format!("Deal-{deal}")).await }
    });
    let results = futures::future::join_all(runs).await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(h.classifier.total_calls(), 32);
    assert!(
        h.classifier.peak_in_flight() <= 3,
        "peak {} exceeded the shared budget",
        h.classifier.peak_in_flight()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dropped_request_releases_its_permits() {
    let h = harness_with(
        InMemoryRecordSource::new().with_deal("Deal-A", deal_a()),
        CountingClassifier::new().with_delay(Duration::from_millis(200)),
        FailurePolicy::Tolerant,
        2,
    );

    let abandoned =
        tokio::time::timeout(Duration::from_millis(30), h.aggregator.aggregate("Deal-A")).await;
    assert!(abandoned.is_err(), "request should still be classifying");
    assert!(h.executor.available_permits() < 2, "classifier calls hold permits");

    let executor = h.executor.clone();
    assert!(
        wait_for(move || executor.available_permits() == 2, 3000).await,
        "permits were not returned after the request was dropped"
    );
    let stats = h.aggregator.cache_stats();
    assert_eq!(stats.namespaces[&CacheNamespace::Request].count, 0);

    let response = h.aggregator.aggregate("Deal-A").await.unwrap();
    assert!(response.is_complete());
    assert_eq!(response.summary.total_stakeholders, 3);
    assert_eq!(response.summary.decision_makers, 2);
    assert_eq!(h.executor.available_permits(), 2);
}
