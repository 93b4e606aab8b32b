use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;

use crate::cli::commands::build_aggregator;
use crate::cli::output::TableFormatter;
use crate::cli::types::AggregateArgs;
use crate::domain::models::{AggregationResponse, Config};
use crate::services::{CacheStatsReport, StakeholderAggregator};

#[derive(Serialize)]
struct AggregateReport<'a> {
    responses: Vec<&'a AggregationResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache_stats: Option<CacheStatsReport>,
}

/// Handle `dealsense aggregate <ID>...`
pub async fn execute(args: AggregateArgs, config: &Config, json: bool) -> Result<()> {
    let aggregator = build_aggregator(config, &args.runtime);
    let responses = run_all(&aggregator, &args.ids).await?;
    let cache_stats = args.stats.then(|| aggregator.cache_stats());

    if json {
        let report = AggregateReport {
            responses: responses.iter().map(AsRef::as_ref).collect(),
            cache_stats,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let formatter = TableFormatter::new();
        for response in &responses {
            println!("{}\n", formatter.format_response(response));
        }
        if let Some(stats) = cache_stats {
            println!("Cache:");
            println!("{}", formatter.format_cache_stats(&stats));
        }
    }

    Ok(())
}

/// Aggregate each id in order against the same caches.
pub async fn run_all(
    aggregator: &StakeholderAggregator,
    ids: &[String],
) -> Result<Vec<Arc<AggregationResponse>>> {
    let mut responses = Vec::with_capacity(ids.len());
    for id in ids {
        let response = aggregator
            .aggregate(id)
            .await
            .with_context(|| format!("Failed to aggregate '{id}'"))?;
        responses.push(response);
    }
    Ok(responses)
}
