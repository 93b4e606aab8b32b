//! Line-oriented command mode.
//!
//! Every line on stdin is one command against a single long-lived aggregator,
//! so request and item caching carry across lines:
//!
//! ```text
//! aggregate Deal-A
//! stats
//! clear item vp engineering
//! clear request
//! ```
//!
//! Blank lines and lines starting with `#` are ignored. A failing line is
//! reported and the batch carries on; the process still exits non-zero once
//! stdin is exhausted.

use anyhow::{bail, Context, Result};
use serde_json::json;
use std::io::Write;
use std::str::FromStr;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::warn;

use crate::cli::commands::build_aggregator;
use crate::cli::output::TableFormatter;
use crate::cli::types::BatchArgs;
use crate::domain::models::Config;
use crate::services::{CacheNamespace, StakeholderAggregator};

/// One parsed stdin line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchCommand {
    Aggregate(String),
    Stats,
    Clear {
        namespace: CacheNamespace,
        key: Option<String>,
    },
}

impl BatchCommand {
    const fn name(&self) -> &'static str {
        match self {
            Self::Aggregate(_) => "aggregate",
            Self::Stats => "stats",
            Self::Clear { .. } => "clear",
        }
    }
}

fn split_word(text: &str) -> (&str, &str) {
    text.split_once(char::is_whitespace)
        .map_or((text, ""), |(word, rest)| (word, rest.trim()))
}

impl FromStr for BatchCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let (verb, rest) = split_word(line.trim());
        match verb.to_lowercase().as_str() {
            "aggregate" if rest.is_empty() => Err("usage: aggregate <id>".to_string()),
            "aggregate" => Ok(Self::Aggregate(rest.to_string())),
            "stats" => Ok(Self::Stats),
            "clear" => {
                let (namespace, key) = split_word(rest);
                if namespace.is_empty() {
                    return Err("usage: clear <request|item> [key]".to_string());
                }
                Ok(Self::Clear {
                    namespace: namespace.parse()?,
                    key: (!key.is_empty()).then(|| key.to_string()),
                })
            }
            other => Err(format!("unknown command '{other}'")),
        }
    }
}

/// Counts reported once stdin is exhausted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub commands: usize,
    pub failures: usize,
}

impl BatchSummary {
    /// Fail when any line failed, so the exit status reflects the batch.
    pub fn ensure_success(self) -> Result<()> {
        if self.failures > 0 {
            bail!("{} of {} batch commands failed", self.failures, self.commands);
        }
        Ok(())
    }
}

/// Handle `dealsense batch`
pub async fn execute(args: BatchArgs, config: &Config, json: bool) -> Result<()> {
    let aggregator = build_aggregator(config, &args.runtime);
    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();

    let summary = run_batch(&aggregator, stdin, &mut stdout, json).await?;
    if summary.failures > 0 {
        warn!(
            commands = summary.commands,
            failures = summary.failures,
            "batch finished with failures"
        );
    }
    summary.ensure_success()
}

/// Execute every command read from `input`, writing results to `out`.
///
/// With `json` each result is one compact JSON document per line.
pub async fn run_batch<R, W>(
    aggregator: &StakeholderAggregator,
    input: R,
    out: &mut W,
    json: bool,
) -> Result<BatchSummary>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let formatter = TableFormatter::new();
    let mut summary = BatchSummary::default();
    let mut lines = input.lines();

    while let Some(line) = lines.next_line().await.context("Failed to read batch input")? {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        summary.commands += 1;

        let command = match line.parse::<BatchCommand>() {
            Ok(command) => command,
            Err(reason) => {
                summary.failures += 1;
                write_error(out, json, "parse", &reason)?;
                continue;
            }
        };

        match &command {
            BatchCommand::Aggregate(id) => match aggregator.aggregate(id).await {
                Ok(response) => {
                    if json {
                        let doc = json!({ "command": "aggregate", "response": response.as_ref() });
                        writeln!(out, "{doc}")?;
                    } else {
                        writeln!(out, "{}\n", formatter.format_response(&response))?;
                    }
                }
                Err(err) => {
                    summary.failures += 1;
                    write_error(out, json, command.name(), &err.to_string())?;
                }
            },
            BatchCommand::Stats => {
                let stats = aggregator.cache_stats();
                if json {
                    writeln!(out, "{}", json!({ "command": "stats", "cache_stats": stats }))?;
                } else {
                    writeln!(out, "{}\n", formatter.format_cache_stats(&stats))?;
                }
            }
            BatchCommand::Clear { namespace, key } => {
                let report = aggregator.clear_cache(*namespace, key.as_deref());
                if json {
                    writeln!(out, "{}", json!({ "command": "clear", "cleared": report }))?;
                } else {
                    writeln!(out, "{}", formatter.format_clear(&report))?;
                }
            }
        }
    }

    out.flush()?;
    Ok(summary)
}

fn write_error<W: Write>(out: &mut W, json: bool, command: &str, reason: &str) -> Result<()> {
    if json {
        writeln!(out, "{}", json!({ "command": command, "error": reason }))?;
    } else {
        writeln!(out, "{command} failed: {reason}")?;
    }
    Ok(())
}
