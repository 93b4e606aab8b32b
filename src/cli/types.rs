//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dealsense")]
#[command(about = "Dealsense - cached stakeholder aggregation and decision-maker classification", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Load configuration from this file instead of .dealsense/config.yaml
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Aggregate the stakeholders of one or more aggregations, in order
    Aggregate(AggregateArgs),

    /// Read `aggregate <id>`, `stats` and `clear <request|item> [key]` lines from stdin
    Batch(BatchArgs),
}

#[derive(Args)]
pub struct AggregateArgs {
    /// Aggregation ids (deal or account identifiers)
    #[arg(required = true)]
    pub ids: Vec<String>,

    /// Print cache statistics after the last aggregation
    #[arg(long)]
    pub stats: bool,

    #[command(flatten)]
    pub runtime: RuntimeArgs,
}

#[derive(Args)]
pub struct BatchArgs {
    #[command(flatten)]
    pub runtime: RuntimeArgs,
}

/// Overrides applied on top of the loaded configuration.
#[derive(Args, Clone, Default)]
pub struct RuntimeArgs {
    /// Fail the whole aggregation when any title cannot be classified
    #[arg(long)]
    pub strict: bool,

    /// Simulated classifier latency per call, in milliseconds
    #[arg(long, value_name = "MS")]
    pub classifier_latency_ms: Option<u64>,
}
