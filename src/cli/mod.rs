//! Command-line interface
//!
//! A thin surface over [`StakeholderAggregator`](crate::services::StakeholderAggregator):
//! clap definitions in [`types`], handlers in [`commands`], formatters in [`output`].

pub mod commands;
pub mod output;
pub mod types;

pub use types::{AggregateArgs, BatchArgs, Cli, Commands, RuntimeArgs};

/// Print an error chain and exit with a non-zero status.
pub fn handle_error(err: anyhow::Error, json: bool) -> ! {
    if json {
        let causes: Vec<String> = err.chain().skip(1).map(ToString::to_string).collect();
        let body = serde_json::json!({
            "error": err.to_string(),
            "causes": causes,
        });
        eprintln!("{body}");
    } else {
        eprintln!("Error: {err}");
        for cause in err.chain().skip(1) {
            eprintln!("  caused by: {cause}");
        }
    }
    std::process::exit(1);
}
