//! Table output formatting for CLI commands
//!
//! Renders aggregation responses and cache reports with comfy-table.

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use std::env;

use crate::domain::models::{AggregationResponse, StakeholderVerdict};
use crate::services::{CacheStatsReport, ClearReport};

/// Table formatter for CLI output
pub struct TableFormatter {
    /// Whether to use colors in output
    use_colors: bool,
    /// Maximum width for tables (None = auto)
    max_width: Option<usize>,
}

impl TableFormatter {
    /// Create a new table formatter
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
            max_width: None,
        }
    }

    /// Create a new table formatter with custom settings
    pub fn with_config(use_colors: bool, max_width: Option<usize>) -> Self {
        Self {
            use_colors,
            max_width,
        }
    }

    /// Format one aggregation response: a heading, the stakeholder table and a summary line.
    pub fn format_response(&self, response: &AggregationResponse) -> String {
        let mut table = self.create_base_table();

        table.set_header(vec![
            Cell::new("Name").add_attribute(Attribute::Bold),
            Cell::new("Email").add_attribute(Attribute::Bold),
            Cell::new("Company").add_attribute(Attribute::Bold),
            Cell::new("Title").add_attribute(Attribute::Bold),
            Cell::new("Decision Maker").add_attribute(Attribute::Bold),
        ]);

        for entry in &response.stakeholders {
            let person = &entry.stakeholder;
            table.add_row(vec![
                Cell::new(truncate_text(person.name.as_deref().unwrap_or("-"), 30)),
                Cell::new(person.email.as_deref().unwrap_or("-")),
                Cell::new(truncate_text(person.company.as_deref().unwrap_or("-"), 24)),
                Cell::new(truncate_text(person.title.as_deref().unwrap_or("-"), 40)),
                self.verdict_cell(&entry.verdict),
            ]);
        }

        let summary = &response.summary;
        let mut out = format!(
            "Aggregation {} ({})\n",
            response.aggregation_id, response.request_key
        );
        if response.stakeholders.is_empty() {
            out.push_str("No stakeholders found.\n");
        } else {
            out.push_str(&table.to_string());
            out.push('\n');
        }
        out.push_str(&format!(
            "{} stakeholder{}, {} decision maker{}, {} unresolved, {} skipped record{} (generated {})",
            summary.total_stakeholders,
            plural(summary.total_stakeholders),
            summary.decision_makers,
            plural(summary.decision_makers),
            summary.unresolved,
            summary.skipped_records,
            plural(summary.skipped_records),
            response.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        ));
        out
    }

    /// Format per-namespace totals followed by per-entry ages.
    pub fn format_cache_stats(&self, report: &CacheStatsReport) -> String {
        let mut totals = self.create_base_table();
        totals.set_header(vec![
            Cell::new("Namespace").add_attribute(Attribute::Bold),
            Cell::new("Entries").add_attribute(Attribute::Bold),
            Cell::new("Live").add_attribute(Attribute::Bold),
            Cell::new("TTL (s)").add_attribute(Attribute::Bold),
            Cell::new("Capacity").add_attribute(Attribute::Bold),
        ]);

        let mut entries = self.create_base_table();
        entries.set_header(vec![
            Cell::new("Key").add_attribute(Attribute::Bold),
            Cell::new("Age (s)").add_attribute(Attribute::Bold),
            Cell::new("Remaining (s)").add_attribute(Attribute::Bold),
            Cell::new("State").add_attribute(Attribute::Bold),
        ]);
        let mut entry_count = 0;

        for (namespace, stats) in &report.namespaces {
            totals.add_row(vec![
                Cell::new(namespace.to_string()),
                Cell::new(stats.count),
                Cell::new(stats.live_count),
                Cell::new(stats.ttl_seconds),
                Cell::new(
                    stats
                        .max_entries
                        .map_or_else(|| "unbounded".to_string(), |n| n.to_string()),
                ),
            ]);

            for entry in &stats.entries {
                entry_count += 1;
                let state = if entry.expired { "expired" } else { "live" };
                let state_cell = if self.use_colors {
                    Cell::new(state).fg(if entry.expired { Color::DarkGrey } else { Color::Green })
                } else {
                    Cell::new(state)
                };
                entries.add_row(vec![
                    Cell::new(truncate_text(&entry.key, 50)),
                    Cell::new(entry.age_seconds),
                    Cell::new(entry.remaining_seconds),
                    state_cell,
                ]);
            }
        }

        if entry_count == 0 {
            format!("{totals}\nNo cached entries.")
        } else {
            format!("{totals}\n{entries}")
        }
    }

    pub fn format_clear(&self, report: &ClearReport) -> String {
        format!(
            "Cleared {} entr{} from the {} cache{}",
            report.entries_cleared,
            if report.entries_cleared == 1 { "y" } else { "ies" },
            report.namespace,
            report
                .key
                .as_deref()
                .map(|key| format!(" (key {key})"))
                .unwrap_or_default(),
        )
    }

    fn verdict_cell(&self, verdict: &StakeholderVerdict) -> Cell {
        let (label, color) = match verdict {
            StakeholderVerdict::Classified { result } if result.is_decision_maker => {
                ("yes", Color::Green)
            }
            StakeholderVerdict::Classified { .. } => ("no", Color::White),
            StakeholderVerdict::Unresolved { .. } => ("unresolved", Color::Red),
            StakeholderVerdict::Untitled => ("-", Color::DarkGrey),
        };
        if self.use_colors {
            Cell::new(label).fg(color)
        } else {
            Cell::new(label)
        }
    }

    /// Create a base table with common settings
    fn create_base_table(&self) -> Table {
        let mut table = Table::new();

        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        if let Some(width) = self.max_width {
            table.set_width(u16::try_from(width).unwrap_or(u16::MAX));
        }

        table
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// Check if color output is supported
fn supports_color() -> bool {
    if env::var("NO_COLOR").is_ok() {
        return false;
    }

    if let Ok(term) = env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    true
}

const fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

/// Truncate text to max characters with ellipsis
fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
