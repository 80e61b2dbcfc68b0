//! Output formatting for `pattern-ledger` commands.
//!
//! Supports two modes: human-readable tables (default) and JSON (--json).

use crate::ledger::{LedgerStats, PatternSummary};
use serde::Serialize;
use tabled::{Table, Tabled};

/// Output mode for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Table,
    Json,
}

impl OutputMode {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputMode::Json
        } else {
            OutputMode::Table
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
pub struct PatternRow {
    pub pattern: String,
    pub hash: String,
    pub status: String,
    pub samples: u64,
    pub win_rate: String,
    pub avg_pnl: String,
    pub last_seen: String,
}

impl From<&PatternSummary> for PatternRow {
    fn from(p: &PatternSummary) -> Self {
        Self {
            pattern: p.display_name.clone(),
            hash: p.hash.short().to_string(),
            status: format!("{:?}", p.status).to_lowercase(),
            samples: p.samples,
            win_rate: format!("{:.1}%", p.win_rate * 100.0),
            avg_pnl: format!("{:+.4}", p.avg_pnl),
            last_seen: p.last_seen.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
pub struct StatRow {
    pub metric: &'static str,
    pub value: String,
}

pub fn stat_rows(stats: &LedgerStats) -> Vec<StatRow> {
    let row = |metric: &'static str, value: String| StatRow { metric, value };
    vec![
        row("patterns", stats.total_patterns.to_string()),
        row("successful", stats.successful_patterns.to_string()),
        row("failed", stats.failed_patterns.to_string()),
        row("unproven", stats.unproven_patterns.to_string()),
        row("news keywords", stats.news_correlations.to_string()),
        row("trades", stats.total_trades.to_string()),
        row("wins", stats.total_wins.to_string()),
        row("losses", stats.total_losses.to_string()),
        row(
            "win rate",
            format!("{:.1}%", stats.overall_win_rate * 100.0),
        ),
        row("created", stats.created.to_rfc3339()),
        row("last updated", stats.last_updated.to_rfc3339()),
    ]
}

/// Print a vec of Tabled + Serialize items in the chosen mode.
pub fn print_items<T: Tabled + Serialize>(items: &[T], mode: OutputMode) -> anyhow::Result<()> {
    match mode {
        OutputMode::Table => {
            if items.is_empty() {
                println!("(no results)");
            } else {
                let table = Table::new(items).to_string();
                println!("{table}");
            }
        }
        OutputMode::Json => {
            let json = serde_json::to_string_pretty(items)?;
            println!("{json}");
        }
    }
    Ok(())
}

/// Print a single Serialize item as pretty JSON.
pub fn print_item<T: Serialize>(item: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(item)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::PatternStatus;
    use crate::pattern::{PatternSignature, SignatureHash};
    use chrono::Utc;

    #[test]
    fn test_pattern_row_formatting() {
        let sig = PatternSignature::new(50, 1, "up", "none", false, 3);
        let summary = PatternSummary {
            hash: SignatureHash::of(&sig),
            display_name: sig.label(),
            status: PatternStatus::Successful,
            samples: 12,
            win_rate: 0.75,
            avg_pnl: 1.5,
            last_seen: Utc::now(),
        };
        let row = PatternRow::from(&summary);
        assert_eq!(row.win_rate, "75.0%");
        assert_eq!(row.avg_pnl, "+1.5000");
        assert_eq!(row.status, "successful");
        assert_eq!(row.hash.len(), 12);
    }
}
