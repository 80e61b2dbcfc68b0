//! Command implementations behind the `pattern-ledger` CLI.

use super::output::{self, OutputMode, PatternRow};
use crate::domain::{MarketSnapshot, TradeOutcome};
use crate::ledger::{self, MAX_PATTERN_AGE_DAYS_LIMIT};
use crate::store::PatternStore;
use crate::worker::spawn_ingest_worker;
use anyhow::{bail, Context};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

/// One line of input for `run`
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    Trade(TradeOutcome),
    Query(MarketSnapshot),
    Prune,
    Stats,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecordSummary {
    pub recorded: usize,
    pub skipped: usize,
}

/// Parse trades from a JSON array or JSON lines. Malformed lines are skipped.
pub fn parse_trades(raw: &str) -> anyhow::Result<Vec<TradeOutcome>> {
    let trimmed = raw.trim_start();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).context("invalid trade array");
    }

    let mut trades = Vec::new();
    for (i, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<TradeOutcome>(line) {
            Ok(t) => trades.push(t),
            Err(e) => warn!(line = i + 1, error = %e, "skipping malformed trade line"),
        }
    }
    Ok(trades)
}

pub fn record_trades(store: &PatternStore, trades: &[TradeOutcome]) -> RecordSummary {
    let mut summary = RecordSummary::default();
    for trade in trades {
        if store.record_outcome(trade).is_some() {
            summary.recorded += 1;
        } else {
            summary.skipped += 1;
        }
    }
    summary
}

pub fn run_record(store: &PatternStore, file: Option<&Path>) -> anyhow::Result<()> {
    let raw = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => std::io::read_to_string(std::io::stdin()).context("reading stdin")?,
    };

    let trades = parse_trades(&raw)?;
    let summary = record_trades(store, &trades);
    info!(
        recorded = summary.recorded,
        skipped = summary.skipped,
        "trade ingestion complete"
    );
    println!(
        "Recorded {} trade(s), skipped {}",
        summary.recorded, summary.skipped
    );
    Ok(())
}

pub fn run_query(store: &PatternStore, snapshot: &str, mode: OutputMode) -> anyhow::Result<()> {
    let snapshot: MarketSnapshot =
        serde_json::from_str(snapshot).context("snapshot must be a JSON object")?;

    let confidence = store.get_confidence(&snapshot);
    match (mode, confidence) {
        (OutputMode::Json, c) => output::print_item(&c)?,
        (OutputMode::Table, None) => println!("No learned opinion for this pattern"),
        (OutputMode::Table, Some(c)) => {
            println!(
                "confidence {:.3} ({:?}) - {} wins / {} losses, avg pnl {:+.4}",
                c.confidence, c.source, c.stats.wins, c.stats.losses, c.stats.avg_pnl
            );
        }
    }
    Ok(())
}

pub fn run_stats(store: &PatternStore, mode: OutputMode) -> anyhow::Result<()> {
    let stats = store.get_stats();
    match mode {
        OutputMode::Json => output::print_item(&stats),
        OutputMode::Table => output::print_items(&output::stat_rows(&stats), mode),
    }
}

pub fn run_top(store: &PatternStore, limit: usize, mode: OutputMode) -> anyhow::Result<()> {
    let rows: Vec<PatternRow> = store
        .top_patterns(limit)
        .iter()
        .map(PatternRow::from)
        .collect();
    output::print_items(&rows, mode)
}

pub fn run_prune(store: &PatternStore, max_age_days: Option<i64>) -> anyhow::Result<()> {
    let removed = match max_age_days {
        Some(days) => {
            let Some(max_age) = ledger::max_age_days(days) else {
                bail!("--max-age-days must be between 1 and {MAX_PATTERN_AGE_DAYS_LIMIT}");
            };
            store.prune_older_than(max_age, Utc::now()).patterns_removed
        }
        None => store.prune_old_patterns(),
    };
    println!("Pruned {removed} pattern(s)");
    Ok(())
}

pub fn run_export(store: &PatternStore, out: Option<&Path>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&store.export_json()?)?;
    match out {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            println!("Exported ledger to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

pub fn run_import(store: &PatternStore, path: &Path) -> anyhow::Result<()> {
    let raw =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let data: serde_json::Value = serde_json::from_str(&raw).context("import file is not JSON")?;
    store.import_json(data)?;
    let stats = store.get_stats();
    println!(
        "Imported {} pattern(s) ({} successful, {} failed)",
        stats.total_patterns, stats.successful_patterns, stats.failed_patterns
    );
    Ok(())
}

pub fn run_reset(store: &PatternStore, confirmed: bool) -> anyhow::Result<()> {
    if !confirmed {
        bail!("refusing to reset the {} ledger without --yes", store.mode());
    }
    store.reset();
    println!("Reset {} ledger", store.mode());
    Ok(())
}

/// Read events from stdin, ingesting trades through the single-writer worker.
///
/// Query and stats results are written to stdout as JSON lines.
pub async fn run_event_loop(
    store: Arc<PatternStore>,
    prune_interval: Option<std::time::Duration>,
) -> anyhow::Result<()> {
    let (handle, worker) = spawn_ingest_worker(store.clone(), prune_interval, 256);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received, draining ingest queue");
                None
            }
        };
        let Some(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let event: LedgerEvent = match serde_json::from_str(&line) {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "skipping malformed event");
                continue;
            }
        };

        match event {
            LedgerEvent::Trade(trade) => handle.record(trade).await?,
            LedgerEvent::Prune => handle.prune().await?,
            LedgerEvent::Query(snapshot) => {
                let result = store.get_confidence(&snapshot);
                println!(
                    "{}",
                    serde_json::json!({ "type": "confidence", "result": result })
                );
            }
            LedgerEvent::Stats => {
                println!(
                    "{}",
                    serde_json::json!({ "type": "stats", "result": store.get_stats() })
                );
            }
        }
    }

    drop(handle);
    let summary = worker.await?;
    info!(
        recorded = summary.recorded,
        skipped = summary.skipped,
        pruned = summary.pruned,
        "event loop finished"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;

    const TRADE: &str = r#"{"entry":{"indicators":{"rsi":55.0,"macd_histogram":0.2},"trend":"uptrend","timestamp":"2024-05-01T10:00:00Z"},"exit_timestamp":"2024-05-01T11:00:00Z","pnl":3.5,"pnl_percent":1.2,"hold_duration_ms":3600000}"#;

    #[test]
    fn test_parse_trades_json_lines_skips_garbage() {
        let raw = format!("{TRADE}\n\nnot json\n{TRADE}\n");
        let trades = parse_trades(&raw).unwrap();
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].pnl, 3.5);
    }

    #[test]
    fn test_parse_trades_array() {
        let raw = format!("[{TRADE},{TRADE},{TRADE}]");
        assert_eq!(parse_trades(&raw).unwrap().len(), 3);
        assert!(parse_trades("[{\"bad\":1}]").is_err());
    }

    #[test]
    fn test_record_trades_counts_skips() {
        let store = PatternStore::in_memory(&LedgerConfig::default());
        let mut trades = parse_trades(TRADE).unwrap();
        let mut bad = trades[0].clone();
        bad.entry.trend = None;
        trades.push(bad);
        let summary = record_trades(&store, &trades);
        assert_eq!(
            summary,
            RecordSummary {
                recorded: 1,
                skipped: 1
            }
        );
    }

    #[test]
    fn test_event_parsing() {
        let e: LedgerEvent = serde_json::from_str(r#"{"type":"prune"}"#).unwrap();
        assert!(matches!(e, LedgerEvent::Prune));
        let q: LedgerEvent =
            serde_json::from_str(r#"{"type":"query","trend":"up","indicators":{"rsi":40}}"#)
                .unwrap();
        assert!(matches!(q, LedgerEvent::Query(_)));
    }

    #[test]
    fn test_prune_rejects_out_of_range_age() {
        let store = PatternStore::in_memory(&LedgerConfig::default());
        assert!(run_prune(&store, Some(0)).is_err());
        assert!(run_prune(&store, Some(100_000_000)).is_err());
        assert!(run_prune(&store, Some(i64::MAX)).is_err());
        assert!(run_prune(&store, Some(30)).is_ok());
    }

    #[test]
    fn test_reset_requires_confirmation() {
        let store = PatternStore::in_memory(&LedgerConfig::default());
        assert!(run_reset(&store, false).is_err());
        assert!(run_reset(&store, true).is_ok());
    }
}
