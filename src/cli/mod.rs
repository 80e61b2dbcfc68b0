//! pattern-ledger CLI
//!
//! Commands:
//! - `pattern-ledger record` - Ingest closed trades (JSON lines or array)
//! - `pattern-ledger query` - Confidence for a market snapshot
//! - `pattern-ledger stats` / `top` - Inspect the ledger
//! - `pattern-ledger prune` / `export` / `import` / `reset` - Maintenance
//! - `pattern-ledger run` - Long-running stdin event loop

pub mod commands;
pub mod output;

use crate::domain::OperatingMode;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pattern-ledger")]
#[command(author, version, about = "Statistically-gated pattern confidence store", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Operating mode; each mode learns into its own store file
    #[arg(short, long, global = true, env = "LEDGER_MODE")]
    pub mode: Option<OperatingMode>,

    /// Directory holding the per-mode store files
    #[arg(long, global = true, env = "LEDGER_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Config directory (default.toml + <LEDGER_ENV>.toml)
    #[arg(short, long, global = true, default_value = "config")]
    pub config: PathBuf,

    /// Disable all store writes for this invocation
    #[arg(long, global = true)]
    pub no_persist: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest closed trade outcomes
    Record {
        /// File with trades (JSON array or one JSON object per line); stdin if omitted
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Look up learned confidence for a market snapshot
    Query {
        /// Snapshot as inline JSON
        snapshot: String,
        #[arg(long)]
        json: bool,
    },
    /// Show ledger statistics
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// List sample-significant patterns by win rate
    Top {
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Remove patterns unseen for longer than the max age
    Prune {
        /// Override the configured max age in days
        #[arg(long)]
        max_age_days: Option<i64>,
    },
    /// Write the ledger as JSON
    Export {
        /// Output path; stdout if omitted
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Replace the ledger with an exported JSON file
    Import {
        path: PathBuf,
    },
    /// Forget everything learned in the selected mode
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
    /// Process trade/query events from stdin until EOF or Ctrl-C
    Run,
}
