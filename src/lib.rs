pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod ledger;
pub mod pattern;
pub mod persistence;
pub mod store;
pub mod worker;

pub use config::{AppConfig, LedgerConfig};
pub use domain::{Indicators, MarketSnapshot, OperatingMode, TradeOutcome};
pub use error::{LedgerError, Result};
pub use ledger::{
    Collection, Confidence, ConfidenceSource, Ledger, LedgerStats, PatternStatus, StatRecord,
    Thresholds,
};
pub use pattern::{PatternSignature, SignatureHash};
pub use persistence::{LedgerFile, StorePaths};
pub use store::{PatternStore, RecordReceipt};
pub use worker::{spawn_ingest_worker, IngestHandle, IngestSummary, LedgerCommand};
