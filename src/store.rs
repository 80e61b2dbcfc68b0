//! Pattern Store
//!
//! Owned composition of ledger, classifier thresholds and persistence. One
//! instance per operating mode, constructed explicitly and shared by
//! reference between the ingestion path and the decision engine.
//!
//! Mutations are serialized through a writer gate that also covers the disk
//! write, so a write always completes (or fails loudly) before the next
//! mutation starts. Lookups only take the ledger read lock and never wait on
//! disk I/O.

use crate::config::LedgerConfig;
use crate::domain::{MarketSnapshot, OperatingMode, TradeOutcome};
use crate::error::{LedgerError, Result};
use crate::ledger::correlation::keyword_key;
use crate::ledger::{
    oracle, pruner, Confidence, CorrelationRecord, Ledger, LedgerStats, PatternOutcome,
    PatternSummary, PruneReport, RecordUpdate, StatRecord, Thresholds,
};
use crate::pattern::{reduce, SignatureHash};
use crate::persistence::{LedgerFile, StorePaths};
use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError, RwLock};
use tracing::{debug, error, info, warn};

/// Result of ingesting one trade
#[derive(Debug, Clone, PartialEq)]
pub struct RecordReceipt {
    pub hash: SignatureHash,
    pub label: String,
    pub update: RecordUpdate,
    /// Whether the store file was written
    pub persisted: bool,
}

pub struct PatternStore {
    mode: OperatingMode,
    thresholds: Thresholds,
    max_pattern_age: Duration,
    ledger: RwLock<Ledger>,
    writer: Mutex<LedgerFile>,
}

impl PatternStore {
    /// Open the store for the configured mode, loading any existing file.
    pub fn open(config: &LedgerConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|errors| LedgerError::Validation(errors.join("; ")))?;

        let file = LedgerFile::new(config.store_paths(), config.persistence_active());
        let thresholds = config.thresholds();
        let ledger = file.load(&thresholds);

        info!(
            mode = %config.mode,
            path = %file.paths().store.display(),
            persistence = file.is_enabled(),
            patterns = ledger.len(),
            "pattern store opened"
        );

        Ok(Self::from_parts(config, ledger, file))
    }

    /// Store that never touches disk, starting from an empty ledger.
    pub fn in_memory(config: &LedgerConfig) -> Self {
        let file = LedgerFile::disabled(config.store_paths());
        Self::from_parts(config, Ledger::new(Utc::now()), file)
    }

    fn from_parts(config: &LedgerConfig, ledger: Ledger, file: LedgerFile) -> Self {
        Self {
            mode: config.mode,
            thresholds: config.thresholds(),
            max_pattern_age: config.max_pattern_age(),
            ledger: RwLock::new(ledger),
            writer: Mutex::new(file),
        }
    }

    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn paths(&self) -> StorePaths {
        self.writer().paths().clone()
    }

    pub fn is_persistent(&self) -> bool {
        self.writer().is_enabled()
    }

    fn writer(&self) -> std::sync::MutexGuard<'_, LedgerFile> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Ledger> {
        self.ledger.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run one mutation under the writer gate and persist if it changed anything.
    ///
    /// Returns the closure's result and whether the store file was written.
    fn mutate<R>(&self, f: impl FnOnce(&mut Ledger) -> (R, bool)) -> (R, bool) {
        let file = self.writer();

        let (result, bytes) = {
            let mut ledger = self.ledger.write().unwrap_or_else(PoisonError::into_inner);
            let (result, dirty) = f(&mut ledger);
            let bytes = (dirty && file.is_enabled()).then(|| serde_json::to_vec_pretty(&*ledger));
            (result, bytes)
        };

        let persisted = match bytes {
            None => false,
            Some(Err(e)) => {
                error!(error = %e, "failed to serialize pattern ledger");
                false
            }
            Some(Ok(bytes)) => match file.write_bytes(&bytes) {
                Ok(written) => written,
                Err(e) => {
                    error!(error = %e, "pattern store write failed; in-memory ledger remains authoritative");
                    false
                }
            },
        };

        (result, persisted)
    }

    /// Ingest one closed trade.
    ///
    /// Returns `None` when the entry snapshot cannot be reduced to a pattern;
    /// the trade is dropped with a warning.
    pub fn record_outcome(&self, trade: &TradeOutcome) -> Option<RecordReceipt> {
        if !trade.pnl.is_finite() {
            warn!(pnl = trade.pnl, "trade has non-finite pnl, skipping");
            return None;
        }

        let reduced = reduce(&trade.entry, trade.exit_timestamp)?;
        let hash = SignatureHash::of(&reduced.signature);
        let is_win = trade.is_win();

        let outcome = PatternOutcome {
            hash: hash.clone(),
            signature_data: reduced.signature.to_fields(),
            is_win,
            pnl: trade.pnl,
            pnl_percent: trade.pnl_percent,
            hold_duration_ms: trade.hold_duration_ms,
            timestamp: trade.exit_timestamp,
            display_name: reduced.label.clone(),
        };

        let thresholds = self.thresholds;
        let (update, persisted) = self.mutate(|ledger| {
            let update = ledger.record_outcome(&thresholds, outcome);
            ledger.record_news(&trade.news_keywords, is_win, trade.pnl, trade.exit_timestamp);
            (update, true)
        });

        debug!(
            hash = hash.short(),
            label = %reduced.label,
            is_win,
            pnl = trade.pnl,
            collection = update.collection.as_str(),
            samples = update.samples,
            "trade outcome recorded"
        );

        Some(RecordReceipt {
            hash,
            label: reduced.label,
            update,
            persisted,
        })
    }

    /// Fold an already hashed outcome into the ledger.
    pub fn record(&self, outcome: PatternOutcome) -> RecordUpdate {
        let thresholds = self.thresholds;
        let (update, _) = self.mutate(|ledger| (ledger.record_outcome(&thresholds, outcome), true));
        update
    }

    /// Confidence for a live snapshot. `None` means no opinion.
    pub fn get_confidence(&self, snapshot: &MarketSnapshot) -> Option<Confidence> {
        let reduced = reduce(snapshot, Utc::now())?;
        self.confidence_for_hash(&SignatureHash::of(&reduced.signature))
    }

    /// Confidence for raw signature data (any key order).
    pub fn confidence_for(&self, signature_data: &Map<String, Value>) -> Option<Confidence> {
        self.confidence_for_hash(&SignatureHash::of_fields(signature_data))
    }

    pub fn confidence_for_hash(&self, hash: &SignatureHash) -> Option<Confidence> {
        oracle::confidence(&self.read(), &self.thresholds, hash)
    }

    /// Drop patterns idle longer than the configured age. Returns patterns removed.
    pub fn prune_old_patterns(&self) -> usize {
        self.prune_older_than(self.max_pattern_age, Utc::now())
            .patterns_removed
    }

    pub fn prune_older_than(&self, max_age: Duration, now: DateTime<Utc>) -> PruneReport {
        let (report, persisted) = self.mutate(|ledger| {
            let report = pruner::prune(ledger, max_age, now);
            (report, !report.is_empty())
        });

        if report.is_empty() {
            debug!("prune found nothing to remove");
        } else {
            info!(
                patterns = report.patterns_removed,
                correlations = report.correlations_removed,
                persisted,
                "pruned idle patterns"
            );
        }
        report
    }

    /// Deep copy of the current ledger
    pub fn export_ledger(&self) -> Ledger {
        self.read().clone()
    }

    pub fn export_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(&*self.read())?)
    }

    /// Replace the ledger wholesale.
    ///
    /// Keys must be full signature hashes and are stored lower-cased. Derived
    /// fields and membership are repaired before the ledger is installed.
    pub fn import_ledger(&self, mut imported: Ledger) -> Result<()> {
        imported.successful_patterns =
            canonical_keys(std::mem::take(&mut imported.successful_patterns))?;
        imported.failed_patterns = canonical_keys(std::mem::take(&mut imported.failed_patterns))?;
        let repaired = imported.backfill(&self.thresholds);
        let patterns = imported.len();

        let (_, persisted) = self.mutate(|ledger| {
            *ledger = imported;
            ((), true)
        });

        info!(patterns, repaired, persisted, "pattern ledger imported");
        Ok(())
    }

    pub fn import_json(&self, data: Value) -> Result<()> {
        let ledger: Ledger = serde_json::from_value(data)
            .map_err(|e| LedgerError::Validation(format!("invalid ledger payload: {e}")))?;
        self.import_ledger(ledger)
    }

    pub fn get_stats(&self) -> LedgerStats {
        self.read().stats(&self.thresholds)
    }

    pub fn top_patterns(&self, limit: usize) -> Vec<PatternSummary> {
        self.read().top_patterns(&self.thresholds, limit)
    }

    pub fn news_correlation(&self, keyword: &str) -> Option<CorrelationRecord> {
        let key = keyword_key(keyword)?;
        self.read().news_correlations.get(&key).cloned()
    }

    /// Forget everything learned in this mode.
    pub fn reset(&self) {
        let (_, persisted) = self.mutate(|ledger| {
            *ledger = Ledger::new(Utc::now());
            ((), true)
        });
        warn!(mode = %self.mode, persisted, "pattern ledger reset");
    }

    /// Write the current ledger regardless of pending changes.
    pub fn flush(&self) -> bool {
        let (_, persisted) = self.mutate(|_| ((), true));
        persisted
    }
}

/// Re-key a collection by parsed (lower-case) hashes.
fn canonical_keys(
    records: BTreeMap<SignatureHash, StatRecord>,
) -> Result<BTreeMap<SignatureHash, StatRecord>> {
    let mut out = BTreeMap::new();
    for (key, record) in records {
        let hash = SignatureHash::parse(key.as_str())?;
        if out.insert(hash, record).is_some() {
            return Err(LedgerError::Validation(format!(
                "duplicate signature hash after normalization: {key}"
            )));
        }
    }
    Ok(out)
}
