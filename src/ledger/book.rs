//! The statistics ledger: successful/failed collections plus metadata.

use super::classifier::{Collection, PatternStatus, Thresholds};
use super::correlation::{keyword_key, CorrelationRecord};
use super::record::{Occurrence, StatRecord};
use crate::pattern::SignatureHash;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Schema version written to new store files
pub const LEDGER_VERSION: &str = "2.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LedgerMetadata {
    pub version: String,
    #[serde(alias = "createdAt")]
    pub created: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub total_trades: u64,
    pub total_wins: u64,
    pub total_losses: u64,
}

impl Default for LedgerMetadata {
    fn default() -> Self {
        Self::new(DateTime::<Utc>::default())
    }
}

impl LedgerMetadata {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            version: LEDGER_VERSION.to_string(),
            created: now,
            last_updated: now,
            total_trades: 0,
            total_wins: 0,
            total_losses: 0,
        }
    }
}

/// One outcome to fold into the ledger, already reduced and hashed
#[derive(Debug, Clone)]
pub struct PatternOutcome {
    pub hash: SignatureHash,
    pub signature_data: Map<String, Value>,
    pub is_win: bool,
    pub pnl: f64,
    pub pnl_percent: f64,
    pub hold_duration_ms: i64,
    pub timestamp: DateTime<Utc>,
    pub display_name: String,
}

/// What happened to a record during `record_outcome`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordUpdate {
    pub collection: Collection,
    /// Collection before the update; `None` for a brand-new record
    pub previous: Option<Collection>,
    pub samples: u64,
    pub win_rate: f64,
}

impl RecordUpdate {
    pub fn moved(&self) -> bool {
        matches!(self.previous, Some(prev) if prev != self.collection)
    }
}

/// Aggregate view returned by `get_stats`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerStats {
    pub total_patterns: usize,
    pub successful_patterns: usize,
    pub failed_patterns: usize,
    /// Records below the minimum sample size (in either collection)
    pub unproven_patterns: usize,
    pub news_correlations: usize,
    pub total_trades: u64,
    pub total_wins: u64,
    pub total_losses: u64,
    pub overall_win_rate: f64,
    pub created: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

/// Row returned by `top_patterns`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternSummary {
    pub hash: SignatureHash,
    pub display_name: String,
    pub status: PatternStatus,
    pub samples: u64,
    pub win_rate: f64,
    pub avg_pnl: f64,
    pub last_seen: DateTime<Utc>,
}

/// Persisted ledger. Field names match the on-disk JSON format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Ledger {
    pub successful_patterns: BTreeMap<SignatureHash, StatRecord>,
    pub failed_patterns: BTreeMap<SignatureHash, StatRecord>,
    pub news_correlations: BTreeMap<String, CorrelationRecord>,
    pub metadata: LedgerMetadata,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Ledger {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            successful_patterns: BTreeMap::new(),
            failed_patterns: BTreeMap::new(),
            news_correlations: BTreeMap::new(),
            metadata: LedgerMetadata::new(now),
        }
    }

    pub fn collection(&self, which: Collection) -> &BTreeMap<SignatureHash, StatRecord> {
        match which {
            Collection::Successful => &self.successful_patterns,
            Collection::Failed => &self.failed_patterns,
        }
    }

    fn collection_mut(&mut self, which: Collection) -> &mut BTreeMap<SignatureHash, StatRecord> {
        match which {
            Collection::Successful => &mut self.successful_patterns,
            Collection::Failed => &mut self.failed_patterns,
        }
    }

    /// Find a record, checking `successful` first.
    pub fn locate(&self, hash: &SignatureHash) -> Option<(Collection, &StatRecord)> {
        if let Some(rec) = self.successful_patterns.get(hash) {
            return Some((Collection::Successful, rec));
        }
        self.failed_patterns
            .get(hash)
            .map(|rec| (Collection::Failed, rec))
    }

    pub fn len(&self) -> usize {
        self.successful_patterns.len() + self.failed_patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fold one outcome into the ledger and reclassify the affected record.
    ///
    /// The record is removed from its home before the update and inserted
    /// into exactly one collection afterwards.
    pub fn record_outcome(&mut self, thresholds: &Thresholds, outcome: PatternOutcome) -> RecordUpdate {
        let PatternOutcome {
            hash,
            signature_data,
            is_win,
            pnl,
            pnl_percent,
            hold_duration_ms,
            timestamp,
            display_name,
        } = outcome;

        let (previous, mut record) = match self.successful_patterns.remove(&hash) {
            Some(rec) => (Some(Collection::Successful), rec),
            None => match self.failed_patterns.remove(&hash) {
                Some(rec) => (Some(Collection::Failed), rec),
                None => {
                    debug!(hash = hash.short(), name = %display_name, "new pattern signature");
                    (None, StatRecord::new(signature_data, display_name, timestamp))
                }
            },
        };

        record.apply(
            Occurrence {
                timestamp,
                pnl,
                pnl_percent,
                hold_duration_ms,
            },
            is_win,
        );

        // New signatures start in `successful` until evidence says otherwise.
        let home = previous.unwrap_or(Collection::Successful);
        let target = thresholds.target(&record, home);

        let update = RecordUpdate {
            collection: target,
            previous,
            samples: record.samples(),
            win_rate: record.win_rate,
        };

        if update.moved() {
            info!(
                hash = hash.short(),
                name = %record.display_name,
                from = home.as_str(),
                to = target.as_str(),
                win_rate = record.win_rate,
                samples = record.samples(),
                "pattern reclassified"
            );
        }

        self.collection_mut(target).insert(hash, record);

        self.metadata.total_trades += 1;
        if is_win {
            self.metadata.total_wins += 1;
        } else {
            self.metadata.total_losses += 1;
        }
        self.touch(timestamp);

        update
    }

    /// Update news keyword correlations for one trade.
    pub fn record_news(&mut self, keywords: &[String], is_win: bool, pnl: f64, at: DateTime<Utc>) {
        let mut keys: Vec<String> = keywords.iter().filter_map(|k| keyword_key(k)).collect();
        keys.sort();
        keys.dedup();

        for key in keys {
            self.news_correlations
                .entry(key.clone())
                .or_insert_with(|| CorrelationRecord::new(key, at))
                .apply(is_win, pnl, at);
        }
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        let now = Utc::now();
        self.metadata.last_updated = if at > now { at } else { now };
    }

    pub fn stats(&self, thresholds: &Thresholds) -> LedgerStats {
        let unproven = self
            .successful_patterns
            .values()
            .chain(self.failed_patterns.values())
            .filter(|r| !thresholds.is_significant(r))
            .count();

        let m = &self.metadata;
        let decided = m.total_wins + m.total_losses;
        let overall_win_rate = if decided == 0 {
            0.0
        } else {
            m.total_wins as f64 / decided as f64
        };

        LedgerStats {
            total_patterns: self.len(),
            successful_patterns: self.successful_patterns.len(),
            failed_patterns: self.failed_patterns.len(),
            unproven_patterns: unproven,
            news_correlations: self.news_correlations.len(),
            total_trades: m.total_trades,
            total_wins: m.total_wins,
            total_losses: m.total_losses,
            overall_win_rate,
            created: m.created,
            last_updated: m.last_updated,
        }
    }

    /// Sample-significant patterns ordered by win rate, best first.
    pub fn top_patterns(&self, thresholds: &Thresholds, limit: usize) -> Vec<PatternSummary> {
        let mut rows: Vec<PatternSummary> = [Collection::Successful, Collection::Failed]
            .into_iter()
            .flat_map(move |c| {
                self.collection(c)
                    .iter()
                    .map(move |(hash, rec)| (c, hash, rec))
            })
            .filter(|(_, _, rec)| thresholds.is_significant(rec))
            .map(|(c, hash, rec)| PatternSummary {
                hash: hash.clone(),
                display_name: rec.display_name.clone(),
                status: thresholds.status(rec, c),
                samples: rec.samples(),
                win_rate: rec.win_rate,
                avg_pnl: rec.avg_pnl,
                last_seen: rec.last_seen,
            })
            .collect();

        rows.sort_by(|a, b| {
            b.win_rate
                .total_cmp(&a.win_rate)
                .then(b.samples.cmp(&a.samples))
        });
        rows.truncate(limit);
        rows
    }

    /// Repair a ledger read from disk or imported from a caller.
    ///
    /// Fills defaults, recomputes derived fields and restores membership
    /// exclusivity. Returns the number of records that needed repair.
    pub fn backfill(&mut self, thresholds: &Thresholds) -> usize {
        let mut repaired = 0;

        if self.metadata.version.is_empty() {
            self.metadata.version = LEDGER_VERSION.to_string();
        }

        for rec in self
            .successful_patterns
            .values_mut()
            .chain(self.failed_patterns.values_mut())
        {
            rec.backfill();
        }
        for rec in self.news_correlations.values_mut() {
            rec.recompute();
        }

        // Files without a creation time fall back to the oldest record.
        let unset = DateTime::<Utc>::default();
        if self.metadata.created == unset {
            self.metadata.created = self
                .successful_patterns
                .values()
                .chain(self.failed_patterns.values())
                .map(|r| r.first_seen)
                .filter(|t| *t != unset)
                .min()
                .unwrap_or_else(Utc::now);
        }
        if self.metadata.last_updated < self.metadata.created {
            self.metadata.last_updated = self.metadata.created;
        }

        let duplicates: Vec<SignatureHash> = self
            .failed_patterns
            .keys()
            .filter(|h| self.successful_patterns.contains_key(*h))
            .cloned()
            .collect();

        for hash in duplicates {
            let (Some(succ), Some(fail)) = (
                self.successful_patterns.remove(&hash),
                self.failed_patterns.remove(&hash),
            ) else {
                continue;
            };
            // Keep the record with more evidence; place it by the classifier.
            let (home, keep) = if fail.samples() > succ.samples() {
                (Collection::Failed, fail)
            } else {
                (Collection::Successful, succ)
            };
            let target = thresholds.target(&keep, home);
            warn!(
                hash = hash.short(),
                kept = target.as_str(),
                "pattern present in both collections, repaired"
            );
            self.collection_mut(target).insert(hash, keep);
            repaired += 1;
        }

        repaired
    }
}
