//! Per-signature running statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::VecDeque;

/// Most recent occurrences kept per record (oldest dropped first).
pub const MAX_OCCURRENCES: usize = 20;

/// One closed trade that matched a signature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occurrence {
    pub timestamp: DateTime<Utc>,
    pub pnl: f64,
    #[serde(default)]
    pub pnl_percent: f64,
    #[serde(default, rename = "holdDuration")]
    pub hold_duration_ms: i64,
}

/// Win/loss statistics for a single signature hash.
///
/// Missing fields default on load so older store files keep working.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatRecord {
    /// Signature fields the hash was computed from
    pub pattern: Map<String, Value>,
    pub display_name: String,
    pub wins: u64,
    pub losses: u64,
    #[serde(rename = "totalPnL")]
    pub total_pnl: f64,
    #[serde(rename = "avgPnL")]
    pub avg_pnl: f64,
    pub best_trade: f64,
    pub worst_trade: f64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub occurrences: VecDeque<Occurrence>,
    pub win_rate: f64,
}

impl Default for StatRecord {
    fn default() -> Self {
        Self::new(Map::new(), String::new(), DateTime::<Utc>::default())
    }
}

impl StatRecord {
    /// Fresh record with zero counters.
    pub fn new(pattern: Map<String, Value>, display_name: String, seen_at: DateTime<Utc>) -> Self {
        Self {
            pattern,
            display_name,
            wins: 0,
            losses: 0,
            total_pnl: 0.0,
            avg_pnl: 0.0,
            best_trade: 0.0,
            worst_trade: 0.0,
            first_seen: seen_at,
            last_seen: seen_at,
            occurrences: VecDeque::with_capacity(MAX_OCCURRENCES),
            win_rate: 0.0,
        }
    }

    /// Total recorded outcomes.
    pub fn samples(&self) -> u64 {
        self.wins + self.losses
    }

    /// Fold one trade outcome into the record.
    ///
    /// Counters and derived fields are updated together so a record is never
    /// observable half-updated by holders of a shared reference.
    pub fn apply(&mut self, occurrence: Occurrence, is_win: bool) {
        let pnl = occurrence.pnl;

        if self.samples() == 0 {
            self.best_trade = pnl;
            self.worst_trade = pnl;
            self.first_seen = occurrence.timestamp;
        } else {
            self.best_trade = self.best_trade.max(pnl);
            self.worst_trade = self.worst_trade.min(pnl);
        }

        if is_win {
            self.wins += 1;
        } else {
            self.losses += 1;
        }
        self.total_pnl += pnl;

        if occurrence.timestamp > self.last_seen {
            self.last_seen = occurrence.timestamp;
        }
        if occurrence.timestamp < self.first_seen {
            self.first_seen = occurrence.timestamp;
        }

        self.occurrences.push_back(occurrence);
        while self.occurrences.len() > MAX_OCCURRENCES {
            self.occurrences.pop_front();
        }

        self.recompute();
    }

    /// Recompute `win_rate` and `avg_pnl` from the counters.
    pub fn recompute(&mut self) {
        let n = self.samples();
        if n == 0 {
            self.win_rate = 0.0;
            self.avg_pnl = 0.0;
        } else {
            self.win_rate = self.wins as f64 / n as f64;
            self.avg_pnl = self.total_pnl / n as f64;
        }
    }

    /// Repair a record read from disk: derived fields, occurrence cap, NaN PnL.
    pub fn backfill(&mut self) {
        for v in [
            &mut self.total_pnl,
            &mut self.best_trade,
            &mut self.worst_trade,
        ] {
            if !v.is_finite() {
                *v = 0.0;
            }
        }
        while self.occurrences.len() > MAX_OCCURRENCES {
            self.occurrences.pop_front();
        }
        if self.last_seen < self.first_seen {
            self.last_seen = self.first_seen;
        }
        self.recompute();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn occ(ts: DateTime<Utc>, pnl: f64) -> Occurrence {
        Occurrence {
            timestamp: ts,
            pnl,
            pnl_percent: pnl / 10.0,
            hold_duration_ms: 60_000,
        }
    }

    #[test]
    fn test_apply_updates_counters_and_derived_fields() {
        let t0 = Utc::now();
        let mut rec = StatRecord::new(Map::new(), "p".to_string(), t0);
        rec.apply(occ(t0, 10.0), true);
        rec.apply(occ(t0 + Duration::minutes(1), -4.0), false);
        rec.apply(occ(t0 + Duration::minutes(2), 6.0), true);

        assert_eq!(rec.wins, 2);
        assert_eq!(rec.losses, 1);
        assert!((rec.total_pnl - 12.0).abs() < 1e-12);
        assert!((rec.avg_pnl - 4.0).abs() < 1e-12);
        assert!((rec.win_rate - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(rec.best_trade, 10.0);
        assert_eq!(rec.worst_trade, -4.0);
        assert_eq!(rec.last_seen, t0 + Duration::minutes(2));
    }

    #[test]
    fn test_first_loss_sets_best_and_worst() {
        let t0 = Utc::now();
        let mut rec = StatRecord::new(Map::new(), String::new(), t0);
        rec.apply(occ(t0, -3.0), false);
        assert_eq!(rec.best_trade, -3.0);
        assert_eq!(rec.worst_trade, -3.0);
    }

    #[test]
    fn test_occurrences_capped_to_most_recent() {
        let t0 = Utc::now();
        let mut rec = StatRecord::new(Map::new(), String::new(), t0);
        for i in 0..25 {
            rec.apply(occ(t0 + Duration::seconds(i), i as f64), true);
        }
        assert_eq!(rec.occurrences.len(), MAX_OCCURRENCES);
        let pnls: Vec<f64> = rec.occurrences.iter().map(|o| o.pnl).collect();
        let expected: Vec<f64> = (5..25).map(|i| i as f64).collect();
        assert_eq!(pnls, expected);
        assert_eq!(rec.samples(), 25);
    }

    #[test]
    fn test_deserialize_backfills_missing_fields() {
        let mut rec: StatRecord = serde_json::from_str(r#"{"wins":3,"losses":1,"totalPnL":8.0}"#).unwrap();
        rec.backfill();
        assert_eq!(rec.win_rate, 0.75);
        assert_eq!(rec.avg_pnl, 2.0);
        assert!(rec.occurrences.is_empty());
    }

    #[test]
    fn test_serialized_field_names() {
        let rec = StatRecord::new(Map::new(), "x".to_string(), Utc::now());
        let v = serde_json::to_value(&rec).unwrap();
        for key in [
            "totalPnL",
            "avgPnL",
            "bestTrade",
            "worstTrade",
            "firstSeen",
            "lastSeen",
            "winRate",
            "displayName",
        ] {
            assert!(v.get(key).is_some(), "missing {key}");
        }
    }
}
