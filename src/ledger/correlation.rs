//! News keyword correlation with trade outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome statistics for trades entered while a news keyword was active
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CorrelationRecord {
    pub keyword: String,
    pub occurrences: u64,
    pub wins: u64,
    pub losses: u64,
    #[serde(rename = "totalPnL")]
    pub total_pnl: f64,
    #[serde(rename = "avgPnL")]
    pub avg_pnl: f64,
    pub win_rate: f64,
    pub last_seen: DateTime<Utc>,
}

impl Default for CorrelationRecord {
    fn default() -> Self {
        Self::new(String::new(), DateTime::<Utc>::default())
    }
}

impl CorrelationRecord {
    pub fn new(keyword: String, seen_at: DateTime<Utc>) -> Self {
        Self {
            keyword,
            occurrences: 0,
            wins: 0,
            losses: 0,
            total_pnl: 0.0,
            avg_pnl: 0.0,
            win_rate: 0.0,
            last_seen: seen_at,
        }
    }

    pub fn apply(&mut self, is_win: bool, pnl: f64, at: DateTime<Utc>) {
        self.occurrences += 1;
        if is_win {
            self.wins += 1;
        } else {
            self.losses += 1;
        }
        self.total_pnl += pnl;
        if at > self.last_seen {
            self.last_seen = at;
        }
        self.recompute();
    }

    pub fn recompute(&mut self) {
        let n = self.wins + self.losses;
        self.occurrences = self.occurrences.max(n);
        if n == 0 {
            self.win_rate = 0.0;
            self.avg_pnl = 0.0;
        } else {
            self.win_rate = self.wins as f64 / n as f64;
            self.avg_pnl = self.total_pnl / n as f64;
        }
    }
}

/// Normalize a keyword into its ledger key. Empty keywords are ignored.
pub fn keyword_key(keyword: &str) -> Option<String> {
    let key = keyword.trim().to_lowercase();
    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}
