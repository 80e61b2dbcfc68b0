//! Read-only confidence lookup for live signals.

use super::book::Ledger;
use super::classifier::{Collection, Thresholds};
use super::record::StatRecord;
use crate::pattern::SignatureHash;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceSource {
    LearnedSuccess,
    LearnedFailure,
}

/// Snapshot of the matched record's statistics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceStats {
    pub wins: u64,
    pub losses: u64,
    pub win_rate: f64,
    pub avg_pnl: f64,
    pub total_pnl: f64,
    pub best_trade: f64,
    pub worst_trade: f64,
}

impl From<&StatRecord> for ConfidenceStats {
    fn from(rec: &StatRecord) -> Self {
        Self {
            wins: rec.wins,
            losses: rec.losses,
            win_rate: rec.win_rate,
            avg_pnl: rec.avg_pnl,
            total_pnl: rec.total_pnl,
            best_trade: rec.best_trade,
            worst_trade: rec.worst_trade,
        }
    }
}

/// Historical confidence for a signature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Confidence {
    /// Win rate for successful patterns; 0.0 is an explicit veto
    pub confidence: f64,
    pub source: ConfidenceSource,
    pub stats: ConfidenceStats,
}

impl Confidence {
    pub fn is_veto(&self) -> bool {
        self.source == ConfidenceSource::LearnedFailure
    }
}

/// Look up confidence for a hash. `None` means "not enough history".
pub fn confidence(ledger: &Ledger, thresholds: &Thresholds, hash: &SignatureHash) -> Option<Confidence> {
    let (home, record) = ledger.locate(hash)?;

    if !thresholds.is_significant(record) {
        return None;
    }

    let stats = ConfidenceStats::from(record);
    Some(match home {
        Collection::Successful => Confidence {
            confidence: record.win_rate,
            source: ConfidenceSource::LearnedSuccess,
            stats,
        },
        Collection::Failed => Confidence {
            confidence: 0.0,
            source: ConfidenceSource::LearnedFailure,
            stats,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::book::PatternOutcome;
    use crate::pattern::PatternSignature;
    use chrono::Utc;

    fn feed(ledger: &mut Ledger, sig: &PatternSignature, wins: usize, losses: usize) {
        let t = Thresholds::default();
        let results = std::iter::repeat(true)
            .take(wins)
            .chain(std::iter::repeat(false).take(losses));
        for is_win in results {
            ledger.record_outcome(
                &t,
                PatternOutcome {
                    hash: SignatureHash::of(sig),
                    signature_data: sig.to_fields(),
                    is_win,
                    pnl: if is_win { 2.0 } else { -1.0 },
                    pnl_percent: 0.0,
                    hold_duration_ms: 0,
                    timestamp: Utc::now(),
                    display_name: sig.label(),
                },
            );
        }
    }

    #[test]
    fn test_unknown_hash_has_no_opinion() {
        let ledger = Ledger::new(Utc::now());
        let sig = PatternSignature::new(50, 0, "flat", "none", false, 0);
        assert!(confidence(&ledger, &Thresholds::default(), &SignatureHash::of(&sig)).is_none());
    }

    #[test]
    fn test_sub_sample_match_has_no_opinion() {
        let mut ledger = Ledger::new(Utc::now());
        let sig = PatternSignature::new(50, 1, "up", "none", false, 1);
        feed(&mut ledger, &sig, 9, 0);
        assert!(confidence(&ledger, &Thresholds::default(), &SignatureHash::of(&sig)).is_none());
    }

    #[test]
    fn test_successful_pattern_reports_win_rate() {
        let mut ledger = Ledger::new(Utc::now());
        let sig = PatternSignature::new(50, 1, "up", "none", false, 1);
        feed(&mut ledger, &sig, 8, 2);
        let c = confidence(&ledger, &Thresholds::default(), &SignatureHash::of(&sig)).unwrap();
        assert_eq!(c.source, ConfidenceSource::LearnedSuccess);
        assert!((c.confidence - 0.8).abs() < 1e-12);
        assert_eq!(c.stats.wins, 8);
        assert!(!c.is_veto());
    }

    #[test]
    fn test_failed_pattern_is_a_veto() {
        let mut ledger = Ledger::new(Utc::now());
        let sig = PatternSignature::new(20, -1, "down", "none", true, 5);
        feed(&mut ledger, &sig, 2, 8);
        let c = confidence(&ledger, &Thresholds::default(), &SignatureHash::of(&sig)).unwrap();
        assert_eq!(c.source, ConfidenceSource::LearnedFailure);
        assert_eq!(c.confidence, 0.0);
        assert!(c.is_veto());
        assert!((c.stats.win_rate - 0.2).abs() < 1e-12);
    }
}
