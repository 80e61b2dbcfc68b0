//! Threshold classifier deciding ledger membership.
//!
//! A record is only classified once it has `min_sample_size` outcomes. Between
//! the failure and success thresholds it stays where it is (hysteresis band).

use super::record::StatRecord;
use serde::{Deserialize, Serialize};

/// Default minimum outcomes before a signature is classified
pub const DEFAULT_MIN_SAMPLE_SIZE: u64 = 10;
/// Default win rate at or above which a signature is successful
pub const DEFAULT_SUCCESS_THRESHOLD: f64 = 0.65;
/// Default win rate below which a signature is failed
pub const DEFAULT_FAILURE_THRESHOLD: f64 = 0.35;

/// Which of the two ledger collections a record lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Successful,
    Failed,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Successful => "successful",
            Collection::Failed => "failed",
        }
    }
}

/// Diagnostic view of a record's standing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternStatus {
    /// Below the minimum sample size, regardless of collection
    Unproven,
    Successful,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub min_sample_size: u64,
    pub success_threshold: f64,
    pub failure_threshold: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_sample_size: DEFAULT_MIN_SAMPLE_SIZE,
            success_threshold: DEFAULT_SUCCESS_THRESHOLD,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
        }
    }
}

impl Thresholds {
    pub fn is_significant(&self, record: &StatRecord) -> bool {
        record.samples() >= self.min_sample_size
    }

    /// Collection the record belongs in, given where it lives now.
    pub fn target(&self, record: &StatRecord, current: Collection) -> Collection {
        if !self.is_significant(record) {
            return current;
        }
        if record.win_rate >= self.success_threshold {
            Collection::Successful
        } else if record.win_rate < self.failure_threshold {
            Collection::Failed
        } else {
            current
        }
    }

    pub fn status(&self, record: &StatRecord, home: Collection) -> PatternStatus {
        if !self.is_significant(record) {
            return PatternStatus::Unproven;
        }
        match home {
            Collection::Successful => PatternStatus::Successful,
            Collection::Failed => PatternStatus::Failed,
        }
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.min_sample_size == 0 {
            errors.push("min_trades_sample must be at least 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.success_threshold) {
            errors.push("success_threshold must be between 0 and 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.failure_threshold) {
            errors.push("failure_threshold must be between 0 and 1".to_string());
        }
        if self.failure_threshold > self.success_threshold {
            errors.push("failure_threshold must not exceed success_threshold".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
