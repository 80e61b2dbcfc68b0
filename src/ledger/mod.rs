//! Statistics ledger, classifier, confidence oracle and pruner.
//!
//! Everything here operates on an owned `Ledger` value; locking and
//! persistence live in `crate::store`.

pub mod book;
pub mod classifier;
pub mod correlation;
pub mod oracle;
pub mod pruner;
pub mod record;

pub use book::{
    Ledger, LedgerMetadata, LedgerStats, PatternOutcome, PatternSummary, RecordUpdate,
    LEDGER_VERSION,
};
pub use classifier::{Collection, PatternStatus, Thresholds};
pub use correlation::CorrelationRecord;
pub use oracle::{Confidence, ConfidenceSource, ConfidenceStats};
pub use pruner::{
    max_age_days, PruneReport, DEFAULT_MAX_PATTERN_AGE_DAYS, MAX_PATTERN_AGE_DAYS_LIMIT,
};
pub use record::{Occurrence, StatRecord, MAX_OCCURRENCES};
