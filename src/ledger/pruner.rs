//! Idle-age eviction for ledger entries.

use super::book::Ledger;
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

/// Default idle age after which a pattern is dropped
pub const DEFAULT_MAX_PATTERN_AGE_DAYS: i64 = 90;
/// Largest accepted max age (100 years)
pub const MAX_PATTERN_AGE_DAYS_LIMIT: i64 = 36_500;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub patterns_removed: usize,
    pub correlations_removed: usize,
}

impl PruneReport {
    pub fn is_empty(&self) -> bool {
        self.patterns_removed == 0 && self.correlations_removed == 0
    }
}

/// Max age in days as a duration, `None` when out of range.
pub fn max_age_days(days: i64) -> Option<Duration> {
    if days <= 0 || days > MAX_PATTERN_AGE_DAYS_LIMIT {
        return None;
    }
    Duration::try_days(days)
}

/// Remove every entry whose `last_seen` is strictly older than `now - max_age`.
///
/// A cutoff before the representable range removes nothing.
pub fn prune(ledger: &mut Ledger, max_age: Duration, now: DateTime<Utc>) -> PruneReport {
    let Some(cutoff) = now.checked_sub_signed(max_age) else {
        debug!(?max_age, "prune cutoff out of range, nothing to remove");
        return PruneReport::default();
    };
    let before = ledger.len();
    let correlations_before = ledger.news_correlations.len();

    ledger.successful_patterns.retain(|hash, rec| {
        let keep = rec.last_seen >= cutoff;
        if !keep {
            debug!(hash = hash.short(), last_seen = %rec.last_seen, "pruning idle successful pattern");
        }
        keep
    });
    ledger.failed_patterns.retain(|hash, rec| {
        let keep = rec.last_seen >= cutoff;
        if !keep {
            debug!(hash = hash.short(), last_seen = %rec.last_seen, "pruning idle failed pattern");
        }
        keep
    });
    ledger
        .news_correlations
        .retain(|_, rec| rec.last_seen >= cutoff);

    PruneReport {
        patterns_removed: before - ledger.len(),
        correlations_removed: correlations_before - ledger.news_correlations.len(),
    }
}
