//! Reduces a market snapshot into a coarse, discrete pattern signature.
//!
//! Continuous indicators are bucketed so nearby market states collide into the
//! same signature. That collision is what lets learned statistics generalize
//! across similar (not identical) conditions.

use crate::domain::MarketSnapshot;
use crate::error::{LedgerError, Result};
use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use tracing::warn;

/// RSI is rounded to the nearest multiple of this width.
pub const RSI_BUCKET_WIDTH: f64 = 10.0;

/// Volatility above this fraction marks the signature as high-volatility.
pub const HIGH_VOLATILITY_THRESHOLD: f64 = 0.02;

/// Placeholder used when no chart pattern was detected.
pub const NO_PATTERN: &str = "none";

/// Discretized, hashable summary of market context.
///
/// Fields are private: a signature is never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternSignature {
    rsi_bucket: i32,
    macd_direction: i8,
    trend: String,
    primary_pattern: String,
    volatility_high: bool,
    hour: u8,
}

impl PatternSignature {
    pub fn new(
        rsi_bucket: i32,
        macd_direction: i8,
        trend: &str,
        primary_pattern: &str,
        volatility_high: bool,
        hour: u8,
    ) -> Self {
        Self {
            rsi_bucket,
            macd_direction: macd_direction.signum(),
            trend: trend.trim().to_lowercase(),
            primary_pattern: primary_pattern.trim().to_lowercase(),
            volatility_high,
            hour: hour % 24,
        }
    }

    pub fn rsi_bucket(&self) -> i32 {
        self.rsi_bucket
    }

    pub fn macd_direction(&self) -> i8 {
        self.macd_direction
    }

    pub fn trend(&self) -> &str {
        &self.trend
    }

    pub fn primary_pattern(&self) -> &str {
        &self.primary_pattern
    }

    pub fn volatility_high(&self) -> bool {
        self.volatility_high
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    /// Field map used for hashing and persistence (`signatureData`).
    pub fn to_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("rsiBucket".to_string(), Value::from(self.rsi_bucket));
        fields.insert("macdDirection".to_string(), Value::from(self.macd_direction));
        fields.insert("trend".to_string(), Value::from(self.trend.clone()));
        fields.insert(
            "primaryPattern".to_string(),
            Value::from(self.primary_pattern.clone()),
        );
        fields.insert("volatilityHigh".to_string(), Value::from(self.volatility_high));
        fields.insert("hour".to_string(), Value::from(self.hour));
        fields
    }

    /// Human-readable label. Diagnostics only, never used as a key.
    pub fn label(&self) -> String {
        let macd = match self.macd_direction {
            d if d > 0 => "+",
            d if d < 0 => "-",
            _ => "0",
        };
        let vol = if self.volatility_high { "_HV" } else { "" };
        format!(
            "RSI{}_MACD{}_{}_{}{}_H{:02}",
            self.rsi_bucket, macd, self.trend, self.primary_pattern, vol, self.hour
        )
    }
}

impl fmt::Display for PatternSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Output of the reducer: signature plus its diagnostic label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReducedPattern {
    pub signature: PatternSignature,
    pub label: String,
}

/// Round RSI to the nearest bucket, clamped to 0..=100.
pub fn bucket_rsi(rsi: f64) -> i32 {
    let bucketed = (rsi / RSI_BUCKET_WIDTH).round() * RSI_BUCKET_WIDTH;
    bucketed.clamp(0.0, 100.0) as i32
}

/// Sign of the MACD histogram. NaN maps to flat.
pub fn macd_direction(histogram: f64) -> i8 {
    if histogram > 0.0 {
        1
    } else if histogram < 0.0 {
        -1
    } else {
        0
    }
}

/// Reduce a snapshot, failing with `InvalidInput` when indicators or trend are absent.
///
/// `now` supplies the hour when the snapshot carries no timestamp.
pub fn try_reduce(snapshot: &MarketSnapshot, now: DateTime<Utc>) -> Result<ReducedPattern> {
    let indicators = snapshot
        .indicators
        .as_ref()
        .ok_or_else(|| LedgerError::InvalidInput("snapshot has no indicators".to_string()))?;

    let trend = snapshot
        .trend
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| LedgerError::InvalidInput("snapshot has no trend label".to_string()))?;

    if !indicators.rsi.is_finite() {
        return Err(LedgerError::InvalidInput(format!(
            "rsi is not finite: {}",
            indicators.rsi
        )));
    }

    let primary = snapshot
        .patterns
        .iter()
        .map(|p| p.trim())
        .find(|p| !p.is_empty())
        .unwrap_or(NO_PATTERN);

    let volatility_high = snapshot
        .volatility
        .map(|v| v > HIGH_VOLATILITY_THRESHOLD)
        .unwrap_or(false);

    let hour = snapshot.timestamp.unwrap_or(now).hour() as u8;

    let signature = PatternSignature::new(
        bucket_rsi(indicators.rsi),
        macd_direction(indicators.macd_histogram),
        trend,
        primary,
        volatility_high,
        hour,
    );
    let label = signature.label();

    Ok(ReducedPattern { signature, label })
}

/// Reduce a snapshot, logging and returning `None` when it cannot be classified.
pub fn reduce(snapshot: &MarketSnapshot, now: DateTime<Utc>) -> Option<ReducedPattern> {
    match try_reduce(snapshot, now) {
        Ok(reduced) => Some(reduced),
        Err(e) => {
            warn!(error = %e, "cannot reduce snapshot to a pattern, skipping");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at_hour(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, h, 15, 0).unwrap()
    }

    #[test]
    fn test_rsi_buckets_to_nearest_decile() {
        assert_eq!(bucket_rsi(44.9), 40);
        assert_eq!(bucket_rsi(45.0), 50);
        assert_eq!(bucket_rsi(71.2), 70);
        assert_eq!(bucket_rsi(-3.0), 0);
        assert_eq!(bucket_rsi(140.0), 100);
    }

    #[test]
    fn test_macd_direction_sign() {
        assert_eq!(macd_direction(0.4), 1);
        assert_eq!(macd_direction(-0.01), -1);
        assert_eq!(macd_direction(0.0), 0);
        assert_eq!(macd_direction(f64::NAN), 0);
    }

    #[test]
    fn test_nearby_states_collide() {
        let a = MarketSnapshot::new(52.0, 0.2, "uptrend").at(at_hour(9));
        let b = MarketSnapshot::new(54.9, 1.7, "Uptrend").at(at_hour(9));
        let ra = try_reduce(&a, Utc::now()).unwrap();
        let rb = try_reduce(&b, Utc::now()).unwrap();
        assert_eq!(ra.signature, rb.signature);
    }

    #[test]
    fn test_full_signature_fields() {
        let snap = MarketSnapshot::new(67.0, -0.5, "downtrend")
            .with_pattern("Head_And_Shoulders")
            .with_volatility(0.035)
            .at(at_hour(14));
        let reduced = try_reduce(&snap, Utc::now()).unwrap();
        let sig = &reduced.signature;
        assert_eq!(sig.rsi_bucket(), 70);
        assert_eq!(sig.macd_direction(), -1);
        assert_eq!(sig.trend(), "downtrend");
        assert_eq!(sig.primary_pattern(), "head_and_shoulders");
        assert!(sig.volatility_high());
        assert_eq!(sig.hour(), 14);
        assert_eq!(reduced.label, "RSI70_MACD-_downtrend_head_and_shoulders_HV_H14");
    }

    #[test]
    fn test_missing_timestamp_uses_now() {
        let snap = MarketSnapshot::new(30.0, 0.0, "sideways");
        let reduced = try_reduce(&snap, at_hour(3)).unwrap();
        assert_eq!(reduced.signature.hour(), 3);
        assert_eq!(reduced.signature.primary_pattern(), NO_PATTERN);
        assert!(!reduced.signature.volatility_high());
    }

    #[test]
    fn test_missing_indicators_or_trend_is_invalid() {
        let no_indicators = MarketSnapshot {
            trend: Some("up".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            try_reduce(&no_indicators, Utc::now()),
            Err(LedgerError::InvalidInput(_))
        ));

        let mut no_trend = MarketSnapshot::new(50.0, 0.0, "up");
        no_trend.trend = None;
        assert!(reduce(&no_trend, Utc::now()).is_none());

        let blank_trend = MarketSnapshot::new(50.0, 0.0, "   ");
        assert!(reduce(&blank_trend, Utc::now()).is_none());
    }

    #[test]
    fn test_non_finite_rsi_is_invalid() {
        let snap = MarketSnapshot::new(f64::NAN, 0.0, "up");
        assert!(try_reduce(&snap, Utc::now()).is_err());
    }
}
