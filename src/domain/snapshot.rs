use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Indicator values attached to a market snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Indicators {
    /// Relative strength index, 0-100
    pub rsi: f64,
    /// MACD histogram value; only its sign is used
    #[serde(default, alias = "macd")]
    pub macd_histogram: f64,
}

/// Market context at a point in time.
///
/// Used both as the entry context of a closed trade and as the live query
/// submitted by the decision engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    #[serde(default)]
    pub indicators: Option<Indicators>,
    /// Trend label (e.g. "uptrend", "sideways")
    #[serde(default)]
    pub trend: Option<String>,
    /// Detected chart patterns, strongest first
    #[serde(default)]
    pub patterns: Vec<String>,
    /// Realized volatility as a fraction (0.02 = 2%)
    #[serde(default)]
    pub volatility: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl MarketSnapshot {
    pub fn new(rsi: f64, macd_histogram: f64, trend: &str) -> Self {
        Self {
            indicators: Some(Indicators {
                rsi,
                macd_histogram,
            }),
            trend: Some(trend.to_string()),
            ..Default::default()
        }
    }

    pub fn with_pattern(mut self, pattern: &str) -> Self {
        self.patterns.push(pattern.to_string());
        self
    }

    pub fn with_volatility(mut self, volatility: f64) -> Self {
        self.volatility = Some(volatility);
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// A closed trade reported by the execution layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeOutcome {
    /// Market context when the position was opened
    pub entry: MarketSnapshot,
    /// When the position was closed
    pub exit_timestamp: DateTime<Utc>,
    /// Realized profit/loss in quote currency
    pub pnl: f64,
    /// Realized profit/loss as a percentage of entry notional
    #[serde(default)]
    pub pnl_percent: f64,
    #[serde(default)]
    pub hold_duration_ms: i64,
    /// News keywords active around entry, used for correlation tracking
    #[serde(default)]
    pub news_keywords: Vec<String>,
}

impl TradeOutcome {
    pub fn new(entry: MarketSnapshot, pnl: f64, exit_timestamp: DateTime<Utc>) -> Self {
        Self {
            entry,
            exit_timestamp,
            pnl,
            pnl_percent: 0.0,
            hold_duration_ms: 0,
            news_keywords: Vec::new(),
        }
    }

    /// A trade counts as a win only when it made money
    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breakeven_trade_is_a_loss() {
        let trade = TradeOutcome::new(MarketSnapshot::new(50.0, 0.1, "up"), 0.0, Utc::now());
        assert!(!trade.is_win());
    }

    #[test]
    fn test_snapshot_deserializes_with_missing_fields() {
        let snap: MarketSnapshot = serde_json::from_str(r#"{"trend":"up"}"#).unwrap();
        assert!(snap.indicators.is_none());
        assert!(snap.patterns.is_empty());
        assert_eq!(snap.trend.as_deref(), Some("up"));
    }

    #[test]
    fn test_indicators_accept_macd_alias() {
        let ind: Indicators = serde_json::from_str(r#"{"rsi":42.0,"macd":-0.3}"#).unwrap();
        assert_eq!(ind.macd_histogram, -0.3);
    }
}
