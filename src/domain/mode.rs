use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Operating mode of the host trading loop.
///
/// Each mode learns into its own store file so live, paper and backtest
/// statistics never contaminate each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OperatingMode {
    Live,
    #[default]
    Paper,
    Backtest,
}

impl OperatingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperatingMode::Live => "live",
            OperatingMode::Paper => "paper",
            OperatingMode::Backtest => "backtest",
        }
    }

    /// Whether learned state may be written to disk in this mode by default.
    pub fn persists_by_default(&self) -> bool {
        !matches!(self, OperatingMode::Backtest)
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OperatingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "live" => Ok(OperatingMode::Live),
            "paper" => Ok(OperatingMode::Paper),
            "backtest" => Ok(OperatingMode::Backtest),
            other => Err(format!("unknown operating mode: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing_is_case_insensitive() {
        assert_eq!("LIVE".parse::<OperatingMode>(), Ok(OperatingMode::Live));
        assert_eq!(" paper ".parse::<OperatingMode>(), Ok(OperatingMode::Paper));
        assert_eq!(
            "Backtest".parse::<OperatingMode>(),
            Ok(OperatingMode::Backtest)
        );
        assert!("demo".parse::<OperatingMode>().is_err());
    }

    #[test]
    fn test_backtest_does_not_persist_by_default() {
        assert!(OperatingMode::Live.persists_by_default());
        assert!(OperatingMode::Paper.persists_by_default());
        assert!(!OperatingMode::Backtest.persists_by_default());
    }
}
