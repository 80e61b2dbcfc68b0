use crate::domain::OperatingMode;
use crate::ledger::classifier::{
    DEFAULT_FAILURE_THRESHOLD, DEFAULT_MIN_SAMPLE_SIZE, DEFAULT_SUCCESS_THRESHOLD,
};
use crate::ledger::{
    max_age_days, Thresholds, DEFAULT_MAX_PATTERN_AGE_DAYS, MAX_PATTERN_AGE_DAYS_LIMIT,
};
use crate::persistence::{backup_path_for, StorePaths};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Outcomes required before a signature is classified
    #[serde(default = "default_min_trades_sample")]
    pub min_trades_sample: u64,
    /// Win rate at or above which a signature is successful
    #[serde(default = "default_success_threshold")]
    pub success_threshold: f64,
    /// Win rate below which a signature is failed
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: f64,
    /// Idle age in days after which a signature is pruned
    #[serde(default = "default_max_pattern_age_days")]
    pub max_pattern_age_days: i64,
    /// Operating mode; selects the store file
    #[serde(default)]
    pub mode: OperatingMode,
    /// Directory holding per-mode store files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Explicit store path (overrides the per-mode file name)
    #[serde(default)]
    pub store_path: Option<PathBuf>,
    /// Explicit backup path (defaults to `<store>.backup.json`)
    #[serde(default)]
    pub backup_path: Option<PathBuf>,
    /// Master switch for disk writes
    #[serde(default = "default_true")]
    pub persistence_enabled: bool,
    /// Allow backtest runs to write their store file
    #[serde(default)]
    pub persist_backtest: bool,
    /// Interval for the background prune trigger (0 = disabled)
    #[serde(default = "default_prune_interval")]
    pub prune_interval_secs: u64,
}

fn default_min_trades_sample() -> u64 {
    DEFAULT_MIN_SAMPLE_SIZE
}

fn default_success_threshold() -> f64 {
    DEFAULT_SUCCESS_THRESHOLD
}

fn default_failure_threshold() -> f64 {
    DEFAULT_FAILURE_THRESHOLD
}

fn default_max_pattern_age_days() -> i64 {
    DEFAULT_MAX_PATTERN_AGE_DAYS
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("pattern-ledger"))
        .unwrap_or_else(|| PathBuf::from("data"))
}

fn default_true() -> bool {
    true
}

fn default_prune_interval() -> u64 {
    3600
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            min_trades_sample: DEFAULT_MIN_SAMPLE_SIZE,
            success_threshold: DEFAULT_SUCCESS_THRESHOLD,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            max_pattern_age_days: DEFAULT_MAX_PATTERN_AGE_DAYS,
            mode: OperatingMode::default(),
            data_dir: default_data_dir(),
            store_path: None,
            backup_path: None,
            persistence_enabled: true,
            persist_backtest: false,
            prune_interval_secs: default_prune_interval(),
        }
    }
}

impl LedgerConfig {
    /// Config rooted at an explicit data directory, everything else default
    pub fn in_dir(data_dir: impl AsRef<Path>, mode: OperatingMode) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            mode,
            ..Default::default()
        }
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            min_sample_size: self.min_trades_sample,
            success_threshold: self.success_threshold,
            failure_threshold: self.failure_threshold,
        }
    }

    /// Configured max age; out-of-range values never prune.
    pub fn max_pattern_age(&self) -> chrono::Duration {
        max_age_days(self.max_pattern_age_days).unwrap_or(chrono::Duration::MAX)
    }

    pub fn store_paths(&self) -> StorePaths {
        match &self.store_path {
            Some(store) => {
                let backup = self
                    .backup_path
                    .clone()
                    .unwrap_or_else(|| backup_path_for(store));
                StorePaths::new(store.clone(), backup)
            }
            None => {
                let mut paths = StorePaths::for_mode(&self.data_dir, self.mode);
                if let Some(backup) = &self.backup_path {
                    paths.backup = backup.clone();
                }
                paths
            }
        }
    }

    /// Whether writes are allowed in the configured mode
    pub fn persistence_active(&self) -> bool {
        self.persistence_enabled && (self.mode.persists_by_default() || self.persist_backtest)
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = self.thresholds().validate().err().unwrap_or_default();

        if self.max_pattern_age_days <= 0 {
            errors.push("max_pattern_age_days must be positive".to_string());
        } else if self.max_pattern_age_days > MAX_PATTERN_AGE_DAYS_LIMIT {
            errors.push(format!(
                "max_pattern_age_days must be at most {MAX_PATTERN_AGE_DAYS_LIMIT}"
            ));
        }

        if let (Some(store), Some(backup)) = (&self.store_path, &self.backup_path) {
            if store == backup {
                errors.push("backup_path must differ from store_path".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default values
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .set_default("ledger.min_trades_sample", DEFAULT_MIN_SAMPLE_SIZE)?
            .set_default("ledger.success_threshold", DEFAULT_SUCCESS_THRESHOLD)?
            .set_default("ledger.failure_threshold", DEFAULT_FAILURE_THRESHOLD)?
            .set_default("ledger.max_pattern_age_days", DEFAULT_MAX_PATTERN_AGE_DAYS)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("LEDGER_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (LEDGER_LEDGER__MODE, etc.)
            .add_source(
                Environment::with_prefix("LEDGER")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Create a default configuration for CLI usage
    pub fn default_config(mode: OperatingMode, data_dir: Option<PathBuf>) -> Self {
        let mut ledger = LedgerConfig {
            mode,
            ..Default::default()
        };
        if let Some(dir) = data_dir {
            ledger.data_dir = dir;
        }
        Self {
            ledger,
            logging: LoggingConfig::default(),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        self.ledger.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backtest_persistence_gating() {
        let mut cfg = LedgerConfig::in_dir("/tmp/x", OperatingMode::Backtest);
        assert!(!cfg.persistence_active());
        cfg.persist_backtest = true;
        assert!(cfg.persistence_active());
        cfg.persistence_enabled = false;
        assert!(!cfg.persistence_active());

        let live = LedgerConfig::in_dir("/tmp/x", OperatingMode::Live);
        assert!(live.persistence_active());
    }

    #[test]
    fn test_store_path_override_derives_backup() {
        let cfg = LedgerConfig {
            store_path: Some(PathBuf::from("/var/lib/pl/custom.json")),
            ..LedgerConfig::in_dir("/tmp/x", OperatingMode::Live)
        };
        let paths = cfg.store_paths();
        assert_eq!(paths.store, PathBuf::from("/var/lib/pl/custom.json"));
        assert_eq!(paths.backup, PathBuf::from("/var/lib/pl/custom.backup.json"));
    }

    #[test]
    fn test_validate_collects_errors() {
        let cfg = LedgerConfig {
            max_pattern_age_days: 0,
            success_threshold: 1.5,
            ..Default::default()
        };
        let errors = cfg.validate().unwrap_err();
        assert_eq!(errors.len(), 2, "{errors:?}");
        assert!(LedgerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_huge_max_age() {
        let cfg = LedgerConfig {
            max_pattern_age_days: 100_000_000,
            ..Default::default()
        };
        let errors = cfg.validate().unwrap_err();
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(errors[0].contains("at most"));
        assert_eq!(cfg.max_pattern_age(), chrono::Duration::MAX);
    }

    #[test]
    fn test_load_from_missing_dir_uses_defaults() {
        let cfg = AppConfig::load_from("/nonexistent/pattern-ledger-config").unwrap();
        assert_eq!(cfg.ledger.min_trades_sample, 10);
        assert_eq!(cfg.ledger.success_threshold, 0.65);
        assert_eq!(cfg.ledger.failure_threshold, 0.35);
        assert_eq!(cfg.ledger.max_pattern_age_days, 90);
        assert_eq!(cfg.logging.level, "info");
    }
}
