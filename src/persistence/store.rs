//! File-backed ledger persistence.
//!
//! Every write copies the current store file to its backup path, then
//! replaces the store through a temp file + rename so a crash mid-write never
//! leaves a truncated store behind.

use crate::domain::OperatingMode;
use crate::error::{LedgerError, Result};
use crate::ledger::{Ledger, Thresholds};
use chrono::Utc;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

const STORE_PREFIX: &str = "pattern-memory";

/// Primary and backup locations for one store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    pub store: PathBuf,
    pub backup: PathBuf,
}

impl StorePaths {
    pub fn new(store: impl Into<PathBuf>, backup: impl Into<PathBuf>) -> Self {
        Self {
            store: store.into(),
            backup: backup.into(),
        }
    }

    /// `<dir>/pattern-memory-<mode>.json` with its `.backup.json` sibling.
    pub fn for_mode(data_dir: &Path, mode: OperatingMode) -> Self {
        let store = data_dir.join(format!("{STORE_PREFIX}-{mode}.json"));
        let backup = backup_path_for(&store);
        Self { store, backup }
    }

    fn sidecar(&self, suffix: &str) -> PathBuf {
        let stem = self
            .store
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| STORE_PREFIX.to_string());
        self.store.with_file_name(format!("{stem}.{suffix}"))
    }
}

/// `foo.json` -> `foo.backup.json`
pub fn backup_path_for(store: &Path) -> PathBuf {
    let stem = store
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| STORE_PREFIX.to_string());
    store.with_file_name(format!("{stem}.backup.json"))
}

/// Loads and writes the ledger for one operating mode.
///
/// A disabled store still reads its file at startup but never touches disk
/// afterwards.
#[derive(Debug, Clone)]
pub struct LedgerFile {
    paths: StorePaths,
    enabled: bool,
}

impl LedgerFile {
    pub fn new(paths: StorePaths, enabled: bool) -> Self {
        Self { paths, enabled }
    }

    pub fn disabled(paths: StorePaths) -> Self {
        Self::new(paths, false)
    }

    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Read the store file. `Ok(None)` when it does not exist.
    pub fn try_load(&self) -> Result<Option<Ledger>> {
        let path = &self.paths.store;
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(LedgerError::read(path, e)),
        };

        let ledger: Ledger = serde_json::from_str(&raw).map_err(|e| LedgerError::read(path, e))?;
        Ok(Some(ledger))
    }

    /// Load the ledger, degrading to an empty one on any failure.
    pub fn load(&self, thresholds: &Thresholds) -> Ledger {
        match self.try_load() {
            Ok(Some(mut ledger)) => {
                let repaired = ledger.backfill(thresholds);
                info!(
                    path = %self.paths.store.display(),
                    successful = ledger.successful_patterns.len(),
                    failed = ledger.failed_patterns.len(),
                    total_trades = ledger.metadata.total_trades,
                    repaired,
                    "loaded pattern store"
                );
                ledger
            }
            Ok(None) => {
                info!(path = %self.paths.store.display(), "no pattern store found, starting empty");
                Ledger::new(Utc::now())
            }
            Err(e) => {
                warn!(error = %e, "pattern store unreadable, starting with an empty ledger");
                self.preserve_corrupt();
                Ledger::new(Utc::now())
            }
        }
    }

    /// Copy an unreadable store aside so the next write cannot destroy it.
    fn preserve_corrupt(&self) {
        if !self.enabled {
            return;
        }
        let target = self.paths.sidecar(&format!(
            "corrupt-{}.json",
            Utc::now().format("%Y%m%dT%H%M%S")
        ));
        match fs::copy(&self.paths.store, &target) {
            Ok(_) => warn!(path = %target.display(), "kept copy of corrupt pattern store"),
            Err(e) => warn!(error = %e, "could not copy corrupt pattern store aside"),
        }
    }

    /// Serialize and persist. Returns `Ok(false)` when persistence is disabled.
    pub fn save(&self, ledger: &Ledger) -> Result<bool> {
        if !self.enabled {
            return Ok(false);
        }
        let bytes = serde_json::to_vec_pretty(ledger)?;
        self.write_bytes(&bytes)
    }

    /// Backup-then-overwrite with already serialized ledger bytes.
    pub fn write_bytes(&self, bytes: &[u8]) -> Result<bool> {
        if !self.enabled {
            return Ok(false);
        }

        let store = &self.paths.store;
        if let Some(dir) = store.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| LedgerError::write(dir, e))?;
        }

        if store.exists() {
            fs::copy(store, &self.paths.backup)
                .map_err(|e| LedgerError::write(&self.paths.backup, e))?;
        }

        let tmp = self.paths.sidecar("json.tmp");
        let written = (|| -> std::io::Result<()> {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(bytes)?;
            file.sync_all()?;
            fs::rename(&tmp, store)
        })();

        if let Err(e) = written {
            error!(path = %store.display(), error = %e, "pattern store write failed");
            let _ = fs::remove_file(&tmp);
            return Err(LedgerError::write(store, e));
        }

        debug!(path = %store.display(), bytes = bytes.len(), "pattern store written");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_paths_per_mode() {
        let dir = Path::new("/data");
        let live = StorePaths::for_mode(dir, OperatingMode::Live);
        let backtest = StorePaths::for_mode(dir, OperatingMode::Backtest);
        assert_eq!(live.store, PathBuf::from("/data/pattern-memory-live.json"));
        assert_eq!(live.backup, PathBuf::from("/data/pattern-memory-live.backup.json"));
        assert_ne!(live.store, backtest.store);
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        let file = LedgerFile::new(StorePaths::for_mode(dir.path(), OperatingMode::Paper), true);
        assert!(file.try_load().unwrap().is_none());
        assert!(file.load(&Thresholds::default()).is_empty());
    }

    #[test]
    fn test_backup_holds_previous_snapshot() {
        let dir = tempdir().unwrap();
        let paths = StorePaths::for_mode(dir.path(), OperatingMode::Live);
        let file = LedgerFile::new(paths.clone(), true);

        let mut first = Ledger::new(Utc::now());
        first.metadata.total_trades = 1;
        assert!(file.save(&first).unwrap());
        assert!(!paths.backup.exists());

        let mut second = first.clone();
        second.metadata.total_trades = 2;
        file.save(&second).unwrap();

        let backup: Ledger =
            serde_json::from_str(&fs::read_to_string(&paths.backup).unwrap()).unwrap();
        let current = file.try_load().unwrap().unwrap();
        assert_eq!(backup.metadata.total_trades, 1);
        assert_eq!(current.metadata.total_trades, 2);
        assert!(!paths.sidecar("json.tmp").exists());
    }

    #[test]
    fn test_corrupt_file_falls_back_and_is_kept() {
        let dir = tempdir().unwrap();
        let paths = StorePaths::for_mode(dir.path(), OperatingMode::Paper);
        fs::write(&paths.store, "{ not json").unwrap();

        let file = LedgerFile::new(paths.clone(), true);
        assert!(matches!(
            file.try_load(),
            Err(LedgerError::PersistenceRead { .. })
        ));
        let ledger = file.load(&Thresholds::default());
        assert!(ledger.is_empty());
        assert_eq!(fs::read_to_string(&paths.store).unwrap(), "{ not json");

        let kept = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".corrupt-"))
            .count();
        assert_eq!(kept, 1);
    }

    #[test]
    fn test_disabled_store_never_writes() {
        let dir = tempdir().unwrap();
        let paths = StorePaths::for_mode(dir.path(), OperatingMode::Backtest);
        let file = LedgerFile::disabled(paths.clone());
        assert!(!file.save(&Ledger::new(Utc::now())).unwrap());
        assert!(!paths.store.exists());
        assert!(!paths.backup.exists());
    }

    #[test]
    fn test_schema_backfill_on_load() {
        let dir = tempdir().unwrap();
        let paths = StorePaths::for_mode(dir.path(), OperatingMode::Paper);
        fs::write(
            &paths.store,
            r#"{"successfulPatterns":{},"metadata":{"totalTrades":4}}"#,
        )
        .unwrap();
        let ledger = LedgerFile::new(paths, true).load(&Thresholds::default());
        assert_eq!(ledger.metadata.total_trades, 4);
        assert!(ledger.failed_patterns.is_empty());
        assert!(!ledger.metadata.version.is_empty());
    }
}
