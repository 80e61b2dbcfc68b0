//! Persistence layer for the pattern ledger
//!
//! One JSON store file per operating mode, written backup-then-overwrite.

pub mod store;

pub use store::{backup_path_for, LedgerFile, StorePaths};
