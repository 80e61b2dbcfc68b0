use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the pattern ledger
#[derive(Error, Debug)]
pub enum LedgerError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Input errors (unusable trade or snapshot)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Persistence errors
    #[error("Failed to read pattern store {path}: {reason}")]
    PersistenceRead { path: PathBuf, reason: String },

    #[error("Failed to write pattern store {path}: {reason}")]
    PersistenceWrite { path: PathBuf, reason: String },

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl LedgerError {
    pub fn read(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        LedgerError::PersistenceRead {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn write(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        LedgerError::PersistenceWrite {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias for LedgerError
pub type Result<T> = std::result::Result<T, LedgerError>;
