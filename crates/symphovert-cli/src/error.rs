//! Error types for the Symphovert CLI
//!
//! Batch-level errors only. Per-file conversion problems never surface here;
//! the driver folds them into a `ConversionOutcome` (see [`crate::driver`]).

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that abort a run
///
/// All messages are user-facing and say what to check.
#[derive(Error, Debug)]
pub enum CliError {
    /// The archive root is missing or not a directory
    #[error("Archive not found: '{0}'. Pass the root directory of an archive (the one containing OriginalDocuments).")]
    ArchiveNotFound(PathBuf),

    /// No catalog database at the expected location
    #[error("Database is not present at {0}. Run the identification step on this archive first.")]
    CatalogMissing(PathBuf),

    /// Catalog exists but was never initialised
    #[error("Database at {0} is not initialised.")]
    CatalogNotInitialised(PathBuf),

    /// SQLite operation failed
    #[error("Catalog error: {0}")]
    Catalog(#[from] rusqlite::Error),

    /// A catalog row could not be interpreted
    #[error("Invalid catalog record: {0}")]
    InvalidRecord(String),

    /// Configuration is missing or invalid
    #[error("Configuration error: {0}. Check the config file and SYMPHOVERT_* environment variables.")]
    Config(String),

    /// TOML parsing failed
    #[error("Failed to parse config file: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// JSON (de)serialization of catalog payloads failed
    #[error("Failed to encode catalog data: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// File system operation failed
    #[error("File operation failed: {0}. Check file permissions and disk space.")]
    Io(#[from] std::io::Error),

    /// Shared utility failed (checksums)
    #[error(transparent)]
    Common(#[from] symphovert_common::CommonError),
}

impl CliError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid record error
    pub fn invalid_record(msg: impl Into<String>) -> Self {
        Self::InvalidRecord(msg.into())
    }

    /// Whether this error means the catalog cannot be used at all
    pub fn is_catalog_unavailable(&self) -> bool {
        matches!(
            self,
            Self::CatalogMissing(_) | Self::CatalogNotInitialised(_)
        )
    }
}
