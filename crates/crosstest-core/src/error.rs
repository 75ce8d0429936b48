//! Error types for crosstest-core

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while locating groups and their test directories
#[derive(Error, Debug)]
pub enum ResolveError {
    /// Root or group directory is missing or unreadable
    #[error("Directory not found: {path:?}")]
    DirectoryNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Group directory contains no submission folder
    #[error("No submission directory found for group {group} under {path:?}")]
    SubmissionMissing { group: String, path: PathBuf },

    /// No child of the source root matches the test directory marker
    #[error("No test directory matching '{marker}' for group {group} under {src_root:?}")]
    TestDirectoryMissing {
        group: String,
        marker: String,
        src_root: PathBuf,
    },

    /// A swap backup from an earlier run was never restored
    #[error("Group {group} has an unrestored test backup at {backup:?}, repair it by hand")]
    LeftoverBackup { group: String, backup: PathBuf },
}

/// Errors raised by the swap guard
#[derive(Error, Debug)]
pub enum SwapError {
    /// The subject's test directory does not exist; nothing was moved
    #[error("Subject test directory missing: {path:?}")]
    SubjectMissing { path: PathBuf },

    /// A backup from an unfinished transaction is still on disk
    #[error("Backup path already exists: {backup:?}")]
    BackupCollision { backup: PathBuf },

    /// The transaction was already closed or corrupted; transactions are single-use
    #[error("Swap of {path:?} already finished")]
    AlreadyFinished { path: PathBuf },

    /// Moving the subject's tests aside failed; nothing was moved
    #[error("Failed to back up {path:?}: {source}")]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Copying the foreign tests in failed; the original was restored
    #[error("Failed to copy tests from {from:?}: {source}")]
    Substitute {
        from: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Moving the backup back failed; the submission is left corrupted
    #[error("Failed to restore {path:?} from backup {backup:?}: {source}")]
    RestoreFailed {
        path: PathBuf,
        backup: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SwapError {
    /// Whether this error leaves the subject's tree in an unknown state.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SwapError::RestoreFailed { .. })
    }
}

/// Errors raised while reading a build summary line
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Fewer than four comma-separated fields after the marker
    #[error("Expected 4 fields in summary line, found {found}: {line:?}")]
    FieldCount { line: String, found: usize },

    /// A field has no colon or a non-numeric value
    #[error("Invalid value in field {field:?} of summary line {line:?}")]
    InvalidValue { line: String, field: String },

    /// failures + errors + skipped exceeds runs
    #[error("Counts in summary line exceed run count: {line:?}")]
    Inconsistent { line: String },
}

/// Errors raised while writing reports
#[derive(Error, Debug)]
pub enum ReportError {
    /// IO error
    #[error("Failed to write report {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`crate::MatrixConfig`]
    #[error("Invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    /// Config value rejected by validation
    #[error("Invalid config: {0}")]
    Invalid(String),
}
