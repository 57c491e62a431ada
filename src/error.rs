//! Error types for fdu
//!
//! This module defines the error hierarchy that covers:
//! - Filesystem errors during a scan
//! - SQLite database errors
//! - Structural errors while rebuilding a directory tree
//! - Report formatting errors
//! - Configuration and CLI errors
//!
//! Per-directory permission failures never show up here. They are absorbed by
//! the scanner and recorded as a scan status on the directory instead.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for fdu
#[derive(Error, Debug)]
pub enum FduError {
    /// Scan errors
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// Tree reconstruction errors
    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),

    /// Report errors
    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors raised while walking the filesystem
#[derive(Error, Debug)]
pub enum ScanError {
    /// Unclassified filesystem error, fatal to the scan
    #[error("Failed to scan '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A path was handed to the registry that is not below the scan root
    #[error("'{path}' is not a descendant of the scan root '{root}'")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    /// Persisting a batch failed
    #[error("Failed to record batch: {0}")]
    Database(#[from] DbError),

    /// Failed to spawn a worker thread
    #[error("Failed to spawn worker {id}: {reason}")]
    SpawnFailed { id: usize, reason: String },

    /// A worker thread panicked
    #[error("Worker {id} panicked")]
    WorkerPanicked { id: usize },

    /// Result channel closed while work was still outstanding
    #[error("Result channel closed with {outstanding} directories outstanding")]
    ChannelClosed { outstanding: usize },
}

impl ScanError {
    /// Build an I/O error that names the offending path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ScanError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Database errors
#[derive(Error, Debug)]
pub enum DbError {
    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Metadata value could not be encoded or decoded
    #[error("Metadata JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A stored value does not map onto the data model
    #[error("Invalid value in column '{column}': {value}")]
    InvalidValue { column: &'static str, value: i64 },

    /// Requested user does not exist in the database
    #[error("Unknown user '{0}'")]
    UnknownUser(String),
}

/// Structural errors while rebuilding or navigating a directory tree
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// No record without a parent was supplied
    #[error("No root directory found among {count} records")]
    NoRoot { count: usize },

    /// More than one record without a parent was supplied
    #[error("Multiple root directories found (ids {first} and {second})")]
    MultipleRoots { first: i64, second: i64 },

    /// A record references a parent that is not part of the supplied set
    #[error("Input must contain a complete tree, but cannot find parent id {parent_id} for directory {id}")]
    MissingParent { id: i64, parent_id: i64 },

    /// Two records under one parent share a name
    #[error("Directory {parent_id} has two subdirectories named '{name}' (ids {first} and {second})")]
    DuplicateChild {
        parent_id: i64,
        name: String,
        first: i64,
        second: i64,
    },

    /// Requested path does not lie below the tree root
    #[error("Path '{path}' is not within the tree rooted at '{root}'")]
    OutsideTree { path: PathBuf, root: PathBuf },

    /// A path component does not exist in the tree
    #[error("Path '{path}' not found: no entry '{component}' under '{parent}'")]
    PathNotFound {
        path: PathBuf,
        component: String,
        parent: PathBuf,
    },
}

/// Report formatting errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    /// Column code not recognised
    #[error("Unsupported column code \"{0}\"")]
    UnsupportedColumn(String),

    /// Unknown size unit
    #[error("Unsupported unit \"{0}\" (expected one of B, K, M, G, T, P, H)")]
    UnsupportedUnit(String),

    /// Size string could not be parsed
    #[error("Could not parse \"{0}\" into a size in bytes")]
    InvalidSize(String),
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid worker count
    #[error("Invalid worker count {count}: must be between 1 and {max}")]
    InvalidWorkerCount { count: usize, max: usize },

    /// Invalid exclude pattern
    #[error("Invalid exclude pattern '{pattern}': {reason}")]
    InvalidExcludePattern { pattern: String, reason: String },

    /// Scan root error
    #[error("Invalid scan root '{path}': {reason}")]
    InvalidRoot { path: PathBuf, reason: String },

    /// Output path error
    #[error("Invalid output path '{path}': {reason}")]
    InvalidOutputPath { path: PathBuf, reason: String },

    /// Input database error
    #[error("Invalid input database '{path}': {reason}")]
    InvalidInput { path: PathBuf, reason: String },

    /// Report option error
    #[error(transparent)]
    Report(#[from] ReportError),
}

/// Result type alias for FduError
pub type Result<T> = std::result::Result<T, FduError>;

/// Result type alias for ScanError
pub type ScanResult<T> = std::result::Result<T, ScanError>;

/// Result type alias for DbError
pub type DbResult<T> = std::result::Result<T, DbError>;

/// Result type alias for TreeError
pub type TreeResult<T> = std::result::Result<T, TreeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let tree_err = TreeError::NoRoot { count: 3 };
        let err: FduError = tree_err.into();
        assert!(matches!(err, FduError::Tree(_)));

        let db_err: ScanError = DbError::UnknownUser("nobody".into()).into();
        assert!(matches!(db_err, ScanError::Database(_)));
    }

    #[test]
    fn test_messages_name_offender() {
        let err = TreeError::MissingParent { id: 7, parent_id: 42 };
        let msg = err.to_string();
        assert!(msg.contains("42"));
        assert!(msg.contains('7'));

        let err = TreeError::PathNotFound {
            path: PathBuf::from("/scratch/a/b"),
            component: "b".into(),
            parent: PathBuf::from("/scratch/a"),
        };
        assert!(err.to_string().contains("'b'"));

        let err = ReportError::UnsupportedColumn("x".into());
        assert_eq!(err.to_string(), "Unsupported column code \"x\"");
    }

    #[test]
    fn test_scan_io_error_names_path() {
        let err = ScanError::io(
            "/scratch/broken",
            std::io::Error::new(std::io::ErrorKind::Other, "disk on fire"),
        );
        assert!(err.to_string().contains("/scratch/broken"));
    }
}
