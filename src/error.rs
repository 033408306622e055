//! Error types for nzb-writer
//!
//! This module provides the error taxonomy for the library:
//! - [`Error`], the crate-wide error returned by every fallible operation
//! - [`DatabaseError`] for SQLite connection, migration and query failures
//! - [`PipelineError`] for the per-release failures of the NZB write pipeline
//!
//! Pipeline failures are local to one release. [`crate::NzbWriter::write_release`]
//! logs them with the release id and reports `false`, so a batch keeps going.

use crate::types::ReleaseId;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for nzb-writer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for nzb-writer
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "nzb_dir")
        key: Option<String>,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// NZB write pipeline failed for one release
    #[error("NZB pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),
}

/// Failures of the per-release NZB write pipeline
///
/// Every variant aborts the release it happened on. None of them leaves the
/// release marked as done, so the release stays eligible for a later run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The fragment source could not produce collections, binaries or parts
    #[error("failed to load fragments for release {release_id}: {reason}")]
    QueryFailure {
        /// Release being processed
        release_id: ReleaseId,
        /// Underlying failure
        reason: String,
    },

    /// The NZB document could not be serialized
    #[error("failed to build NZB for release {release_id}: {reason}")]
    BuildFailure {
        /// Release being processed
        release_id: ReleaseId,
        /// Underlying failure
        reason: String,
    },

    /// The compressed output file could not be opened or written
    #[error("failed to write NZB to {}: {reason}", path.display())]
    FilesystemWrite {
        /// Destination path of the `.nzb.gz` file
        path: PathBuf,
        /// Underlying failure
        reason: String,
    },

    /// The output file was not found after writing it
    ///
    /// Data already written is not rolled back; the release is left pending.
    #[error("NZB file {} does not exist after writing", path.display())]
    Verification {
        /// Destination path of the `.nzb.gz` file
        path: PathBuf,
    },
}

impl PipelineError {
    /// Machine-readable code for the failed stage, used as a log field
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::QueryFailure { .. } => "query_failure",
            PipelineError::BuildFailure { .. } => "build_failure",
            PipelineError::FilesystemWrite { .. } => "filesystem_write_error",
            PipelineError::Verification { .. } => "verification_failure",
        }
    }
}

impl Error {
    /// Machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Database(_) => "database_error",
            Error::Pipeline(e) => e.code(),
            Error::Io(_) => "io_error",
            Error::Other(_) => "internal_error",
        }
    }
}
