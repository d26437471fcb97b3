//! Error types for notion-backup
//!
//! This module provides the error taxonomy for one backup run:
//! - Configuration errors (fatal before any work starts)
//! - Export lifecycle errors (submission, timeout, failure limit, stuck progress)
//! - Download errors (non-success status, broken stream, write failure)
//! - Extraction errors (corrupt archive, ambiguous archive layout)
//!
//! Soft polling failures (missing task, missing status, reported failure) are
//! not errors: they never leave the poller and are modelled by
//! [`PollFailure`](crate::types::PollFailure).

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for notion-backup operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for notion-backup
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key or environment variable that caused the error
        key: Option<String>,
    },

    /// Export task lifecycle error
    #[error("export error: {0}")]
    Export(#[from] ExportError),

    /// Export download error
    #[error("download error: {0}")]
    Download(#[from] DownloadError),

    /// Archive extraction error
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Remote endpoint answered with a non-success status
    #[error("{endpoint} returned HTTP {status}")]
    Http {
        /// Endpoint name (e.g. "enqueueTask")
        endpoint: String,
        /// HTTP status code
        status: u16,
    },

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a configuration error tied to a key
    pub fn config(message: impl Into<String>, key: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Machine-readable error code, used in run summaries and logs
    pub fn code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Export(ExportError::Submission { .. }) => "submission_failed",
            Error::Export(ExportError::TimedOut { .. }) => "timed_out",
            Error::Export(ExportError::TooManyFailures { .. }) => "too_many_failures",
            Error::Export(ExportError::Stuck { .. }) => "stuck_export",
            Error::Download(_) => "stream_error",
            Error::Extraction(ExtractionError::UnexpectedStructure { .. }) => {
                "unexpected_archive_structure"
            }
            Error::Extraction(ExtractionError::ExtractionFailed { .. }) => "extraction_failed",
            Error::Http { .. } => "http_error",
            Error::Network(_) => "network_error",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
        }
    }
}

/// Export task lifecycle errors
///
/// All of these are terminal for the format being exported; none of them
/// abort sibling formats.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The enqueue request itself failed (not retried)
    #[error("failed to enqueue {format} export: {reason}")]
    Submission {
        /// Export format that was being requested
        format: String,
        /// The reason submission failed
        reason: String,
    },

    /// The configured timeout elapsed before the task finished
    #[error("timeout reached for task {task_id}: {}s elapsed, limit {}s", .elapsed.as_secs(), .timeout.as_secs())]
    TimedOut {
        /// Remote task id
        task_id: String,
        /// Time spent polling when the limit was detected
        elapsed: Duration,
        /// Configured limit
        timeout: Duration,
    },

    /// Too many missing, garbled or failed poll observations
    #[error("task {task_id} failed {count} times (last error: {})", .last_error.as_deref().unwrap_or("none"))]
    TooManyFailures {
        /// Remote task id
        task_id: String,
        /// Number of soft failures observed
        count: u32,
        /// Last failure message, if any was recorded
        last_error: Option<String>,
    },

    /// The task stayed in progress without exporting more pages
    #[error("task {task_id} stuck {count} times at {pages_exported} pages")]
    Stuck {
        /// Remote task id
        task_id: String,
        /// Consecutive observations without progress
        count: u32,
        /// Page count the task is stuck at
        pages_exported: u64,
    },
}

/// Export download errors
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Export URL answered with a non-success status
    #[error("download of {url} returned HTTP {status}")]
    Status {
        /// Export URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// The response body stream broke before completion
    #[error("stream from {url} failed: {reason}")]
    Stream {
        /// Export URL
        url: String,
        /// The reason the stream failed
        reason: String,
    },

    /// Writing the body to disk failed
    #[error("failed to write {path}: {reason}")]
    Write {
        /// Destination file
        path: PathBuf,
        /// The reason the write failed
        reason: String,
    },
}

/// Archive extraction errors
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The archive could not be opened or unpacked
    #[error("extraction failed for {archive}: {reason}")]
    ExtractionFailed {
        /// The archive file that failed to extract
        archive: PathBuf,
        /// The reason extraction failed
        reason: String,
    },

    /// Directory layout after unpacking matches no known export shape
    #[error(
        "unexpected file structure in {dir}: {subdirectories} subdirectories, {archives} archives"
    )]
    UnexpectedStructure {
        /// Directory that was inspected
        dir: PathBuf,
        /// Number of immediate subdirectories
        subdirectories: usize,
        /// Number of immediate archive files
        archives: usize,
    },
}
