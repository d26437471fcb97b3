//! # notion-backup
//!
//! Exports a Notion workspace in Markdown and HTML and unpacks each export
//! into a stable directory layout, suitable for committing to version control.
//!
//! ## Pipeline
//!
//! For every configured format, one after the other:
//! - **Submit** an `exportSpace` task through the internal v3 API
//! - **Poll** the task until it succeeds, bounded by a timeout, a failure
//!   counter and a stuck-progress counter
//! - **Download** the export archive to `<output>/<format>.zip`
//! - **Unpack** into a freshly emptied `<output>/<format>/` and flatten
//!   multi-part (`Part-N.zip`) exports
//!
//! A failing format never stops the ones after it; the run only fails when
//! every format failed.
//!
//! ## Quick Start
//!
//! ```no_run
//! use notion_backup::{BackupConfig, BackupOrchestrator, Credentials, NotionClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BackupConfig::new(Credentials::from_env(false)?);
//!     let client = NotionClient::new(&config)?;
//!
//!     let summary = BackupOrchestrator::new(&client, config).run_all().await?;
//!     std::process::exit(summary.exit_code());
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Per-format backup runner and sequential orchestrator
pub mod backup;
/// Configuration types
pub mod config;
/// Streaming export download
pub mod download;
/// Error types
pub mod error;
/// Archive extraction and layout normalization
pub mod extraction;
/// Export task polling state machine
pub mod poller;
/// Retry wrapper for transient status-query failures
pub mod retry;
/// Export service abstraction and the Notion client
pub mod service;
/// Core types (wire records, task state, results)
pub mod types;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use backup::{BackupOrchestrator, FormatBackupRunner};
pub use config::{BackupConfig, Credentials, ExtractionConfig, PollConfig, RetryConfig};
pub use error::{DownloadError, Error, ExportError, ExtractionError, Result};
pub use extraction::{ArchiveExtractor, DirectorySnapshot};
pub use poller::{PollSession, TaskPoller};
pub use service::{ExportService, NotionClient};
pub use types::{
    BackupSummary, ExportFormat, ExportOutcome, ExportRequest, ExportTask, FormatReport,
    FormatResult, TaskRecord, TaskState, TaskStatus,
};

/// Run every configured format, stopping early on a termination signal.
///
/// Returns `Ok(None)` when a signal arrived before the run finished. The
/// format in flight is abandoned; its output directory may be partially
/// written and is reset on the next run.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
pub async fn run_with_shutdown(
    orchestrator: &BackupOrchestrator<'_>,
) -> Result<Option<BackupSummary>> {
    tokio::select! {
        summary = orchestrator.run_all() => summary.map(Some),
        _ = wait_for_signal() => {
            tracing::warn!("Backup interrupted");
            Ok(None)
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register signal handlers, using ctrl_c fallback");
            if tokio::signal::ctrl_c().await.is_err() {
                // Nothing left to listen on; let the backup run to completion
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
            std::future::pending::<()>().await;
        }
    }
}
