use crate::config::BackupConfig;
use crate::error::Result;
use crate::service::ExportService;
use crate::types::{BackupSummary, FormatResult};
use tracing::{error, info, warn};

use super::FormatBackupRunner;

/// Runs every configured format sequentially and aggregates the results
///
/// Formats never run concurrently: they share the same workspace and the
/// same service quota. A failing format is logged and counted; it never stops
/// the formats after it.
pub struct BackupOrchestrator<'a> {
    service: &'a dyn ExportService,
    config: BackupConfig,
}

impl<'a> BackupOrchestrator<'a> {
    /// Create an orchestrator over an immutable configuration
    pub fn new(service: &'a dyn ExportService, config: BackupConfig) -> Self {
        Self { service, config }
    }

    /// Configuration the orchestrator runs with
    pub fn config(&self) -> &BackupConfig {
        &self.config
    }

    /// Back up every configured format
    ///
    /// # Errors
    ///
    /// Only configuration problems are returned as errors, before any format
    /// starts. Per-format failures end up in the summary.
    pub async fn run_all(&self) -> Result<BackupSummary> {
        self.config.validate()?;
        let runner = FormatBackupRunner::new(self.service, &self.config)?;

        let mut summary = BackupSummary::default();
        for &format in &self.config.formats {
            let result = match runner.run(format, &self.config.poll).await {
                Ok(report) => FormatResult::Succeeded(report),
                Err(e) => {
                    error!(%format, code = e.code(), error = %e, "{format} backup failed");
                    FormatResult::Failed {
                        format,
                        code: e.code(),
                        message: e.to_string(),
                    }
                }
            };
            summary.results.push(result);
        }

        info!(
            succeeded = summary.success_count(),
            failed = summary.failure_count(),
            "done."
        );
        if summary.all_failed() {
            error!("All backup tasks failed.");
        } else if summary.failure_count() > 0 {
            let failed: Vec<String> = summary
                .results
                .iter()
                .filter(|r| r.is_failure())
                .map(|r| r.format().to_string())
                .collect();
            warn!(?failed, "Backup finished with failed formats");
        }

        Ok(summary)
    }
}
