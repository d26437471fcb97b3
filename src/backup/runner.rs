use crate::config::{BackupConfig, PollConfig};
use crate::error::Result;
use crate::extraction::ArchiveExtractor;
use crate::poller::TaskPoller;
use crate::service::ExportService;
use crate::types::{ExportFormat, FormatReport};
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Runs export, download and unpacking for a single format
///
/// Layout per format `F` below the output directory:
/// - `F.zip`: downloaded archive, removed once unpacked
/// - `F/`: emptied and recreated on every run, holds the unpacked export
pub struct FormatBackupRunner<'a> {
    service: &'a dyn ExportService,
    config: &'a BackupConfig,
    extractor: ArchiveExtractor,
}

impl<'a> FormatBackupRunner<'a> {
    /// Create a runner; fails only on an invalid part pattern
    pub fn new(service: &'a dyn ExportService, config: &'a BackupConfig) -> Result<Self> {
        Ok(Self {
            service,
            config,
            extractor: ArchiveExtractor::new(&config.extraction)?,
        })
    }

    /// Back up one format with the given poll limits
    ///
    /// Errors from the poller, the download and the extraction are returned
    /// as they are.
    pub async fn run(&self, format: ExportFormat, poll: &PollConfig) -> Result<FormatReport> {
        let started = Instant::now();
        let request = self.config.export_request(format);

        let outcome = TaskPoller::new(self.service, poll).run(&request).await?;

        let archive = self.config.archive_path(format);
        let target = self.config.format_dir(format);
        tokio::fs::create_dir_all(&self.config.output_dir).await?;
        let archive_bytes = self.service.download(&outcome.export_url, &archive).await?;
        info!(%format, bytes = archive_bytes, "Downloaded: {}", archive.display());

        reset_dir(&target).await?;
        info!(%format, dir = %target.display(), "Emptied: {}", target.display());

        self.extractor.unzip(&archive, &target).await?;
        tokio::fs::remove_file(&archive).await?;
        // Sibling parts are flattened before the layout is inspected
        let mut parts_flattened = self.extractor.flatten_parts(&target).await?;

        let directory = if self.config.extraction.resolve_nesting {
            let canonical = self.extractor.normalize(&target).await?;
            if canonical != target {
                parts_flattened += self.extractor.flatten_parts(&canonical).await?;
            }
            canonical
        } else {
            target
        };

        let report = FormatReport {
            format,
            directory,
            archive_bytes,
            parts_flattened,
            elapsed: started.elapsed(),
        };
        info!(
            %format,
            dir = %report.directory.display(),
            parts_flattened,
            elapsed_secs = report.elapsed.as_secs(),
            "{format} backup complete"
        );
        Ok(report)
    }
}

/// Remove `dir` with everything below it and recreate it empty
async fn reset_dir(dir: &Path) -> Result<()> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    tokio::fs::create_dir_all(dir).await?;
    Ok(())
}
