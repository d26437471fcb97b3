//! Streamed download of a finished export
//!
//! The body is written chunk by chunk; the call resolves only once the file
//! has been flushed and synced, and fails as soon as either side of the
//! transfer reports an error. Nothing is cleaned up on failure.

use crate::error::{DownloadError, Error, Result};
use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::path::Path;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info};

/// Downloads export archives over HTTP
#[derive(Clone, Debug)]
pub struct ExportDownloader {
    client: reqwest::Client,
}

impl ExportDownloader {
    /// Wrap an HTTP client (default headers such as cookies are inherited)
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// GET `url` and stream the body to `dest`, overwriting any existing file
    ///
    /// # Errors
    ///
    /// - [`DownloadError::Status`] for a non-success response
    /// - [`DownloadError::Stream`] when the body stream breaks
    /// - [`DownloadError::Write`] when the file cannot be created or written
    pub async fn fetch(&self, url: &str, dest: &Path) -> Result<u64> {
        debug!(url, ?dest, "starting export download");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::Stream {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Download(DownloadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }));
        }

        let bytes = write_stream(response.bytes_stream(), url, dest).await?;
        info!(?dest, bytes, "Downloaded export archive");
        Ok(bytes)
    }
}

/// Write every chunk of `stream` to `dest`
///
/// Resolves after the last chunk has been flushed and synced to disk.
pub async fn write_stream<S, B, E>(mut stream: S, url: &str, dest: &Path) -> Result<u64>
where
    S: Stream<Item = std::result::Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Display,
{
    let write_err = |e: std::io::Error| DownloadError::Write {
        path: dest.to_path_buf(),
        reason: e.to_string(),
    };

    let file = tokio::fs::File::create(dest).await.map_err(write_err)?;
    let mut writer = BufWriter::new(file);
    let mut bytes_written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| DownloadError::Stream {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let chunk = chunk.as_ref();

        writer.write_all(chunk).await.map_err(write_err)?;
        bytes_written += chunk.len() as u64;
    }

    writer.flush().await.map_err(write_err)?;
    writer.into_inner().sync_all().await.map_err(write_err)?;

    Ok(bytes_written)
}
