//! Workspace service transport
//!
//! The poller, downloader and runner only see the [`ExportService`] trait:
//! "make a request, get a response or an error". [`NotionClient`] is the
//! HTTP implementation used by the binary; tests substitute scripted fakes.

mod notion;


pub use notion::NotionClient;

use crate::error::Result;
use crate::types::{ExportRequest, TaskRecord};
use async_trait::async_trait;
use std::path::Path;

/// Transport capabilities needed by one export-and-fetch workflow
#[async_trait]
pub trait ExportService: Send + Sync {
    /// Enqueue an export task and return its id
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be sent, the service answers
    /// with a non-success status, or the response carries no task id.
    async fn enqueue_task(&self, request: &ExportRequest) -> Result<String>;

    /// Fetch the current records of the given tasks
    ///
    /// Tasks unknown to the service are simply absent from the result.
    async fn get_tasks(&self, task_ids: &[String]) -> Result<Vec<TaskRecord>>;

    /// Stream the archive at `url` into `dest`, overwriting it
    ///
    /// Returns the number of bytes written. A failed download may leave a
    /// truncated file behind.
    async fn download(&self, url: &str, dest: &Path) -> Result<u64>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
