//! HTTP client for the workspace API (`/api/v3`)

use crate::config::BackupConfig;
use crate::download::ExportDownloader;
use crate::error::{Error, Result};
use crate::types::{
    EnqueueTaskResponse, ExportRequest, GetTasksBody, GetTasksResponse, TaskRecord,
};
use async_trait::async_trait;
use reqwest::header::{COOKIE, HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::debug;

use super::ExportService;

/// [`ExportService`] backed by the workspace HTTP API
///
/// Every request, including the export download, carries the
/// `token_v2`/`file_token` cookie.
#[derive(Clone, Debug)]
pub struct NotionClient {
    client: reqwest::Client,
    base_url: String,
    downloader: ExportDownloader,
}

impl NotionClient {
    /// Build a client from the run configuration
    pub fn new(config: &BackupConfig) -> Result<Self> {
        let cookie = HeaderValue::from_str(&config.credentials.cookie_header()).map_err(|_| {
            Error::config(
                "credentials contain characters not allowed in a cookie",
                "credentials",
            )
        })?;
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, cookie);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("notion-backup/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            downloader: ExportDownloader::new(client.clone()),
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post<B, R>(&self, endpoint: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!(%url, "POST");

        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Http {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl ExportService for NotionClient {
    async fn enqueue_task(&self, request: &ExportRequest) -> Result<String> {
        let response: EnqueueTaskResponse =
            self.post("enqueueTask", &request.to_enqueue_body()).await?;
        Ok(response.task_id)
    }

    async fn get_tasks(&self, task_ids: &[String]) -> Result<Vec<TaskRecord>> {
        let response: GetTasksResponse = self.post("getTasks", &GetTasksBody { task_ids }).await?;
        Ok(response.results)
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        self.downloader.fetch(url, dest).await
    }

    fn name(&self) -> &'static str {
        "notion-http"
    }
}
