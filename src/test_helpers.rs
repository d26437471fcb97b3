//! Shared test helpers: a scripted [`ExportService`] and fixture archives.

use crate::config::{PollConfig, RetryConfig};
use crate::error::{Error, Result};
use crate::service::ExportService;
use crate::types::{ExportRequest, TaskRecord, TaskState, TaskStatus};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

/// One scripted `getTasks` answer
#[derive(Clone, Debug)]
pub(crate) enum Poll {
    /// No record for the task
    Missing,
    /// Record without status payload
    NoStatus,
    /// In progress with the given page count
    InProgress(u64),
    /// Reported failure with an error message
    Failure(&'static str),
    /// Success with the given export URL
    Success(String),
    /// Success without export URL
    SuccessNoUrl,
    /// The transport call itself fails with this HTTP status
    Transport(u16),
}

/// What to answer once a task's script is exhausted
#[derive(Clone, Copy, Debug)]
pub(crate) enum Fallback {
    /// Task missing from every further response
    Missing,
    /// In progress with a page count that keeps growing
    Advancing,
}

#[derive(Debug)]
struct TaskScript {
    polls: VecDeque<Poll>,
    fallback: Fallback,
    served: u64,
}

/// [`ExportService`] fake answering from per-format scripts
///
/// Task ids are `task-<format>`; downloads copy the bytes registered for the URL.
#[derive(Debug, Default)]
pub(crate) struct ScriptedService {
    scripts: Mutex<HashMap<String, TaskScript>>,
    failing_enqueues: Mutex<Vec<String>>,
    archives: Mutex<HashMap<String, Vec<u8>>>,
    enqueued: Mutex<Vec<ExportRequest>>,
    status_calls: Mutex<u32>,
}

impl ScriptedService {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Script the answers for a format's task
    pub(crate) fn script(self, format: &str, polls: Vec<Poll>, fallback: Fallback) -> Self {
        self.scripts.lock().unwrap().insert(
            format!("task-{format}"),
            TaskScript {
                polls: polls.into(),
                fallback,
                served: 0,
            },
        );
        self
    }

    /// Make the enqueue request for a format fail
    pub(crate) fn failing_enqueue(self, format: &str) -> Self {
        self.failing_enqueues
            .lock()
            .unwrap()
            .push(format.to_string());
        self
    }

    /// Serve `bytes` for downloads of `url`
    pub(crate) fn archive(self, url: &str, bytes: Vec<u8>) -> Self {
        self.archives
            .lock()
            .unwrap()
            .insert(url.to_string(), bytes);
        self
    }

    /// Requests received by `enqueue_task`
    pub(crate) fn enqueued(&self) -> Vec<ExportRequest> {
        self.enqueued.lock().unwrap().clone()
    }

    /// Number of `get_tasks` calls, including failed transport attempts
    pub(crate) fn status_calls(&self) -> u32 {
        *self.status_calls.lock().unwrap()
    }

    fn next_answer(&self, task_id: &str) -> Poll {
        let mut scripts = self.scripts.lock().unwrap();
        let Some(script) = scripts.get_mut(task_id) else {
            return Poll::Missing;
        };
        script.served += 1;
        match script.polls.pop_front() {
            Some(poll) => poll,
            None => match script.fallback {
                Fallback::Missing => Poll::Missing,
                Fallback::Advancing => Poll::InProgress(script.served * 10),
            },
        }
    }
}

fn record(task_id: &str, state: TaskState, status: Option<TaskStatus>, error: Option<&str>) -> TaskRecord {
    TaskRecord {
        id: task_id.to_string(),
        state,
        status,
        error: error.map(str::to_string),
    }
}

#[async_trait]
impl ExportService for ScriptedService {
    async fn enqueue_task(&self, request: &ExportRequest) -> Result<String> {
        self.enqueued.lock().unwrap().push(request.clone());
        let format = request.format.as_str();
        if self
            .failing_enqueues
            .lock()
            .unwrap()
            .iter()
            .any(|f| f == format)
        {
            return Err(Error::Http {
                endpoint: "enqueueTask".into(),
                status: 401,
            });
        }
        Ok(format!("task-{format}"))
    }

    async fn get_tasks(&self, task_ids: &[String]) -> Result<Vec<TaskRecord>> {
        *self.status_calls.lock().unwrap() += 1;

        let mut records = Vec::new();
        for task_id in task_ids {
            let progress = |pages_exported| TaskStatus {
                pages_exported,
                export_url: None,
            };
            match self.next_answer(task_id) {
                Poll::Missing => {}
                Poll::NoStatus => records.push(record(task_id, TaskState::InProgress, None, None)),
                Poll::InProgress(pages) => records.push(record(
                    task_id,
                    TaskState::InProgress,
                    Some(progress(pages)),
                    None,
                )),
                Poll::Failure(msg) => records.push(record(
                    task_id,
                    TaskState::Failure,
                    Some(progress(0)),
                    Some(msg),
                )),
                Poll::Success(url) => records.push(record(
                    task_id,
                    TaskState::Success,
                    Some(TaskStatus {
                        pages_exported: 100,
                        export_url: Some(url),
                    }),
                    None,
                )),
                Poll::SuccessNoUrl => records.push(record(
                    task_id,
                    TaskState::Success,
                    Some(progress(100)),
                    None,
                )),
                Poll::Transport(status) => {
                    return Err(Error::Http {
                        endpoint: "getTasks".into(),
                        status,
                    });
                }
            }
        }
        Ok(records)
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        let bytes = self.archives.lock().unwrap().get(url).cloned();
        match bytes {
            Some(bytes) => {
                tokio::fs::write(dest, &bytes).await?;
                Ok(bytes.len() as u64)
            }
            None => Err(Error::Download(crate::error::DownloadError::Status {
                url: url.to_string(),
                status: 404,
            })),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Poll configuration with millisecond waits
pub(crate) fn fast_poll_config() -> PollConfig {
    PollConfig {
        timeout: None,
        max_fail_count: 5,
        stuck_threshold: 5,
        poll_interval: Duration::from_millis(1),
        status_retry: RetryConfig {
            max_attempts: 3,
            interval: Duration::from_millis(1),
            backoff_multiplier: 1.0,
            jitter: false,
        },
    }
}

/// ZIP archive bytes holding the given entries (names ending in `/` are directories)
pub(crate) fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = ::zip::ZipWriter::new(&mut cursor);
        let options = ::zip::write::FileOptions::default()
            .compression_method(::zip::CompressionMethod::Stored);
        for (name, content) in entries {
            if name.ends_with('/') {
                writer.add_directory(*name, options).unwrap();
            } else {
                writer.start_file(*name, options).unwrap();
                std::io::Write::write_all(&mut writer, content).unwrap();
            }
        }
        writer.finish().unwrap();
    }
    cursor.into_inner()
}

/// Write a ZIP archive holding the given entries to `path`
pub(crate) fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    std::fs::write(path, zip_bytes(entries)).unwrap();
}
