//! Core types for notion-backup
//!
//! Covers the per-format data model (request, observed task, outcome) and
//! the wire shapes of the two workspace API endpoints the poller talks to.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Export format supported by the workspace export endpoint
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    /// Markdown pages with CSV databases
    Markdown,
    /// Static HTML pages
    Html,
}

impl ExportFormat {
    /// All formats, in the order a default run processes them
    pub const ALL: [ExportFormat; 2] = [ExportFormat::Markdown, ExportFormat::Html];

    /// The `exportType` value sent to the service, also used for file and directory names
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Markdown => "markdown",
            ExportFormat::Html => "html",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            "html" => Ok(ExportFormat::Html),
            other => Err(format!(
                "unknown export format '{other}' (expected markdown or html)"
            )),
        }
    }
}

/// One export request, built once per format and never mutated
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportRequest {
    /// Requested format
    pub format: ExportFormat,
    /// Workspace (space) to export
    pub workspace_id: String,
    /// Locale for rendered content (e.g. "en")
    pub locale: String,
    /// Time zone for rendered dates (e.g. "America/New_York")
    pub time_zone: String,
}

impl ExportRequest {
    /// Build the `enqueueTask` request body
    pub fn to_enqueue_body(&self) -> EnqueueTaskBody<'_> {
        EnqueueTaskBody {
            task: EnqueueTask {
                event_name: "exportSpace",
                request: ExportSpaceRequest {
                    space_id: &self.workspace_id,
                    export_options: ExportOptions {
                        export_type: self.format.as_str(),
                        time_zone: &self.time_zone,
                        locale: &self.locale,
                    },
                },
            },
        }
    }
}

/// `enqueueTask` request body
#[derive(Debug, Serialize)]
pub struct EnqueueTaskBody<'a> {
    task: EnqueueTask<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EnqueueTask<'a> {
    event_name: &'static str,
    request: ExportSpaceRequest<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportSpaceRequest<'a> {
    space_id: &'a str,
    export_options: ExportOptions<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportOptions<'a> {
    export_type: &'static str,
    time_zone: &'a str,
    locale: &'a str,
}

/// `enqueueTask` response body
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueTaskResponse {
    /// Id of the newly created task
    pub task_id: String,
}

/// `getTasks` request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTasksBody<'a> {
    /// Tasks to look up
    pub task_ids: &'a [String],
}

/// `getTasks` response body
#[derive(Clone, Debug, Default, Deserialize)]
pub struct GetTasksResponse {
    /// One record per known task
    #[serde(default)]
    pub results: Vec<TaskRecord>,
}

/// Remote task state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Still rendering
    InProgress,
    /// The service reported a failure
    Failure,
    /// Export is ready for download
    Success,
    /// Missing or unrecognised state
    #[default]
    #[serde(other)]
    Unknown,
}

/// Progress payload of a task record
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatus {
    /// Pages rendered so far
    #[serde(default)]
    pub pages_exported: u64,
    /// Download URL, present once the task succeeded
    #[serde(default, rename = "exportURL")]
    pub export_url: Option<String>,
}

/// One entry of a `getTasks` response
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Task id
    pub id: String,
    /// Task state
    #[serde(default)]
    pub state: TaskState,
    /// Progress payload, absent on some degenerate responses
    #[serde(default)]
    pub status: Option<TaskStatus>,
    /// Error text reported with a failure
    #[serde(default)]
    pub error: Option<String>,
}

/// Latest observed view of a remote export task
///
/// Each poll fully replaces the observed fields; nothing is merged across polls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportTask {
    /// Opaque task id
    pub task_id: String,
    /// Last observed state
    pub state: TaskState,
    /// Last observed page count
    pub pages_exported: u64,
    /// Download URL, once known
    pub export_url: Option<String>,
    /// Error message reported by the service, if any
    pub error_message: Option<String>,
}

impl ExportTask {
    /// A freshly enqueued task that has not been polled yet
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            state: TaskState::Unknown,
            pages_exported: 0,
            export_url: None,
            error_message: None,
        }
    }

    /// Replace the observed fields with those of a poll record
    pub fn observe(&mut self, record: &TaskRecord) {
        self.state = record.state;
        self.pages_exported = record
            .status
            .as_ref()
            .map(|s| s.pages_exported)
            .unwrap_or(0);
        self.export_url = record.status.as_ref().and_then(|s| s.export_url.clone());
        self.error_message = record.error.clone();
    }
}

/// A recoverable poll observation that counts against the failure limit
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollFailure {
    /// The response held no record for the task
    TaskMissing,
    /// The record had no status payload
    StatusMissing,
    /// The service reported the task as failed
    Reported(Option<String>),
    /// The task succeeded without an export URL
    ExportUrlMissing,
}

impl fmt::Display for PollFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollFailure::TaskMissing => f.write_str("task missing from response"),
            PollFailure::StatusMissing => f.write_str("task has no status"),
            PollFailure::Reported(Some(msg)) => write!(f, "task error: {msg}"),
            PollFailure::Reported(None) => f.write_str("task error: unknown"),
            PollFailure::ExportUrlMissing => f.write_str("task succeeded without an export URL"),
        }
    }
}

/// Result of a poll loop that reached `success`
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportOutcome {
    /// Remote task id
    pub task_id: String,
    /// URL of the finished export archive
    pub export_url: String,
    /// Soft failures observed along the way
    pub fail_count: u32,
    /// Stuck counter at the moment of success
    pub stuck_count: u32,
    /// Number of status polls performed
    pub polls: u32,
    /// Pages exported according to the last observation
    pub pages_exported: u64,
}

/// Result of one successful format backup
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormatReport {
    /// Format that was backed up
    pub format: ExportFormat,
    /// Canonical directory holding the unpacked export
    pub directory: PathBuf,
    /// Bytes downloaded
    pub archive_bytes: u64,
    /// Multi-part archives inlined into the directory
    pub parts_flattened: usize,
    /// Wall-clock time for the whole format
    pub elapsed: Duration,
}

/// Outcome of one format inside a run
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormatResult {
    /// The format was backed up
    Succeeded(FormatReport),
    /// The format failed
    Failed {
        /// Format that failed
        format: ExportFormat,
        /// Machine-readable error code
        code: &'static str,
        /// Human-readable error
        message: String,
    },
}

impl FormatResult {
    /// Format this result belongs to
    pub fn format(&self) -> ExportFormat {
        match self {
            FormatResult::Succeeded(report) => report.format,
            FormatResult::Failed { format, .. } => *format,
        }
    }

    /// Whether the format failed
    pub fn is_failure(&self) -> bool {
        matches!(self, FormatResult::Failed { .. })
    }
}

/// Aggregated outcome of a backup run
#[must_use]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BackupSummary {
    /// Per-format results, in processing order
    pub results: Vec<FormatResult>,
}

impl BackupSummary {
    /// Number of failed formats
    pub fn failure_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_failure()).count()
    }

    /// Number of succeeded formats
    pub fn success_count(&self) -> usize {
        self.results.len() - self.failure_count()
    }

    /// True when every requested format failed
    pub fn all_failed(&self) -> bool {
        self.failure_count() == self.results.len()
    }

    /// Process exit code: non-zero only when every format failed
    pub fn exit_code(&self) -> i32 {
        if self.all_failed() { 1 } else { 0 }
    }
}
