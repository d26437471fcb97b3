//! Export task lifecycle
//!
//! [`TaskPoller`] drives one export task from enqueue to a terminal state.
//! Two independent circuit breakers guard the loop:
//!
//! - the **failure counter** counts soft failures (task missing from the
//!   response, record without status, reported failure, success without URL)
//!   and never decreases;
//! - the **stuck counter** counts consecutive in-progress observations with an
//!   unchanged page count and resets whenever the count moves.
//!
//! Limits are only checked at loop boundaries. An in-flight status query is
//! never interrupted; the timeout only prevents the next wait from starting.


use crate::config::PollConfig;
use crate::error::{Error, ExportError, Result};
use crate::retry::with_retry;
use crate::service::ExportService;
use crate::types::{ExportOutcome, ExportRequest, ExportTask, PollFailure, TaskRecord, TaskState};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Counters for one poll loop
///
/// Owned by a single [`TaskPoller::run`] call and never shared across formats.
#[derive(Clone, Debug)]
pub struct PollSession {
    config: PollConfig,
    started: Instant,
    fail_count: u32,
    stuck_count: u32,
    last_pages_exported: u64,
    polls: u32,
    last_error: Option<String>,
}

impl PollSession {
    /// Start a session now
    pub fn new(config: PollConfig) -> Self {
        Self {
            config,
            started: Instant::now(),
            fail_count: 0,
            stuck_count: 0,
            last_pages_exported: 0,
            polls: 0,
            last_error: None,
        }
    }

    /// Soft failures observed so far
    pub fn fail_count(&self) -> u32 {
        self.fail_count
    }

    /// Consecutive in-progress observations without new pages
    pub fn stuck_count(&self) -> u32 {
        self.stuck_count
    }

    /// Page count of the last in-progress observation that moved
    pub fn last_pages_exported(&self) -> u64 {
        self.last_pages_exported
    }

    /// Status polls completed
    pub fn polls(&self) -> u32 {
        self.polls
    }

    /// Last failure message recorded
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Loop-boundary check: timeout first, then the failure limit
    pub fn check_limits(&self, task_id: &str) -> Result<()> {
        if let Some(timeout) = self.config.timeout {
            let elapsed = self.started.elapsed();
            if elapsed > timeout {
                return Err(ExportError::TimedOut {
                    task_id: task_id.to_string(),
                    elapsed,
                    timeout,
                }
                .into());
            }
        }

        if self.fail_count >= self.config.max_fail_count {
            return Err(ExportError::TooManyFailures {
                task_id: task_id.to_string(),
                count: self.fail_count,
                last_error: self.last_error.clone(),
            }
            .into());
        }

        Ok(())
    }

    /// Apply one poll response to the session and the observed task
    ///
    /// Returns the export URL once the task succeeded, `None` to keep polling,
    /// or a terminal error when the task is stuck.
    pub fn apply(
        &mut self,
        task: &mut ExportTask,
        record: Option<&TaskRecord>,
    ) -> Result<Option<String>> {
        self.polls += 1;

        let Some(record) = record else {
            self.record_failure(&task.task_id, PollFailure::TaskMissing);
            return Ok(None);
        };
        task.observe(record);

        let Some(status) = record.status.as_ref() else {
            debug!(task_id = %task.task_id, ?record, "task record without status");
            self.record_failure(&task.task_id, PollFailure::StatusMissing);
            return Ok(None);
        };

        match record.state {
            TaskState::InProgress => {
                self.observe_progress(&task.task_id, status.pages_exported)?;
                Ok(None)
            }
            TaskState::Failure => {
                self.record_failure(&task.task_id, PollFailure::Reported(record.error.clone()));
                Ok(None)
            }
            TaskState::Success => match &status.export_url {
                Some(url) => Ok(Some(url.clone())),
                None => {
                    self.record_failure(&task.task_id, PollFailure::ExportUrlMissing);
                    Ok(None)
                }
            },
            TaskState::Unknown => {
                debug!(task_id = %task.task_id, "task not started yet");
                Ok(None)
            }
        }
    }

    fn record_failure(&mut self, task_id: &str, failure: PollFailure) {
        self.fail_count += 1;
        warn!(
            task_id,
            fail_count = self.fail_count,
            max_fail_count = self.config.max_fail_count,
            "{failure}, waiting"
        );
        self.last_error = Some(failure.to_string());
    }

    fn observe_progress(&mut self, task_id: &str, pages_exported: u64) -> Result<()> {
        if pages_exported == self.last_pages_exported {
            self.stuck_count += 1;
        } else {
            self.stuck_count = 0;
            self.last_pages_exported = pages_exported;
        }

        let threshold = self.config.stuck_threshold;
        if threshold > 0 && self.stuck_count >= threshold {
            return Err(Error::Export(ExportError::Stuck {
                task_id: task_id.to_string(),
                count: self.stuck_count,
                pages_exported,
            }));
        }

        info!(
            task_id,
            pages_exported,
            stuck_count = self.stuck_count,
            "Pages exported: {pages_exported}"
        );
        Ok(())
    }
}

/// Drives one export task to completion
pub struct TaskPoller<'a> {
    service: &'a dyn ExportService,
    config: &'a PollConfig,
}

impl<'a> TaskPoller<'a> {
    /// Create a poller over a transport
    pub fn new(service: &'a dyn ExportService, config: &'a PollConfig) -> Self {
        Self { service, config }
    }

    /// Enqueue `request` and poll until the export is ready
    ///
    /// # Errors
    ///
    /// - [`ExportError::Submission`] when the enqueue request fails (not retried)
    /// - [`ExportError::TimedOut`], [`ExportError::TooManyFailures`],
    ///   [`ExportError::Stuck`] when a limit is hit
    /// - the transport error when a status query still fails after its retries
    pub async fn run(&self, request: &ExportRequest) -> Result<ExportOutcome> {
        let format = request.format;
        info!(%format, service = self.service.name(), "Start exporting as {format}");
        if let Some(timeout) = self.config.timeout {
            info!(%format, timeout_secs = timeout.as_secs(), "Set timeout");
        }
        if self.config.stuck_threshold > 0 {
            info!(%format, stuck_threshold = self.config.stuck_threshold, "Set stuck wait count");
        }

        let task_id = self
            .service
            .enqueue_task(request)
            .await
            .map_err(|e| ExportError::Submission {
                format: format.to_string(),
                reason: e.to_string(),
            })?;
        info!(%format, %task_id, "Enqueued task {task_id}");

        let mut session = PollSession::new(self.config.clone());
        let mut task = ExportTask::new(task_id);
        let task_ids = vec![task.task_id.clone()];

        loop {
            session.check_limits(&task.task_id)?;

            tokio::time::sleep(self.config.poll_interval).await;

            let records = with_retry(&self.config.status_retry, || {
                self.service.get_tasks(&task_ids)
            })
            .await?;
            let record = records.iter().find(|r| r.id == task.task_id);

            if let Some(export_url) = session.apply(&mut task, record)? {
                info!(
                    %format,
                    task_id = %task.task_id,
                    polls = session.polls(),
                    fail_count = session.fail_count(),
                    "Task succeeds!"
                );
                return Ok(ExportOutcome {
                    task_id: task.task_id,
                    export_url,
                    fail_count: session.fail_count(),
                    stuck_count: session.stuck_count(),
                    polls: session.polls(),
                    pages_exported: task.pages_exported,
                });
            }
        }
    }
}
