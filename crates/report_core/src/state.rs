use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

use crate::error::SubmissionError;
use crate::status::StatusReport;
use crate::view_model::{AppViewModel, JobRowView};

/// Opaque identifier assigned by the remote job service.
pub type JobId = String;

/// Closed set of job kinds the service accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    MessagesReport,
    RepliersReport,
    ThreadSummary,
}

impl JobKind {
    pub const ALL: [JobKind; 3] = [
        JobKind::MessagesReport,
        JobKind::RepliersReport,
        JobKind::ThreadSummary,
    ];

    /// Stable name used in filenames and logs.
    pub fn slug(self) -> &'static str {
        match self {
            JobKind::MessagesReport => "messages-report",
            JobKind::RepliersReport => "repliers-report",
            JobKind::ThreadSummary => "thread-summary",
        }
    }

    /// Task name the service needs to locate the execution backend.
    pub fn task_name(self) -> &'static str {
        match self {
            JobKind::MessagesReport => "fetch_messages",
            JobKind::RepliersReport => "top_repliers",
            JobKind::ThreadSummary => "summarize_thread",
        }
    }

    /// Report kinds produce record collections; summaries produce one document.
    pub fn is_report(self) -> bool {
        !matches!(self, JobKind::ThreadSummary)
    }

    pub(crate) fn label(self) -> &'static str {
        if self.is_report() {
            "Task"
        } else {
            "Summary task"
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAi,
    Ollama,
}

impl LlmProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "openai",
            LlmProvider::Ollama => "ollama",
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request parameters a job was submitted with. Never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobParameters {
    Report {
        channel_id: String,
        start_date: NaiveDate,
        end_date: NaiveDate,
        /// Only meaningful for repliers reports.
        top_n: Option<u32>,
    },
    Summary {
        channel_id: String,
        thread_ts: String,
        llm_provider: LlmProvider,
        model: String,
    },
}

impl JobParameters {
    pub fn channel_id(&self) -> &str {
        match self {
            JobParameters::Report { channel_id, .. } | JobParameters::Summary { channel_id, .. } => {
                channel_id
            }
        }
    }

    /// Checks the parameters fit `kind` before anything is sent upstream.
    pub fn validate_for(&self, kind: JobKind) -> Result<(), SubmissionError> {
        let invalid = |reason: &str| Err(SubmissionError::InvalidParameters(reason.to_string()));

        if self.channel_id().trim().is_empty() {
            return invalid("channel id is empty");
        }
        match (kind.is_report(), self) {
            (
                true,
                JobParameters::Report {
                    start_date,
                    end_date,
                    top_n,
                    ..
                },
            ) => {
                if end_date < start_date {
                    return invalid("end date precedes start date");
                }
                if kind == JobKind::RepliersReport && *top_n == Some(0) {
                    return invalid("top_n must be at least 1");
                }
                Ok(())
            }
            (
                false,
                JobParameters::Summary {
                    thread_ts, model, ..
                },
            ) => {
                if thread_ts.trim().is_empty() {
                    return invalid("thread timestamp is empty");
                }
                if model.trim().is_empty() {
                    return invalid("model is empty");
                }
                Ok(())
            }
            (true, JobParameters::Summary { .. }) => {
                invalid("report jobs need a channel and date range")
            }
            (false, JobParameters::Report { .. }) => {
                invalid("thread summaries need a thread reference and model")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Pending)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JobStatus::Pending => "pending",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        })
    }
}

/// Payload of a succeeded job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobResult {
    /// Message-records or replier-records, in service order.
    Records(Vec<Value>),
    /// A single nested document (thread summaries).
    Document(Value),
}

impl JobResult {
    pub fn record_count(&self) -> usize {
        match self {
            JobResult::Records(records) => records.len(),
            JobResult::Document(_) => 1,
        }
    }
}

/// Lifecycle state. Result and error live inside the terminal variants.
#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    Pending,
    Succeeded(JobResult),
    Failed(String),
}

impl JobState {
    pub fn status(&self) -> JobStatus {
        match self {
            JobState::Pending => JobStatus::Pending,
            JobState::Succeeded(_) => JobStatus::Succeeded,
            JobState::Failed(_) => JobStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobRecord {
    id: JobId,
    kind: JobKind,
    parameters: JobParameters,
    state: JobState,
    created_at: DateTime<Utc>,
    last_updated_at: DateTime<Utc>,
}

impl JobRecord {
    pub fn pending(
        id: impl Into<JobId>,
        kind: JobKind,
        parameters: JobParameters,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            parameters,
            state: JobState::Pending,
            created_at: at,
            last_updated_at: at,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn parameters(&self) -> &JobParameters {
        &self.parameters
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    pub fn status(&self) -> JobStatus {
        self.state.status()
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    pub fn result(&self) -> Option<&JobResult> {
        match &self.state {
            JobState::Succeeded(result) => Some(result),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            JobState::Failed(message) => Some(message),
            _ => None,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_updated_at(&self) -> DateTime<Utc> {
        self.last_updated_at
    }

    /// Merges a status report. Terminal records are never changed.
    /// Returns false when the report was ignored.
    pub(crate) fn apply_report(&mut self, report: StatusReport, at: DateTime<Utc>) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.state = match report {
            StatusReport::Pending => JobState::Pending,
            StatusReport::Succeeded(result) => JobState::Succeeded(result),
            StatusReport::Failed(message) => JobState::Failed(message),
        };
        if at > self.last_updated_at {
            self.last_updated_at = at;
        }
        true
    }
}

/// Session store: jobs newest-first plus the set of refreshes in flight.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    jobs: Vec<JobRecord>,
    in_flight: HashSet<JobId>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// All jobs, newest first.
    pub fn jobs(&self) -> &[JobRecord] {
        &self.jobs
    }

    pub fn job(&self, job_id: &str) -> Option<&JobRecord> {
        self.jobs.iter().find(|job| job.id == job_id)
    }

    pub fn is_refresh_in_flight(&self, job_id: &str) -> bool {
        self.in_flight.contains(job_id)
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            job_count: self.jobs.len(),
            jobs: self
                .jobs
                .iter()
                .map(|job| JobRowView::from_record(job, self.is_refresh_in_flight(&job.id)))
                .collect(),
            refreshes_in_flight: self.in_flight.len(),
        }
    }

    /// Inserts at the head. Returns false if the id is already tracked.
    pub(crate) fn insert_pending(&mut self, record: JobRecord) -> bool {
        if self.job(&record.id).is_some() {
            return false;
        }
        self.jobs.insert(0, record);
        true
    }

    pub(crate) fn job_mut(&mut self, job_id: &str) -> Option<&mut JobRecord> {
        self.jobs.iter_mut().find(|job| job.id == job_id)
    }

    /// Returns false if a refresh for this id was already in flight.
    pub(crate) fn mark_in_flight(&mut self, job_id: &str) -> bool {
        self.in_flight.insert(job_id.to_string())
    }

    pub(crate) fn clear_in_flight(&mut self, job_id: &str) {
        self.in_flight.remove(job_id);
    }
}
