use chrono::{DateTime, Utc};

use crate::{JobId, JobKind, JobRecord, JobStatus};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub job_count: usize,
    /// Newest first.
    pub jobs: Vec<JobRowView>,
    pub refreshes_in_flight: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRowView {
    pub job_id: JobId,
    pub kind: JobKind,
    pub channel_id: String,
    pub status: JobStatus,
    pub record_count: Option<usize>,
    pub error: Option<String>,
    pub refresh_in_flight: bool,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
}

impl JobRowView {
    pub(crate) fn from_record(record: &JobRecord, refresh_in_flight: bool) -> Self {
        Self {
            job_id: record.id().to_string(),
            kind: record.kind(),
            channel_id: record.parameters().channel_id().to_string(),
            status: record.status(),
            record_count: record.result().map(|result| result.record_count()),
            error: record.error_message().map(ToOwned::to_owned),
            refresh_in_flight,
            created_at: record.created_at(),
            last_updated_at: record.last_updated_at(),
        }
    }

    /// "3 records" / "1 record" line shown under a succeeded job.
    pub fn records_label(&self) -> Option<String> {
        self.record_count.map(|count| match count {
            1 => "1 record".to_string(),
            n => format!("{n} records"),
        })
    }
}
