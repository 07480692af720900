use chrono::{DateTime, Utc};

use crate::error::StatusQueryError;
use crate::{JobId, JobKind, JobParameters, StatusReport};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// The service accepted a submission and assigned `job_id`.
    JobSubmitted {
        job_id: JobId,
        kind: JobKind,
        parameters: JobParameters,
        at: DateTime<Utc>,
    },
    /// The submission never produced a job.
    SubmissionFailed { kind: JobKind, reason: String },
    /// User asked for a status check.
    RefreshRequested { job_id: JobId },
    /// A status query completed, successfully or not.
    StatusReceived {
        job_id: JobId,
        outcome: Result<StatusReport, StatusQueryError>,
        at: DateTime<Utc>,
    },
}
