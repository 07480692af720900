use thiserror::Error;

use crate::JobId;

/// The job could not be submitted; no record was created.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("invalid job parameters: {0}")]
    InvalidParameters(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("http status {0}")]
    HttpStatus(u16),
    #[error("malformed submission response: {0}")]
    MalformedResponse(String),
}

/// A status query failed; the stored record is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatusQueryError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("HTTP error! status: {0}")]
    HttpStatus(u16),
    #[error("malformed status response: {0}")]
    Malformed(String),
    #[error("Invalid status response from server")]
    MissingStatus,
    #[error("unrecognized status {0:?}")]
    UnrecognizedStatus(String),
    #[error("successful status without a usable data payload")]
    MissingData,
    #[error("status query was cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("record {index} matches no known result shape (keys: {keys:?})")]
pub struct UnrecognizedShapeError {
    pub index: usize,
    pub keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExportError {
    #[error("nothing to export: result set is empty")]
    Empty,
    #[error(transparent)]
    UnrecognizedShape(#[from] UnrecognizedShapeError),
    #[error("job {0} has no result to export")]
    NotReady(JobId),
    #[error("job {0} holds a document result and cannot be exported as a table")]
    NotTabular(JobId),
    #[error("serialization failed: {0}")]
    Serialize(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("submission failed: {0}")]
    Submission(#[from] SubmissionError),
    #[error("job {0} not found")]
    NotFound(JobId),
    #[error("status query for job {job_id} failed: {source}")]
    StatusQuery {
        job_id: JobId,
        #[source]
        source: StatusQueryError,
    },
    #[error("a refresh for job {0} is already in flight")]
    RefreshInFlight(JobId),
}
