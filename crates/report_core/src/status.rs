use serde_json::Value;

use crate::error::StatusQueryError;
use crate::{JobKind, JobResult};

/// Used when the service reports a failure without a message.
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// A validated status response.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusReport {
    Pending,
    Succeeded(JobResult),
    Failed(String),
}

/// Validates a raw status body for a job of `kind`.
///
/// Body shape: `{ "status": "PENDING" | "SUCCESS" | "FAILURE", "data"?: .., "error"?: .. }`.
/// Intermediate task states (`STARTED`, `RECEIVED`, `RETRY`) count as pending.
pub fn parse_status_report(kind: JobKind, body: &Value) -> Result<StatusReport, StatusQueryError> {
    let object = body
        .as_object()
        .ok_or_else(|| StatusQueryError::Malformed(format!("expected an object, got {body}")))?;
    let status = match object.get("status") {
        Some(Value::String(status)) if !status.is_empty() => status.as_str(),
        _ => return Err(StatusQueryError::MissingStatus),
    };

    match status {
        "PENDING" | "STARTED" | "RECEIVED" | "RETRY" => Ok(StatusReport::Pending),
        "FAILURE" => Ok(StatusReport::Failed(error_text(object.get("error")))),
        "SUCCESS" => parse_success(kind, object.get("data")),
        other => Err(StatusQueryError::UnrecognizedStatus(other.to_string())),
    }
}

fn parse_success(kind: JobKind, data: Option<&Value>) -> Result<StatusReport, StatusQueryError> {
    let data = data.ok_or(StatusQueryError::MissingData)?;
    if let Some(message) = embedded_error(data) {
        return Ok(StatusReport::Failed(message));
    }
    match (kind.is_report(), data) {
        (true, Value::Array(records)) => {
            Ok(StatusReport::Succeeded(JobResult::Records(records.clone())))
        }
        (false, Value::Object(_)) => Ok(StatusReport::Succeeded(JobResult::Document(data.clone()))),
        _ => Err(StatusQueryError::MissingData),
    }
}

/// Tasks that catch their own upstream errors finish with `{"error": ".."}` as data.
fn embedded_error(data: &Value) -> Option<String> {
    let object = data.as_object()?;
    if object.len() != 1 {
        return None;
    }
    object.get("error")?.as_str().map(ToOwned::to_owned)
}

fn error_text(error: Option<&Value>) -> String {
    match error {
        Some(Value::String(message)) if !message.is_empty() => message.clone(),
        Some(Value::Null) | None => UNKNOWN_ERROR.to_string(),
        Some(Value::String(_)) => UNKNOWN_ERROR.to_string(),
        Some(other) => other.to_string(),
    }
}
