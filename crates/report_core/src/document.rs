use serde_json::Value;

use crate::error::ExportError;

/// Pretty-prints a nested result verbatim, two-space indented, key order kept.
pub fn to_document(payload: &Value) -> Result<String, ExportError> {
    serde_json::to_string_pretty(payload).map_err(|err| ExportError::Serialize(err.to_string()))
}
