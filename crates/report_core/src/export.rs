use crate::document::to_document;
use crate::error::ExportError;
use crate::filename::export_filename;
use crate::tabular::to_csv;
use crate::{JobKind, JobRecord, JobResult};

pub const CSV_MIME: &str = "text/csv;charset=utf-8;";
pub const JSON_MIME: &str = "application/json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => CSV_MIME,
            ExportFormat::Json => JSON_MIME,
        }
    }
}

/// A rendered download: what the file sink needs and nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub filename: String,
    pub mime_type: &'static str,
    pub content: String,
}

/// Renders the result of a succeeded job.
///
/// Report jobs export as CSV or JSON under `{kind}_{id}`; thread summaries
/// always export as a JSON document named `summary_{id}.json`.
pub fn export_job(record: &JobRecord, format: ExportFormat) -> Result<ExportFile, ExportError> {
    let result = record
        .result()
        .ok_or_else(|| ExportError::NotReady(record.id().to_string()))?;

    match (record.kind(), result) {
        (JobKind::ThreadSummary, JobResult::Document(payload)) => {
            if format == ExportFormat::Csv {
                return Err(ExportError::NotTabular(record.id().to_string()));
            }
            Ok(ExportFile {
                filename: export_filename("summary", record.id(), "json"),
                mime_type: JSON_MIME,
                content: to_document(payload)?,
            })
        }
        (kind, JobResult::Records(records)) => {
            let content = match format {
                ExportFormat::Csv => to_csv(records)?,
                ExportFormat::Json => {
                    if records.is_empty() {
                        return Err(ExportError::Empty);
                    }
                    to_document(&serde_json::Value::Array(records.clone()))?
                }
            };
            Ok(ExportFile {
                filename: export_filename(kind.slug(), record.id(), format.extension()),
                mime_type: format.mime_type(),
                content,
            })
        }
        (_, JobResult::Document(_)) => Err(ExportError::NotTabular(record.id().to_string())),
    }
}
