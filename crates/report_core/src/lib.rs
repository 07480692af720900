//! Report core: job store, lifecycle state machine, result discrimination and export.
mod document;
mod effect;
mod error;
mod export;
mod filename;
mod msg;
pub mod shape;
mod state;
mod status;
pub mod tabular;
mod update;
mod view_model;

pub use document::to_document;
pub use effect::{Effect, Notification, NotificationLevel, NOTIFICATION_TTL};
pub use error::{
    ExportError, LifecycleError, StatusQueryError, SubmissionError, UnrecognizedShapeError,
};
pub use export::{export_job, ExportFile, ExportFormat, CSV_MIME, JSON_MIME};
pub use filename::export_filename;
pub use msg::Msg;
pub use shape::{classify, RecordShape, ReplierShape};
pub use state::{
    AppState, JobId, JobKind, JobParameters, JobRecord, JobResult, JobState, JobStatus,
    LlmProvider,
};
pub use status::{parse_status_report, StatusReport, UNKNOWN_ERROR};
pub use tabular::to_csv;
pub use update::update;
pub use view_model::{AppViewModel, JobRowView};
