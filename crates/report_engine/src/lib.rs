//! Report engine: remote job service transport, controller and sinks.
mod controller;
mod download;
mod notify;
mod service;

pub use controller::JobController;
pub use download::{ensure_output_dir, DownloadError, DownloadSink, FileDownloadSink, PersistError};
pub use notify::{ChannelNotificationSink, LogNotificationSink, NotificationSink};
pub use service::{JobService, ReqwestJobService, ServiceSettings, ServiceSetupError};
