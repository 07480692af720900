use std::time::Duration;

use crate::{JobId, JobKind};

/// How long a notification stays visible before the UI drops it.
pub const NOTIFICATION_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Ask the remote service for the current status of a job.
    QueryStatus { job_id: JobId, kind: JobKind },
    /// Show a short-lived toast.
    Notify(Notification),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// `None` when no job exists yet (failed submission).
    pub job_id: Option<JobId>,
    pub level: NotificationLevel,
    pub message: String,
    pub ttl: Duration,
}

impl Notification {
    pub fn new(job_id: Option<JobId>, level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            job_id,
            level,
            message: message.into(),
            ttl: NOTIFICATION_TTL,
        }
    }

    pub fn is_expired(&self, shown_for: Duration) -> bool {
        shown_for >= self.ttl
    }
}
