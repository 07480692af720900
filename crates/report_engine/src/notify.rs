use std::sync::mpsc;

use report_core::{Notification, NotificationLevel};
use report_logging::{report_info, report_warn};

/// Receives the short-lived notifications produced by submit and refresh.
///
/// The presentation layer owns the sink and decides how long to show each
/// notification (`Notification::ttl`).
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

pub struct ChannelNotificationSink {
    tx: mpsc::Sender<Notification>,
}

impl ChannelNotificationSink {
    pub fn new(tx: mpsc::Sender<Notification>) -> Self {
        Self { tx }
    }

    /// Sink plus the receiving end for the UI.
    pub fn channel() -> (Self, mpsc::Receiver<Notification>) {
        let (tx, rx) = mpsc::channel();
        (Self::new(tx), rx)
    }
}

impl NotificationSink for ChannelNotificationSink {
    fn notify(&self, notification: Notification) {
        let _ = self.tx.send(notification);
    }
}

/// Writes notifications to the log. Useful headless.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotificationSink;

impl NotificationSink for LogNotificationSink {
    fn notify(&self, notification: Notification) {
        let job = notification.job_id.as_deref().unwrap_or("-");
        match notification.level {
            NotificationLevel::Error => report_warn!("[{}] {}", job, notification.message),
            NotificationLevel::Info | NotificationLevel::Success => {
                report_info!("[{}] {}", job, notification.message)
            }
        }
    }
}
