use report_logging::{report_debug, report_info, report_warn};

use crate::{
    AppState, Effect, JobKind, JobRecord, JobState, Msg, Notification, NotificationLevel,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::JobSubmitted {
            job_id,
            kind,
            parameters,
            at,
        } => {
            let record = JobRecord::pending(job_id.clone(), kind, parameters, at);
            if !state.insert_pending(record) {
                report_warn!("Ignoring duplicate submission for job_id={}", job_id);
                return (state, Vec::new());
            }
            report_info!("Tracking job_id={} kind={}", job_id, kind);
            let message = match kind {
                JobKind::ThreadSummary => format!("Summary task {job_id} created successfully"),
                _ => format!("Task {job_id} generated successfully"),
            };
            vec![Effect::Notify(Notification::new(
                Some(job_id),
                NotificationLevel::Success,
                message,
            ))]
        }
        Msg::SubmissionFailed { kind, reason } => {
            report_warn!("Submission of {} failed: {}", kind, reason);
            let what = match kind {
                JobKind::ThreadSummary => "summary task",
                _ => "task",
            };
            vec![Effect::Notify(Notification::new(
                None,
                NotificationLevel::Error,
                format!("Error generating {what}: {reason}"),
            ))]
        }
        Msg::RefreshRequested { job_id } => {
            let Some(job) = state.job(&job_id) else {
                report_warn!("Refresh requested for unknown job_id={}", job_id);
                let message = format!("Task {job_id} not found");
                return (
                    state,
                    vec![Effect::Notify(Notification::new(
                        Some(job_id),
                        NotificationLevel::Error,
                        message,
                    ))],
                );
            };
            if job.is_terminal() {
                // Terminal jobs never go back to the service.
                let notification = status_notification(job);
                return (state, vec![Effect::Notify(notification)]);
            }
            let kind = job.kind();
            if !state.mark_in_flight(&job_id) {
                report_debug!("Refresh already in flight for job_id={}", job_id);
                let message = format!("{} {job_id} is already being checked", kind.label());
                return (
                    state,
                    vec![Effect::Notify(Notification::new(
                        Some(job_id),
                        NotificationLevel::Info,
                        message,
                    ))],
                );
            }
            vec![Effect::QueryStatus { job_id, kind }]
        }
        Msg::StatusReceived {
            job_id,
            outcome,
            at,
        } => {
            state.clear_in_flight(&job_id);
            let Some(job) = state.job_mut(&job_id) else {
                report_warn!("Status received for unknown job_id={}", job_id);
                return (state, Vec::new());
            };
            match outcome {
                Err(err) => {
                    report_warn!("Status query for job_id={} failed: {}", job_id, err);
                    let message = match job.kind() {
                        JobKind::ThreadSummary => format!("Error checking summary status: {err}"),
                        _ => format!("Error checking status: {err}"),
                    };
                    vec![Effect::Notify(Notification::new(
                        Some(job_id),
                        NotificationLevel::Error,
                        message,
                    ))]
                }
                Ok(report) => {
                    let before = job.status();
                    if job.apply_report(report, at) {
                        report_info!(
                            "Job job_id={} status {} -> {}",
                            job_id,
                            before,
                            job.status()
                        );
                    } else {
                        report_debug!("Ignoring late status for terminal job_id={}", job_id);
                    }
                    let notification = status_notification(job);
                    vec![Effect::Notify(notification)]
                }
            }
        }
    };

    (state, effects)
}

fn status_notification(job: &JobRecord) -> Notification {
    let label = job.kind().label();
    let id = job.id();
    let (level, message) = match job.state() {
        JobState::Pending => (
            NotificationLevel::Info,
            format!("{label} {id} is still pending"),
        ),
        JobState::Succeeded(_) => (
            NotificationLevel::Success,
            format!("{label} {id} completed successfully"),
        ),
        JobState::Failed(error) => (
            NotificationLevel::Error,
            format!("Error in {} {id}: {error}", label.to_lowercase()),
        ),
    };
    Notification::new(Some(id.to_string()), level, message)
}
