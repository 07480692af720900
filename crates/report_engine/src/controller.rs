use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use report_core::{
    export_job, parse_status_report, update, AppState, AppViewModel, Effect, ExportFile,
    ExportFormat, JobKind, JobParameters, JobRecord, LifecycleError, Msg, StatusQueryError,
    SubmissionError,
};
use report_logging::{report_debug, report_info, report_warn};

use crate::download::{DownloadError, DownloadSink};
use crate::notify::NotificationSink;
use crate::service::JobService;

/// Owns the job store and drives it against the remote service.
///
/// The store lock is only held while a message is applied, never across a
/// remote call, so refreshes of different jobs can run concurrently.
pub struct JobController {
    service: Arc<dyn JobService>,
    notifications: Arc<dyn NotificationSink>,
    state: Mutex<AppState>,
}

impl JobController {
    pub fn new(service: Arc<dyn JobService>, notifications: Arc<dyn NotificationSink>) -> Self {
        Self {
            service,
            notifications,
            state: Mutex::new(AppState::new()),
        }
    }

    /// Submits a job and starts tracking it as the newest entry.
    pub async fn submit(
        &self,
        kind: JobKind,
        parameters: JobParameters,
    ) -> Result<JobRecord, LifecycleError> {
        if let Err(err) = parameters.validate_for(kind) {
            return Err(self.reject_submission(kind, err));
        }

        let job_id = match self.service.submit(kind, &parameters).await {
            Ok(job_id) => job_id,
            Err(err) => return Err(self.reject_submission(kind, err)),
        };
        if self.job(&job_id).is_some() {
            let err = SubmissionError::MalformedResponse(format!("duplicate job id {job_id}"));
            return Err(self.reject_submission(kind, err));
        }

        report_info!("Submitted {} job_id={}", kind, job_id);
        self.dispatch(
            Msg::JobSubmitted {
                job_id: job_id.clone(),
                kind,
                parameters,
                at: Utc::now(),
            },
            |_| (),
        );
        self.job(&job_id)
            .ok_or_else(|| LifecycleError::NotFound(job_id))
    }

    /// Checks the remote status of a job and merges it into the store.
    ///
    /// Terminal jobs are returned as they are without contacting the service.
    /// A second refresh of the same job while one is outstanding fails with
    /// [`LifecycleError::RefreshInFlight`].
    pub async fn refresh(&self, job_id: &str) -> Result<JobRecord, LifecycleError> {
        let (prior, effects) = self.dispatch(
            Msg::RefreshRequested {
                job_id: job_id.to_string(),
            },
            |state| state.job(job_id).cloned(),
        );
        let Some(prior) = prior else {
            return Err(LifecycleError::NotFound(job_id.to_string()));
        };
        let Some(kind) = effects.iter().find_map(|effect| match effect {
            Effect::QueryStatus { kind, .. } => Some(*kind),
            Effect::Notify(_) => None,
        }) else {
            if prior.is_terminal() {
                return Ok(prior);
            }
            return Err(LifecycleError::RefreshInFlight(job_id.to_string()));
        };

        let mut pending = PendingRefresh {
            controller: self,
            job_id,
            settled: false,
        };
        let outcome = match self.service.query_status(job_id, kind).await {
            Ok(body) => parse_status_report(kind, &body),
            Err(err) => Err(err),
        };
        let failure = outcome.as_ref().err().cloned();
        pending.settle(outcome);

        if let Some(source) = failure {
            return Err(LifecycleError::StatusQuery {
                job_id: job_id.to_string(),
                source,
            });
        }
        self.job(job_id)
            .ok_or_else(|| LifecycleError::NotFound(job_id.to_string()))
    }

    /// Refreshes until the job is terminal or `max_polls` checks were made.
    ///
    /// Status query errors are transient and only logged; the last known
    /// record is returned either way.
    pub async fn poll_until_terminal(
        &self,
        job_id: &str,
        interval: Duration,
        max_polls: u32,
    ) -> Result<JobRecord, LifecycleError> {
        for attempt in 1..=max_polls {
            match self.refresh(job_id).await {
                Ok(record) if record.is_terminal() => return Ok(record),
                Ok(_) => report_debug!("job_id={} pending after poll {}", job_id, attempt),
                Err(LifecycleError::StatusQuery { source, .. }) => {
                    report_warn!("Poll {} for job_id={} failed: {}", attempt, job_id, source)
                }
                Err(err) => return Err(err),
            }
            if attempt < max_polls {
                tokio::time::sleep(interval).await;
            }
        }
        self.job(job_id)
            .ok_or_else(|| LifecycleError::NotFound(job_id.to_string()))
    }

    /// Renders the result of a succeeded job.
    pub fn export(&self, job_id: &str, format: ExportFormat) -> Result<ExportFile, DownloadError> {
        let state = self.lock_state();
        let record = state
            .job(job_id)
            .ok_or_else(|| DownloadError::UnknownJob(job_id.to_string()))?;
        Ok(export_job(record, format)?)
    }

    /// Exports a job and hands the file to `sink`. Nothing reaches the sink
    /// when the export fails.
    pub fn download(
        &self,
        job_id: &str,
        format: ExportFormat,
        sink: &dyn DownloadSink,
    ) -> Result<std::path::PathBuf, DownloadError> {
        let file = self.export(job_id, format)?;
        Ok(sink.deliver(&file)?)
    }

    /// Snapshot of all jobs, newest first.
    pub fn jobs(&self) -> Vec<JobRecord> {
        self.lock_state().jobs().to_vec()
    }

    pub fn job(&self, job_id: &str) -> Option<JobRecord> {
        self.lock_state().job(job_id).cloned()
    }

    pub fn view(&self) -> AppViewModel {
        self.lock_state().view()
    }

    fn reject_submission(&self, kind: JobKind, err: SubmissionError) -> LifecycleError {
        self.dispatch(
            Msg::SubmissionFailed {
                kind,
                reason: err.to_string(),
            },
            |_| (),
        );
        LifecycleError::Submission(err)
    }

    /// Applies `msg` under the lock, after letting `observe` look at the state
    /// it is applied to. Notifications are delivered once the lock is released;
    /// the remaining effects are returned.
    fn dispatch<T>(&self, msg: Msg, observe: impl FnOnce(&AppState) -> T) -> (T, Vec<Effect>) {
        let (observed, effects) = {
            let mut guard = self.lock_state();
            let observed = observe(&guard);
            let state = std::mem::take(&mut *guard);
            let (state, effects) = update(state, msg);
            *guard = state;
            (observed, effects)
        };

        let mut remaining = Vec::new();
        for effect in effects {
            match effect {
                Effect::Notify(notification) => self.notifications.notify(notification),
                other => remaining.push(other),
            }
        }
        (observed, remaining)
    }

    fn lock_state(&self) -> MutexGuard<'_, AppState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears the in-flight mark if a refresh future is dropped before its
/// response is applied.
struct PendingRefresh<'a> {
    controller: &'a JobController,
    job_id: &'a str,
    settled: bool,
}

impl PendingRefresh<'_> {
    fn settle(&mut self, outcome: Result<report_core::StatusReport, StatusQueryError>) {
        self.settled = true;
        self.controller.dispatch(
            Msg::StatusReceived {
                job_id: self.job_id.to_string(),
                outcome,
                at: Utc::now(),
            },
            |_| (),
        );
    }
}

impl Drop for PendingRefresh<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.settle(Err(StatusQueryError::Cancelled));
        }
    }
}
