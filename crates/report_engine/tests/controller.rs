use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use report_core::{
    ExportError, ExportFile, ExportFormat, JobId, JobKind, JobParameters, JobStatus,
    LifecycleError, NotificationLevel, StatusQueryError, SubmissionError, NOTIFICATION_TTL,
};
use report_engine::{
    ChannelNotificationSink, DownloadError, DownloadSink, FileDownloadSink, JobController,
    JobService, LogNotificationSink, PersistError, ReqwestJobService, ServiceSettings,
};
use serde_json::{json, Value};
use tokio::sync::Notify;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Hands out a fixed job id and replays queued status bodies.
#[derive(Default)]
struct ScriptedService {
    job_id: String,
    statuses: Mutex<VecDeque<Result<Value, StatusQueryError>>>,
    status_calls: AtomicUsize,
    gate: Option<Arc<Notify>>,
}

impl ScriptedService {
    fn new(job_id: &str, statuses: Vec<Result<Value, StatusQueryError>>) -> Self {
        Self {
            job_id: job_id.to_string(),
            statuses: Mutex::new(statuses.into()),
            ..Self::default()
        }
    }

    fn calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl JobService for ScriptedService {
    async fn submit(
        &self,
        _kind: JobKind,
        _parameters: &JobParameters,
    ) -> Result<JobId, SubmissionError> {
        Ok(self.job_id.clone())
    }

    async fn query_status(&self, _job_id: &str, _kind: JobKind) -> Result<Value, StatusQueryError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(json!({ "status": "PENDING" })))
    }
}

#[derive(Default)]
struct RecordingSink {
    delivered: Mutex<Vec<ExportFile>>,
}

impl DownloadSink for RecordingSink {
    fn deliver(&self, file: &ExportFile) -> Result<PathBuf, PersistError> {
        self.delivered.lock().unwrap().push(file.clone());
        Ok(PathBuf::from(&file.filename))
    }
}

fn january() -> JobParameters {
    JobParameters::Report {
        channel_id: "C1".to_string(),
        start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        top_n: None,
    }
}

fn controller_with(service: Arc<ScriptedService>) -> JobController {
    JobController::new(service, Arc::new(LogNotificationSink))
}

#[tokio::test]
async fn january_messages_report_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/fetch-messages"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({ "task_id": "abc123" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/task-status/abc123"))
        .and(query_param("task_name", "fetch_messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "SUCCESS",
            "data": [{
                "author": "a",
                "message": "hi",
                "reactions": { "👍": 2 },
                "replies": [],
                "post_id": "p1"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let service = ReqwestJobService::new(ServiceSettings {
        base_url: server.uri(),
        ..ServiceSettings::default()
    })
    .unwrap();
    let (sink, notifications) = ChannelNotificationSink::channel();
    let controller = JobController::new(Arc::new(service), Arc::new(sink));

    let submitted = controller
        .submit(JobKind::MessagesReport, january())
        .await
        .unwrap();
    assert_eq!(submitted.id(), "abc123");
    assert_eq!(submitted.status(), JobStatus::Pending);

    let settled = controller.refresh("abc123").await.unwrap();
    assert_eq!(settled.status(), JobStatus::Succeeded);
    assert!(settled.last_updated_at() >= submitted.last_updated_at());
    assert_eq!(settled.created_at(), submitted.created_at());

    // Terminal: served from the store, the mock's expect(1) holds.
    let again = controller.refresh("abc123").await.unwrap();
    assert_eq!(again, settled);

    let dir = tempfile::tempdir().unwrap();
    let written = controller
        .download("abc123", ExportFormat::Csv, &FileDownloadSink::new(dir.path()))
        .unwrap();
    assert_eq!(written, dir.path().join("messages-report_abc123.csv"));
    assert_eq!(
        std::fs::read_to_string(&written).unwrap(),
        "author,message,post_id,reactions_count,reactions_list,replies_count,replies_list\n\
         a,hi,p1,2,👍:2,0,"
    );

    let messages: Vec<_> = notifications.try_iter().collect();
    let texts: Vec<&str> = messages.iter().map(|n| n.message.as_str()).collect();
    assert_eq!(
        texts,
        vec![
            "Task abc123 generated successfully",
            "Task abc123 completed successfully",
            "Task abc123 completed successfully",
        ]
    );
    assert!(messages.iter().all(|n| n.ttl == NOTIFICATION_TTL));
    assert!(messages
        .iter()
        .all(|n| n.job_id.as_deref() == Some("abc123")));
}

#[tokio::test]
async fn refresh_merges_pending_then_failure() {
    let service = Arc::new(ScriptedService::new(
        "job-1",
        vec![
            Ok(json!({ "status": "PENDING" })),
            Ok(json!({ "status": "FAILURE", "error": "channel_not_found" })),
        ],
    ));
    let controller = controller_with(service.clone());
    controller
        .submit(JobKind::MessagesReport, january())
        .await
        .unwrap();

    let first = controller.refresh("job-1").await.unwrap();
    assert_eq!(first.status(), JobStatus::Pending);

    let second = controller.refresh("job-1").await.unwrap();
    assert_eq!(second.status(), JobStatus::Failed);
    assert_eq!(second.error_message(), Some("channel_not_found"));
    assert_eq!(second.result(), None);

    controller.refresh("job-1").await.unwrap();
    assert_eq!(service.calls(), 2);
}

#[tokio::test]
async fn status_query_error_leaves_record_untouched() {
    let service = Arc::new(ScriptedService::new(
        "job-1",
        vec![Err(StatusQueryError::HttpStatus(502))],
    ));
    let (sink, notifications) = ChannelNotificationSink::channel();
    let controller = JobController::new(service, Arc::new(sink));
    let submitted = controller
        .submit(JobKind::MessagesReport, january())
        .await
        .unwrap();

    let err = controller.refresh("job-1").await.unwrap_err();
    assert_eq!(
        err,
        LifecycleError::StatusQuery {
            job_id: "job-1".to_string(),
            source: StatusQueryError::HttpStatus(502),
        }
    );
    assert_eq!(controller.job("job-1"), Some(submitted));
    assert!(!controller.view().jobs[0].refresh_in_flight);

    let last = notifications.try_iter().last().unwrap();
    assert_eq!(last.level, NotificationLevel::Error);
    assert_eq!(last.message, "Error checking status: HTTP error! status: 502");
}

#[tokio::test]
async fn unknown_job_is_not_found() {
    let service = Arc::new(ScriptedService::new("job-1", vec![]));
    let controller = controller_with(service.clone());

    let err = controller.refresh("missing").await.unwrap_err();
    assert_eq!(err, LifecycleError::NotFound("missing".to_string()));
    assert_eq!(service.calls(), 0);
    assert!(matches!(
        controller.export("missing", ExportFormat::Csv),
        Err(DownloadError::UnknownJob(_))
    ));
}

#[tokio::test]
async fn invalid_parameters_never_reach_the_service() {
    let service = Arc::new(ScriptedService::new("job-1", vec![]));
    let (sink, notifications) = ChannelNotificationSink::channel();
    let controller = JobController::new(service, Arc::new(sink));

    let err = controller
        .submit(JobKind::ThreadSummary, january())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::Submission(SubmissionError::InvalidParameters(_))
    ));
    assert!(controller.jobs().is_empty());

    let notice = notifications.try_recv().unwrap();
    assert_eq!(notice.level, NotificationLevel::Error);
    assert!(notice.message.starts_with("Error generating summary task: "));
}

#[tokio::test]
async fn concurrent_refresh_of_same_job_is_rejected() {
    let gate = Arc::new(Notify::new());
    let service = Arc::new(ScriptedService {
        job_id: "job-1".to_string(),
        statuses: Mutex::new(VecDeque::from(vec![Ok(json!({
            "status": "SUCCESS",
            "data": [{ "user": "U1", "count": 3 }]
        }))])),
        status_calls: AtomicUsize::new(0),
        gate: Some(gate.clone()),
    });
    let (sink, notifications) = ChannelNotificationSink::channel();
    let controller = JobController::new(service.clone(), Arc::new(sink));
    controller
        .submit(JobKind::RepliersReport, january())
        .await
        .unwrap();

    let first = controller.refresh("job-1");
    let second = async {
        let outcome = controller.refresh("job-1").await;
        gate.notify_one();
        outcome
    };
    let (first, second) = tokio::join!(first, second);

    assert_eq!(
        second.unwrap_err(),
        LifecycleError::RefreshInFlight("job-1".to_string())
    );
    assert_eq!(first.unwrap().status(), JobStatus::Succeeded);
    assert_eq!(service.calls(), 1);

    let texts: Vec<String> = notifications.try_iter().map(|n| n.message).collect();
    assert_eq!(
        texts,
        vec![
            "Task job-1 generated successfully",
            "Task job-1 is already being checked",
            "Task job-1 completed successfully",
        ]
    );
}

#[tokio::test]
async fn dropped_refresh_releases_in_flight_mark() {
    let gate = Arc::new(Notify::new());
    let service = Arc::new(ScriptedService {
        job_id: "job-1".to_string(),
        gate: Some(gate.clone()),
        ..ScriptedService::default()
    });
    let controller = controller_with(service.clone());
    controller
        .submit(JobKind::MessagesReport, january())
        .await
        .unwrap();

    let timed_out = tokio::time::timeout(Duration::from_millis(20), controller.refresh("job-1")).await;
    assert!(timed_out.is_err());
    assert!(!controller.view().jobs[0].refresh_in_flight);
    assert_eq!(controller.job("job-1").unwrap().status(), JobStatus::Pending);
}

#[tokio::test]
async fn poll_until_terminal_retries_through_errors() {
    let service = Arc::new(ScriptedService::new(
        "job-1",
        vec![
            Ok(json!({ "status": "PENDING" })),
            Err(StatusQueryError::Transport("reset".to_string())),
            Ok(json!({ "status": "SUCCESS", "data": [{ "user": "U1", "count": 1 }] })),
        ],
    ));
    let controller = controller_with(service.clone());
    controller
        .submit(JobKind::RepliersReport, january())
        .await
        .unwrap();

    let record = controller
        .poll_until_terminal("job-1", Duration::from_millis(1), 10)
        .await
        .unwrap();
    assert_eq!(record.status(), JobStatus::Succeeded);
    assert_eq!(service.calls(), 3);
}

#[tokio::test]
async fn poll_gives_up_after_max_polls() {
    let service = Arc::new(ScriptedService::new("job-1", vec![]));
    let controller = controller_with(service.clone());
    controller
        .submit(JobKind::MessagesReport, january())
        .await
        .unwrap();

    let record = controller
        .poll_until_terminal("job-1", Duration::from_millis(1), 3)
        .await
        .unwrap();
    assert_eq!(record.status(), JobStatus::Pending);
    assert_eq!(service.calls(), 3);
}

#[tokio::test]
async fn empty_result_never_reaches_the_sink() {
    let service = Arc::new(ScriptedService::new(
        "job-1",
        vec![Ok(json!({ "status": "SUCCESS", "data": [] }))],
    ));
    let controller = controller_with(service);
    controller
        .submit(JobKind::MessagesReport, january())
        .await
        .unwrap();
    controller.refresh("job-1").await.unwrap();

    let sink = RecordingSink::default();
    let err = controller
        .download("job-1", ExportFormat::Csv, &sink)
        .unwrap_err();
    assert!(matches!(err, DownloadError::Export(ExportError::Empty)));
    assert!(sink.delivered.lock().unwrap().is_empty());
}

#[tokio::test]
async fn pending_job_download_is_not_ready() {
    let service = Arc::new(ScriptedService::new("job-1", vec![]));
    let controller = controller_with(service);
    controller
        .submit(JobKind::MessagesReport, january())
        .await
        .unwrap();

    let sink = RecordingSink::default();
    assert!(matches!(
        controller.download("job-1", ExportFormat::Json, &sink),
        Err(DownloadError::Export(ExportError::NotReady(_)))
    ));
    assert!(sink.delivered.lock().unwrap().is_empty());
}
