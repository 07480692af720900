use std::sync::Once;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use report_core::{
    update, AppState, Effect, JobKind, JobParameters, JobResult, JobStatus, Msg,
    NotificationLevel, StatusQueryError, StatusReport, NOTIFICATION_TTL,
};
use serde_json::json;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(report_logging::initialize_for_tests);
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap()
}

fn report_params(channel: &str) -> JobParameters {
    JobParameters::Report {
        channel_id: channel.to_string(),
        start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        top_n: None,
    }
}

fn submitted(state: AppState, job_id: &str) -> AppState {
    let (state, _) = update(
        state,
        Msg::JobSubmitted {
            job_id: job_id.to_string(),
            kind: JobKind::MessagesReport,
            parameters: report_params("C1"),
            at: t0(),
        },
    );
    state
}

fn receive(state: AppState, job_id: &str, report: StatusReport, minutes: i64) -> (AppState, Vec<Effect>) {
    update(
        state,
        Msg::StatusReceived {
            job_id: job_id.to_string(),
            outcome: Ok(report),
            at: t0() + Duration::minutes(minutes),
        },
    )
}

fn notification_messages(effects: &[Effect]) -> Vec<String> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::Notify(notification) => Some(notification.message.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn submitted_job_is_pending_and_becomes_head() {
    init_logging();
    let state = submitted(AppState::new(), "job-1");
    let (state, effects) = update(
        state,
        Msg::JobSubmitted {
            job_id: "job-2".to_string(),
            kind: JobKind::RepliersReport,
            parameters: report_params("C2"),
            at: t0(),
        },
    );

    let ids: Vec<_> = state.jobs().iter().map(|job| job.id().to_string()).collect();
    assert_eq!(ids, vec!["job-2", "job-1"]);
    assert_eq!(state.jobs()[0].status(), JobStatus::Pending);
    assert!(state.jobs()[0].result().is_none());
    assert!(state.jobs()[0].error_message().is_none());
    assert_eq!(
        notification_messages(&effects),
        vec!["Task job-2 generated successfully"]
    );
}

#[test]
fn duplicate_submission_is_ignored() {
    init_logging();
    let state = submitted(AppState::new(), "job-1");
    let before = state.clone();
    let (state, effects) = update(
        state,
        Msg::JobSubmitted {
            job_id: "job-1".to_string(),
            kind: JobKind::ThreadSummary,
            parameters: report_params("other"),
            at: t0() + Duration::hours(1),
        },
    );
    assert_eq!(state.jobs(), before.jobs());
    assert!(effects.is_empty());
}

#[test]
fn failed_submission_notifies_without_job() {
    init_logging();
    let (state, effects) = update(
        AppState::new(),
        Msg::SubmissionFailed {
            kind: JobKind::ThreadSummary,
            reason: "connection refused".to_string(),
        },
    );
    assert!(state.jobs().is_empty());
    match effects.as_slice() {
        [Effect::Notify(notification)] => {
            assert_eq!(notification.job_id, None);
            assert_eq!(notification.level, NotificationLevel::Error);
            assert_eq!(
                notification.message,
                "Error generating summary task: connection refused"
            );
            assert_eq!(notification.ttl, NOTIFICATION_TTL);
            assert!(!notification.is_expired(std::time::Duration::from_millis(4999)));
            assert!(notification.is_expired(std::time::Duration::from_secs(5)));
        }
        other => panic!("unexpected effects {other:?}"),
    }
}

#[test]
fn refresh_emits_single_query_while_in_flight() {
    init_logging();
    let state = submitted(AppState::new(), "job-1");

    let (state, effects) = update(
        state,
        Msg::RefreshRequested {
            job_id: "job-1".to_string(),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::QueryStatus {
            job_id: "job-1".to_string(),
            kind: JobKind::MessagesReport,
        }]
    );
    assert!(state.is_refresh_in_flight("job-1"));

    let (state, effects) = update(
        state,
        Msg::RefreshRequested {
            job_id: "job-1".to_string(),
        },
    );
    match effects.as_slice() {
        [Effect::Notify(notification)] => {
            assert_eq!(notification.job_id.as_deref(), Some("job-1"));
            assert_eq!(notification.level, NotificationLevel::Info);
            assert_eq!(notification.message, "Task job-1 is already being checked");
        }
        other => panic!("expected a single notification, got {other:?}"),
    }
    assert!(state.is_refresh_in_flight("job-1"));

    let (state, _) = receive(state, "job-1", StatusReport::Pending, 1);
    assert!(!state.is_refresh_in_flight("job-1"));
}

#[test]
fn refresh_of_unknown_job_notifies_error() {
    init_logging();
    let (state, effects) = update(
        AppState::new(),
        Msg::RefreshRequested {
            job_id: "ghost".to_string(),
        },
    );
    assert!(!state.is_refresh_in_flight("ghost"));
    assert_eq!(notification_messages(&effects), vec!["Task ghost not found"]);
}

#[test]
fn pending_report_only_advances_timestamp() {
    init_logging();
    let state = submitted(AppState::new(), "job-1");
    let (state, effects) = receive(state, "job-1", StatusReport::Pending, 3);

    let job = &state.jobs()[0];
    assert_eq!(job.status(), JobStatus::Pending);
    assert_eq!(job.created_at(), t0());
    assert_eq!(job.last_updated_at(), t0() + Duration::minutes(3));
    assert_eq!(
        notification_messages(&effects),
        vec!["Task job-1 is still pending"]
    );
}

#[test]
fn success_attaches_result() {
    init_logging();
    let state = submitted(AppState::new(), "job-1");
    let records = vec![json!({ "user": "U1", "count": 4 })];
    let (state, effects) = receive(
        state,
        "job-1",
        StatusReport::Succeeded(JobResult::Records(records.clone())),
        2,
    );

    let job = state.job("job-1").unwrap();
    assert_eq!(job.status(), JobStatus::Succeeded);
    assert_eq!(job.result(), Some(&JobResult::Records(records)));
    assert!(job.error_message().is_none());
    assert_eq!(
        notification_messages(&effects),
        vec!["Task job-1 completed successfully"]
    );
    assert_eq!(state.view().jobs[0].records_label().as_deref(), Some("1 record"));
}

#[test]
fn failure_attaches_error_message() {
    init_logging();
    let state = submitted(AppState::new(), "job-1");
    let (state, effects) = receive(
        state,
        "job-1",
        StatusReport::Failed("rate limited".to_string()),
        2,
    );

    let job = state.job("job-1").unwrap();
    assert_eq!(job.status(), JobStatus::Failed);
    assert_eq!(job.error_message(), Some("rate limited"));
    assert!(job.result().is_none());
    assert_eq!(
        notification_messages(&effects),
        vec!["Error in task job-1: rate limited"]
    );
}

#[test]
fn terminal_job_is_never_changed_by_later_reports() {
    init_logging();
    let state = submitted(AppState::new(), "job-1");
    let (state, _) = receive(
        state,
        "job-1",
        StatusReport::Succeeded(JobResult::Records(vec![json!({ "user": "U1", "count": 1 })])),
        1,
    );
    let settled = state.job("job-1").unwrap().clone();

    // A refresh on a terminal job never reaches the service.
    let (state, effects) = update(
        state,
        Msg::RefreshRequested {
            job_id: "job-1".to_string(),
        },
    );
    assert!(!effects
        .iter()
        .any(|effect| matches!(effect, Effect::QueryStatus { .. })));
    assert_eq!(
        notification_messages(&effects),
        vec!["Task job-1 completed successfully"]
    );

    // A late response claiming a different outcome is ignored.
    let (state, _) = receive(state, "job-1", StatusReport::Failed("boom".to_string()), 9);
    let (state, _) = receive(state, "job-1", StatusReport::Pending, 10);
    assert_eq!(state.job("job-1").unwrap(), &settled);
}

#[test]
fn query_error_leaves_record_untouched() {
    init_logging();
    let state = submitted(AppState::new(), "job-1");
    let (state, _) = update(
        state,
        Msg::RefreshRequested {
            job_id: "job-1".to_string(),
        },
    );
    let before = state.job("job-1").unwrap().clone();

    let (state, effects) = update(
        state,
        Msg::StatusReceived {
            job_id: "job-1".to_string(),
            outcome: Err(StatusQueryError::HttpStatus(502)),
            at: t0() + Duration::minutes(5),
        },
    );

    assert_eq!(state.job("job-1").unwrap(), &before);
    assert!(!state.is_refresh_in_flight("job-1"));
    assert_eq!(
        notification_messages(&effects),
        vec!["Error checking status: HTTP error! status: 502"]
    );
}

#[test]
fn updates_are_in_place_and_keep_order() {
    init_logging();
    let state = submitted(AppState::new(), "a");
    let state = submitted(state, "b");
    let state = submitted(state, "c");
    let (state, _) = receive(state, "b", StatusReport::Failed("x".to_string()), 1);

    let ids: Vec<_> = state.view().jobs.iter().map(|row| row.job_id.clone()).collect();
    assert_eq!(ids, vec!["c", "b", "a"]);
    assert_eq!(state.view().jobs[1].status, JobStatus::Failed);
}
