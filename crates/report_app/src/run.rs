use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;

use anyhow::{bail, Context};
use report_core::{JobStatus, Notification, NotificationLevel, UNKNOWN_ERROR};
use report_engine::{ChannelNotificationSink, FileDownloadSink, JobController, ReqwestJobService};
use report_logging::{level_for_verbosity, report_info};

use crate::cli::{Cli, JobRequest};
use crate::config::AppConfig;

/// Resolves configuration, sets up logging and runs one job to completion.
pub async fn run(cli: Cli) -> anyhow::Result<PathBuf> {
    let loaded = AppConfig::load(&cli.config)?;
    let found = loaded.is_some();
    let mut config = loaded.unwrap_or_default().with_api_url(cli.api_url);
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    report_logging::initialize(
        config.log_destination.into(),
        level_for_verbosity(cli.verbose),
        &config.log_file,
    );
    if !found {
        report_info!("No config at {:?}; using defaults", cli.config);
    }
    report_info!("Using job service at {}", config.api_base_url);

    let service = ReqwestJobService::new(config.service_settings())?;
    let (sink, notifications) = ChannelNotificationSink::channel();
    let printer = thread::spawn(move || print_notifications(notifications));

    let controller = JobController::new(Arc::new(service), Arc::new(sink));
    let outcome = run_job(&controller, &config, cli.command.into_request()).await;

    // Closes the channel so the printer drains and exits.
    drop(controller);
    let _ = printer.join();
    outcome
}

/// Submits `request`, polls it to a terminal state and writes the export.
pub async fn run_job(
    controller: &JobController,
    config: &AppConfig,
    request: JobRequest,
) -> anyhow::Result<PathBuf> {
    let submitted = controller.submit(request.kind, request.parameters).await?;
    let job_id = submitted.id().to_string();

    let record = controller
        .poll_until_terminal(&job_id, config.poll_interval(), config.max_polls)
        .await?;
    for row in controller.view().jobs {
        report_info!(
            "{} {} channel={} {} {}",
            row.job_id,
            row.kind,
            row.channel_id,
            row.status,
            row.records_label()
                .or_else(|| row.error.clone())
                .unwrap_or_default()
        );
    }

    match record.status() {
        JobStatus::Pending => bail!(
            "job {} still pending after {} status checks",
            job_id,
            config.max_polls
        ),
        JobStatus::Failed => bail!(
            "job {} failed: {}",
            job_id,
            record.error_message().unwrap_or(UNKNOWN_ERROR)
        ),
        JobStatus::Succeeded => {}
    }

    let sink = FileDownloadSink::new(&config.output_dir);
    controller
        .download(&job_id, request.format, &sink)
        .with_context(|| format!("saving result of job {job_id}"))
}

fn print_notifications(notifications: mpsc::Receiver<Notification>) {
    for notification in notifications {
        match notification.level {
            NotificationLevel::Error => eprintln!("error: {}", notification.message),
            NotificationLevel::Info | NotificationLevel::Success => {
                println!("{}", notification.message)
            }
        }
    }
}
