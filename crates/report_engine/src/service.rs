use std::time::Duration;

use bytes::BytesMut;
use chrono::NaiveDate;
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use url::Url;

use report_core::{JobId, JobKind, JobParameters, StatusQueryError, SubmissionError};
use report_logging::{report_debug, report_warn};

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_response_bytes: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_response_bytes: 32 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceSetupError {
    #[error("invalid service url {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("http client setup failed: {0}")]
    Client(String),
}

/// The remote job service. Bodies come back as raw JSON; validation is the core's job.
#[async_trait::async_trait]
pub trait JobService: Send + Sync {
    async fn submit(
        &self,
        kind: JobKind,
        parameters: &JobParameters,
    ) -> Result<JobId, SubmissionError>;

    async fn query_status(&self, job_id: &str, kind: JobKind) -> Result<Value, StatusQueryError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestJobService {
    settings: ServiceSettings,
    base: Url,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ReportRequest<'a> {
    channel_id: &'a str,
    start_date: NaiveDate,
    end_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    top: Option<u32>,
}

#[derive(Debug, Serialize)]
struct SummaryRequest<'a> {
    channel_id: &'a str,
    thread_ts: &'a str,
    llm_provider: &'a str,
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(alias = "job_id")]
    task_id: Option<String>,
}

impl ReqwestJobService {
    pub fn new(settings: ServiceSettings) -> Result<Self, ServiceSetupError> {
        let invalid = |reason: String| ServiceSetupError::InvalidBaseUrl {
            url: settings.base_url.clone(),
            reason,
        };
        let base = Url::parse(&settings.base_url).map_err(|err| invalid(err.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {}", base.scheme())));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ServiceSetupError::Client(err.to_string()))?;

        Ok(Self {
            settings,
            base,
            client,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, String> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| format!("{} cannot be a base url", self.base))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn submit_body(kind: JobKind, parameters: &JobParameters) -> Result<Vec<u8>, SubmissionError> {
        let encoded = match parameters {
            JobParameters::Report {
                channel_id,
                start_date,
                end_date,
                top_n,
            } => serde_json::to_vec(&ReportRequest {
                channel_id,
                start_date: *start_date,
                end_date: *end_date,
                top: if kind == JobKind::RepliersReport {
                    *top_n
                } else {
                    None
                },
            }),
            JobParameters::Summary {
                channel_id,
                thread_ts,
                llm_provider,
                model,
            } => serde_json::to_vec(&SummaryRequest {
                channel_id,
                thread_ts,
                llm_provider: llm_provider.as_str(),
                model,
            }),
        };
        encoded.map_err(|err| SubmissionError::InvalidParameters(err.to_string()))
    }
}

fn submit_path(kind: JobKind) -> &'static str {
    match kind {
        JobKind::MessagesReport => "fetch-messages",
        JobKind::RepliersReport => "top-repliers",
        JobKind::ThreadSummary => "summarize-thread",
    }
}

#[async_trait::async_trait]
impl JobService for ReqwestJobService {
    async fn submit(
        &self,
        kind: JobKind,
        parameters: &JobParameters,
    ) -> Result<JobId, SubmissionError> {
        let url = self
            .endpoint(&[submit_path(kind)])
            .map_err(SubmissionError::Transport)?;
        let body = Self::submit_body(kind, parameters)?;
        report_debug!("POST {} kind={}", url, kind);

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|err| SubmissionError::Transport(describe(&err)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SubmissionError::HttpStatus(status.as_u16()));
        }
        let bytes = read_capped(response, self.settings.max_response_bytes)
            .await
            .map_err(SubmissionError::Transport)?;
        let parsed: SubmitResponse = serde_json::from_slice(&bytes)
            .map_err(|err| SubmissionError::MalformedResponse(err.to_string()))?;

        match parsed.task_id {
            Some(id) if !id.trim().is_empty() => Ok(id),
            _ => Err(SubmissionError::MalformedResponse(
                "response carries no task id".to_string(),
            )),
        }
    }

    async fn query_status(&self, job_id: &str, kind: JobKind) -> Result<Value, StatusQueryError> {
        let mut url = self
            .endpoint(&["task-status", job_id])
            .map_err(StatusQueryError::Transport)?;
        url.query_pairs_mut()
            .append_pair("task_name", kind.task_name());
        report_debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|err| StatusQueryError::Transport(describe(&err)))?;

        let status = response.status();
        let bytes = read_capped(response, self.settings.max_response_bytes)
            .await
            .map_err(StatusQueryError::Transport)?;
        let body = serde_json::from_slice::<Value>(&bytes);

        if !status.is_success() {
            // The service answers task failures with 500 and a FAILURE body.
            return match body {
                Ok(report) if is_failure_report(&report) => Ok(report),
                _ => {
                    report_warn!("Status query for job_id={} returned {}", job_id, status);
                    Err(StatusQueryError::HttpStatus(status.as_u16()))
                }
            };
        }
        body.map_err(|err| StatusQueryError::Malformed(err.to_string()))
    }
}

fn is_failure_report(body: &Value) -> bool {
    body.get("status").and_then(Value::as_str) == Some("FAILURE")
}

async fn read_capped(response: Response, max_bytes: u64) -> Result<BytesMut, String> {
    if let Some(len) = response.content_length() {
        if len > max_bytes {
            return Err(format!("response too large (max {max_bytes}, actual {len})"));
        }
    }
    let mut body = BytesMut::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|err| describe(&err))?;
        let next_len = body.len() as u64 + chunk.len() as u64;
        if next_len > max_bytes {
            return Err(format!(
                "response too large (max {max_bytes}, actual {next_len})"
            ));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

fn describe(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        return format!("timeout: {err}");
    }
    if err.is_connect() {
        return format!("connection failed: {err}");
    }
    match err.status() {
        Some(StatusCode::TOO_MANY_REQUESTS) => format!("rate limited: {err}"),
        _ => err.to_string(),
    }
}
