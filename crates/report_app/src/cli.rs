use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use report_core::{ExportFormat, JobKind, JobParameters, LlmProvider};

use crate::config::DEFAULT_CONFIG_FILENAME;

/// Submit a report job, wait for it, and save the result.
#[derive(Debug, Parser)]
#[command(name = "report_app", version)]
pub struct Cli {
    /// More log output (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILENAME)]
    pub config: PathBuf,

    /// Base url of the job service; overrides the config file.
    #[arg(long, global = true, env = "REPORT_API_URL")]
    pub api_url: Option<String>,

    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Every message of a channel in a date range.
    Messages {
        #[command(flatten)]
        range: ChannelRange,
        #[arg(long, value_enum, default_value_t = FormatArg::Csv)]
        format: FormatArg,
    },
    /// The most active repliers of a channel in a date range.
    Repliers {
        #[command(flatten)]
        range: ChannelRange,
        #[arg(long)]
        top: Option<u32>,
        #[arg(long, value_enum, default_value_t = FormatArg::Csv)]
        format: FormatArg,
    },
    /// An LLM summary of one thread. Always saved as JSON.
    Summary {
        #[arg(long)]
        channel: String,
        #[arg(long)]
        thread_ts: String,
        #[arg(long, value_enum, default_value_t = ProviderArg::Openai)]
        provider: ProviderArg,
        #[arg(long)]
        model: String,
    },
}

#[derive(Debug, Clone, Args)]
pub struct ChannelRange {
    #[arg(long)]
    pub channel: String,
    /// First day, YYYY-MM-DD.
    #[arg(long)]
    pub start: NaiveDate,
    /// Last day, YYYY-MM-DD.
    #[arg(long)]
    pub end: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Csv,
    Json,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => ExportFormat::Csv,
            FormatArg::Json => ExportFormat::Json,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderArg {
    Openai,
    Ollama,
}

impl From<ProviderArg> for LlmProvider {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Openai => LlmProvider::OpenAi,
            ProviderArg::Ollama => LlmProvider::Ollama,
        }
    }
}

/// What to submit and how to save it.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRequest {
    pub kind: JobKind,
    pub parameters: JobParameters,
    pub format: ExportFormat,
}

impl Command {
    pub fn into_request(self) -> JobRequest {
        match self {
            Command::Messages { range, format } => JobRequest {
                kind: JobKind::MessagesReport,
                parameters: range.into_parameters(None),
                format: format.into(),
            },
            Command::Repliers { range, top, format } => JobRequest {
                kind: JobKind::RepliersReport,
                parameters: range.into_parameters(top),
                format: format.into(),
            },
            Command::Summary {
                channel,
                thread_ts,
                provider,
                model,
            } => JobRequest {
                kind: JobKind::ThreadSummary,
                parameters: JobParameters::Summary {
                    channel_id: channel,
                    thread_ts,
                    llm_provider: provider.into(),
                    model,
                },
                format: ExportFormat::Json,
            },
        }
    }
}

impl ChannelRange {
    fn into_parameters(self, top_n: Option<u32>) -> JobParameters {
        JobParameters::Report {
            channel_id: self.channel,
            start_date: self.start,
            end_date: self.end,
            top_n,
        }
    }
}
