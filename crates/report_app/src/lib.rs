//! Command line front end for the report job service.
pub mod cli;
pub mod config;
pub mod run;

pub use cli::{Cli, Command, JobRequest};
pub use config::{AppConfig, ConfigError, LogTarget, DEFAULT_CONFIG_FILENAME};
pub use run::{run, run_job};
