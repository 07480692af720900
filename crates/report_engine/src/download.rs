use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use report_core::{ExportError, ExportFile, JobId};
use report_logging::report_info;
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("job {0} not found")]
    UnknownJob(JobId),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("delivering download failed: {0}")]
    Persist(#[from] PersistError),
}

/// Makes an exported file available to the user.
pub trait DownloadSink: Send + Sync {
    /// Returns where the file ended up.
    fn deliver(&self, file: &ExportFile) -> Result<PathBuf, PersistError>;
}

/// Writes downloads into a directory. Each file is written to a temp file first
/// and renamed into place, so a failed write leaves no partial file.
#[derive(Debug, Clone)]
pub struct FileDownloadSink {
    dir: PathBuf,
}

impl FileDownloadSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl DownloadSink for FileDownloadSink {
    fn deliver(&self, file: &ExportFile) -> Result<PathBuf, PersistError> {
        ensure_output_dir(&self.dir)?;

        let target = self.dir.join(&file.filename);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(file.content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist(&target).map_err(|err| PersistError::Io(err.error))?;

        report_info!(
            "Wrote {} ({}, {} bytes)",
            target.display(),
            file.mime_type,
            file.content.len()
        );
        Ok(target)
    }
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))
}
