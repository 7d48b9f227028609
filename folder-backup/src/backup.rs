//! A backup run: validate, archive, upload.
//!
//! The archive is fully built before the upload starts and is handed to the
//! uploader by value. The first error ends the run.

use crate::archive::{build_archive, ArchiveOptions};
use crate::upload::{ObjectStore, UploadTarget, Uploader};
use crate::utils::format::{compression_ratio, format_bytes, format_duration};
use crate::{BackupError, Result};
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::debug;

/// One invocation's worth of input
#[derive(Debug, Clone)]
pub struct BackupRequest {
    /// Directory to back up, relative to the working directory
    pub source: PathBuf,

    pub target: UploadTarget,

    /// Walk and staging settings
    pub archive: ArchiveOptions,
}

/// Summary of a finished run
#[derive(Debug, Clone)]
pub struct BackupReport {
    pub bucket: String,
    pub key: String,
    pub files: usize,
    pub uncompressed_bytes: u64,
    pub archive_bytes: u64,
    pub duration: Duration,
}

impl fmt::Display for BackupReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "s3://{}/{}: {} files, {} -> {} ({:.1}%) in {}",
            self.bucket,
            self.key,
            self.files,
            format_bytes(self.uncompressed_bytes),
            format_bytes(self.archive_bytes),
            compression_ratio(self.uncompressed_bytes, self.archive_bytes),
            format_duration(self.duration)
        )
    }
}

impl BackupRequest {
    pub fn new(source: impl Into<PathBuf>, target: UploadTarget) -> Self {
        Self {
            source: source.into(),
            target,
            archive: ArchiveOptions::default(),
        }
    }

    /// Stage the archive on disk instead of holding it in memory
    pub fn stage_to_disk(&self) -> bool {
        self.archive.stage_to_disk
    }

    /// Check the source directory and upload target.
    ///
    /// Runs before any archiving or network work.
    pub fn validate(&self) -> Result<()> {
        let source = self.source.as_path();

        if source.as_os_str().is_empty() {
            return Err(BackupError::InvalidInput(
                "You must provide a relative path to the directory.".to_string(),
            ));
        }

        if source.is_absolute() || source.has_root() {
            return Err(BackupError::InvalidInput(
                "Invalid path. It must be a relative path to a directory.".to_string(),
            ));
        }

        match std::fs::metadata(source) {
            Ok(metadata) if metadata.is_dir() => {}
            Ok(_) => {
                return Err(BackupError::InvalidInput(format!(
                    "Invalid path. {} is not a directory.",
                    source.display()
                )))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(BackupError::InvalidInput(
                    "Invalid path. Directory not found.".to_string(),
                ))
            }
            Err(e) => {
                return Err(BackupError::InvalidInput(format!("Invalid path: {}", e)));
            }
        }

        self.target.validate()
    }
}

/// Run a backup end to end with `uploader`.
pub async fn execute<S: ObjectStore>(
    request: &BackupRequest,
    uploader: &Uploader<S>,
) -> Result<BackupReport> {
    let start_time = Instant::now();

    request.validate()?;
    debug!("Backup request: {:?}", request);

    let archive = build_archive(&request.source, &request.archive)?;

    let mut report = BackupReport {
        bucket: request.target.bucket().to_string(),
        key: request.target.key().to_string(),
        files: archive.len(),
        uncompressed_bytes: archive.uncompressed_bytes(),
        archive_bytes: archive.size_bytes()?,
        duration: Duration::ZERO,
    };

    uploader.send(archive.into_body(), &request.target).await?;

    report.duration = start_time.elapsed();
    Ok(report)
}
