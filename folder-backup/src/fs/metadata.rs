//! File metadata carried into archive entry headers.
//!
//! Zip headers store a local, second-resolution timestamp and (on Unix) the
//! permission bits, so that is all this module extracts.

use chrono::{DateTime, Local, NaiveDateTime};
use std::fs::{File, Metadata};

/// Metadata of a file about to be archived
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    /// File size in bytes
    pub size: u64,

    /// Last modified time in local time, if the platform reports one
    pub modified: Option<NaiveDateTime>,

    /// File permissions (Unix mode bits)
    pub permissions: Option<u32>,
}

impl FileMetadata {
    /// Extract metadata from an already opened file
    pub fn from_file(file: &File) -> std::io::Result<Self> {
        Ok(Self::from_metadata(&file.metadata()?))
    }

    fn from_metadata(metadata: &Metadata) -> Self {
        let modified = metadata
            .modified()
            .ok()
            .map(|time| DateTime::<Local>::from(time).naive_local());

        #[cfg(unix)]
        let permissions = {
            use std::os::unix::fs::PermissionsExt;
            Some(metadata.permissions().mode())
        };

        #[cfg(not(unix))]
        let permissions = None;

        Self {
            size: metadata.len(),
            modified,
            permissions,
        }
    }
}
