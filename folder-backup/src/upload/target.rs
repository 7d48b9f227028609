//! Where an archive is uploaded to.

use super::naming::default_object_key;
use crate::{BackupError, Result};
use chrono::Local;

pub const DEFAULT_REGION: &str = "us-east-1";

/// Bucket, object key and region of an upload.
///
/// Built with [`UploadTarget::new`] and adjusted with the `with_*` methods.
/// Passing an empty value to a `with_*` method keeps the current value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    bucket: String,
    key: String,
    region: String,
}

impl UploadTarget {
    /// Target `bucket` with the default region and today's default key
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: default_object_key(&Local::now()),
            region: DEFAULT_REGION.to_string(),
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        let region = region.into();
        if !region.trim().is_empty() {
            self.region = region;
        }
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        if !key.trim().is_empty() {
            self.key = key;
        }
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Bucket and key must be non-empty
    pub fn validate(&self) -> Result<()> {
        if self.bucket.trim().is_empty() {
            return Err(BackupError::InvalidInput("Invalid bucket name.".to_string()));
        }
        if self.key.trim().is_empty() {
            return Err(BackupError::InvalidInput("Invalid object name.".to_string()));
        }
        Ok(())
    }
}
