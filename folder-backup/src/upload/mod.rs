//! Single-object upload of a finished archive.
//!
//! One put per run: no multipart, no retry. A failed attempt is returned to
//! the caller as is. The put is raced against an optional deadline.

pub mod naming;
pub mod s3;
pub mod store;
pub mod target;

pub use naming::{default_object_key, unique_object_key};
pub use s3::S3Store;
pub use store::ObjectStore;
pub use target::{UploadTarget, DEFAULT_REGION};

use crate::archive::ArchiveBody;
use crate::utils::format::format_bytes;
use crate::{BackupError, Result};
use std::time::Duration;
use tracing::info;

pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// Sends archives to an [`ObjectStore`]
pub struct Uploader<S> {
    store: S,
    timeout: Option<Duration>,
}

impl<S: ObjectStore> Uploader<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            timeout: Some(DEFAULT_UPLOAD_TIMEOUT),
        }
    }

    /// Deadline for the put; `None` leaves it to the client's own timeouts
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Upload `body` to `target` with exactly one put.
    pub async fn send(&self, body: ArchiveBody, target: &UploadTarget) -> Result<()> {
        target.validate()?;

        info!(
            "Uploading folder ({}) to s3://{}/{}",
            format_bytes(body.size_bytes()?),
            target.bucket(),
            target.key()
        );

        let put = self.store.put_object(target.bucket(), target.key(), body);
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, put)
                .await
                .map_err(|_| BackupError::Timeout(limit))??,
            None => put.await?,
        }

        info!("Upload complete");
        Ok(())
    }
}
