//! The object storage seam.

use crate::archive::ArchiveBody;
use crate::Result;
use async_trait::async_trait;

/// A store that accepts one whole object per call.
///
/// Implementations make exactly one attempt; retrying is not their job.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_object(&self, bucket: &str, key: &str, body: ArchiveBody) -> Result<()>;
}
