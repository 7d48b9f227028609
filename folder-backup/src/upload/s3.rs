//! S3 implementation of [`ObjectStore`].
//!
//! Works with AWS S3 and S3-compatible services (MinIO, Wasabi, ...) through
//! a custom endpoint. Credentials come from the SDK's default provider chain.

use super::store::ObjectStore;
use crate::archive::ArchiveBody;
use crate::{BackupError, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::provider::error::CredentialsError;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::put_object::PutObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::error::Error;
use std::io;
use tracing::{debug, info};

const AUTH_ERROR_CODES: &[&str] = &[
    "AccessDenied",
    "InvalidAccessKeyId",
    "SignatureDoesNotMatch",
    "ExpiredToken",
    "InvalidToken",
];

/// S3 client bound to one region
pub struct S3Store {
    client: Client,
}

impl S3Store {
    /// Create a client for `region`, optionally against a custom endpoint
    pub async fn connect(region: &str, endpoint: Option<&str>) -> Self {
        info!("Creating S3 client for region {}", region);

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;

        let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&sdk_config);

        if let Some(endpoint_url) = endpoint {
            debug!("Using custom S3 endpoint: {}", endpoint_url);
            s3_config_builder = s3_config_builder
                .endpoint_url(endpoint_url)
                .force_path_style(true);
        }

        Self {
            client: Client::from_conf(s3_config_builder.build()),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put_object(&self, bucket: &str, key: &str, body: ArchiveBody) -> Result<()> {
        let length = i64::try_from(body.size_bytes()?)
            .map_err(|_| BackupError::InvalidInput("archive too large".to_string()))?;

        // A staged file has to outlive the request that streams it
        let (stream, _staged) = match body {
            ArchiveBody::InMemory(bytes) => (ByteStream::from(bytes), None),
            ArchiveBody::Staged(file) => {
                let stream = ByteStream::from_path(file.path())
                    .await
                    .map_err(io::Error::other)?;
                (stream, Some(file))
            }
        };

        debug!("PutObject s3://{}/{} ({} bytes)", bucket, key, length);
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type("application/zip")
            .content_length(length)
            .body(stream)
            .send()
            .await
            .map_err(|e| classify_sdk_error(bucket, e))?;

        Ok(())
    }
}

fn classify_sdk_error(bucket: &str, err: SdkError<PutObjectError>) -> BackupError {
    let detail = DisplayErrorContext(&err).to_string();

    match &err {
        SdkError::ServiceError(context) => classify_service_error(
            bucket,
            context.err().code(),
            context.raw().status().as_u16(),
            detail,
        ),
        SdkError::ConstructionFailure(_) | SdkError::DispatchFailure(_)
            if caused_by_credentials(&err) =>
        {
            BackupError::Authentication(detail)
        }
        _ => BackupError::Network(detail),
    }
}

/// True when a credentials provider failure sits anywhere in the source chain
fn caused_by_credentials(err: &(dyn Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.downcast_ref::<CredentialsError>().is_some() {
            return true;
        }
        current = e.source();
    }
    false
}

/// Map a provider error code and HTTP status onto the error taxonomy
fn classify_service_error(
    bucket: &str,
    code: Option<&str>,
    status: u16,
    detail: String,
) -> BackupError {
    match (code, status) {
        (Some("NoSuchBucket"), _) | (None, 404) => BackupError::BucketNotFound(bucket.to_string()),
        (Some(code), _) if AUTH_ERROR_CODES.contains(&code) => BackupError::Authentication(detail),
        (_, 401) | (_, 403) => BackupError::Authentication(detail),
        _ => BackupError::Network(detail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::error::ConnectorError;

    fn classify(code: Option<&str>, status: u16) -> BackupError {
        classify_service_error("backups", code, status, "detail".to_string())
    }

    #[test]
    fn test_missing_bucket() {
        match classify(Some("NoSuchBucket"), 404) {
            BackupError::BucketNotFound(bucket) => assert_eq!(bucket, "backups"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(classify(None, 404), BackupError::BucketNotFound(_)));
    }

    #[test]
    fn test_auth_failures() {
        for code in AUTH_ERROR_CODES {
            assert!(matches!(classify(Some(*code), 400), BackupError::Authentication(_)));
        }
        assert!(matches!(classify(None, 403), BackupError::Authentication(_)));
        assert!(matches!(classify(Some("Unknown"), 401), BackupError::Authentication(_)));
    }

    #[test]
    fn test_other_failures_are_network_errors() {
        assert!(matches!(classify(Some("SlowDown"), 503), BackupError::Network(_)));
        assert!(matches!(classify(Some("InternalError"), 500), BackupError::Network(_)));
        assert!(matches!(classify(Some("NoSuchKey"), 404), BackupError::Network(_)));
    }

    #[test]
    fn test_missing_credentials_are_auth_failures() {
        let err = SdkError::construction_failure(CredentialsError::not_loaded("no providers"));
        assert!(matches!(
            classify_sdk_error("backups", err),
            BackupError::Authentication(_)
        ));

        // How the orchestrator reports a failed identity resolution
        let source = CredentialsError::provider_error("profile unreadable");
        let err = SdkError::dispatch_failure(ConnectorError::other(source.into(), None));
        assert!(matches!(
            classify_sdk_error("backups", err),
            BackupError::Authentication(_)
        ));
    }

    #[test]
    fn test_credential_wording_alone_is_not_auth() {
        let err = SdkError::construction_failure(io::Error::other("invalid credential scope"));
        assert!(matches!(classify_sdk_error("backups", err), BackupError::Network(_)));

        let err = SdkError::timeout_error(io::Error::other("credentials endpoint timed out"));
        assert!(matches!(classify_sdk_error("backups", err), BackupError::Network(_)));
    }
}
