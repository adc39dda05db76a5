//! S3-compatible object storage for certificates and uploaded media.

use aws_sdk_s3::{
    config::{Credentials, Region},
    error::{DisplayErrorContext, SdkError},
    operation::{get_object::GetObjectError, head_object::HeadObjectError},
    primitives::ByteStream,
    Client, Config,
};
use thiserror::Error;
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::models::BucketKind;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("S3 error: {0}")]
    S3(String),
    #[error("File not found: {0}")]
    NotFound(String),
}

/// Object storage client with one bucket per [`BucketKind`].
pub struct StorageService {
    client: Client,
    bucket_prefix: String,
}

impl StorageService {
    /// Build the client from the storage section of the app config.
    pub async fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,  // session token
            None,  // expiry
            "env", // provider name
        );

        let mut config_builder = Config::builder()
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .behavior_version_latest();

        // Set custom endpoint for R2, MinIO or other S3-compatible services
        if let Some(endpoint_url) = &config.endpoint {
            config_builder = config_builder
                .endpoint_url(endpoint_url.clone())
                .force_path_style(true);
        }

        let client = Client::from_conf(config_builder.build());

        Ok(Self {
            client,
            bucket_prefix: config.bucket_prefix.clone(),
        })
    }

    /// Physical bucket name for a bucket kind.
    pub fn bucket_name(&self, bucket: BucketKind) -> String {
        format!("{}{}", self.bucket_prefix, bucket.as_str())
    }

    /// Upload a file and return its key.
    pub async fn upload_file(
        &self,
        bucket: BucketKind,
        key: &str,
        content: &[u8],
        content_type: Option<&str>,
    ) -> Result<String, StorageError> {
        let body = ByteStream::from(content.to_vec());

        let mut request = self
            .client
            .put_object()
            .bucket(self.bucket_name(bucket))
            .key(key)
            .body(body);

        if let Some(ct) = content_type {
            request = request.content_type(ct);
        }

        request
            .send()
            .await
            .map_err(|e| StorageError::S3(DisplayErrorContext(&e).to_string()))?;

        tracing::info!("Uploaded {} bytes to {}/{}", content.len(), bucket.as_str(), key);
        Ok(key.to_string())
    }

    pub async fn download_file(&self, bucket: BucketKind, key: &str) -> Result<Vec<u8>, StorageError> {
        let response = self
            .client
            .get_object()
            .bucket(self.bucket_name(bucket))
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let no_such_key = e.as_service_error().is_some_and(GetObjectError::is_no_such_key);
                if no_such_key || is_missing_response(&e) {
                    StorageError::NotFound(key.to_string())
                } else {
                    StorageError::S3(DisplayErrorContext(&e).to_string())
                }
            })?;

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::S3(e.to_string()))?
            .into_bytes()
            .to_vec();

        Ok(bytes)
    }

    pub async fn delete_file(&self, bucket: BucketKind, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(self.bucket_name(bucket))
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::S3(DisplayErrorContext(&e).to_string()))?;

        tracing::info!("Deleted {}/{}", bucket.as_str(), key);
        Ok(())
    }

    pub async fn file_exists(&self, bucket: BucketKind, key: &str) -> Result<bool, StorageError> {
        match self
            .client
            .head_object()
            .bucket(self.bucket_name(bucket))
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let not_found = e.as_service_error().is_some_and(HeadObjectError::is_not_found);
                if not_found || is_missing_response(&e) {
                    Ok(false)
                } else {
                    Err(StorageError::S3(DisplayErrorContext(&e).to_string()))
                }
            }
        }
    }

    /// Key for a learner upload: `{owner_id}/{uuid}-{file_name}`.
    ///
    /// The file name is reduced to a safe character set; an empty result
    /// falls back to `upload`.
    pub fn make_upload_key(owner_id: Uuid, file_name: &str) -> String {
        let base = file_name.rsplit(['/', '\\']).next().unwrap_or_default();
        let safe: String = base
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
            .collect();
        let safe = safe.trim_matches('.');
        let name = if safe.is_empty() { "upload" } else { safe };
        format!("{}/{}-{}", owner_id, Uuid::new_v4(), name)
    }

    /// Deterministic key of a module certificate document.
    pub fn certificate_key(learner_id: Uuid, module_id: Uuid) -> String {
        format!("{}/{}.md", learner_id, module_id)
    }
}

/// HEAD requests carry no error body, so a bare 404 also means "missing".
fn is_missing_response<E>(error: &SdkError<E>) -> bool {
    error
        .raw_response()
        .is_some_and(|raw| raw.status().as_u16() == 404)
}
