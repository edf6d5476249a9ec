use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::{debug, info};

use super::ObjectStore;
use crate::error::StorageError;

/// S3 bucket accessed with the ambient AWS configuration (env vars,
/// profile, instance role).
pub struct S3Store {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Store {
    pub async fn from_env(bucket: &str) -> Self {
        let config = aws_config::load_from_env().await;
        Self::new(aws_sdk_s3::Client::new(&config), bucket)
    }

    pub fn new(client: aws_sdk_s3::Client, bucket: &str) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
        }
    }

    fn location(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, key)
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    #[tracing::instrument(skip(self), fields(bucket = %self.bucket))]
    async fn get(&self, key: &str) -> Result<Bytes, StorageError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::Unreachable {
                location: self.location(key),
                source: Box::new(e),
            })?;

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Unreachable {
                location: self.location(key),
                source: Box::new(e),
            })?
            .into_bytes();

        debug!(bytes = body.len(), "Downloaded object");
        Ok(body)
    }

    #[tracing::instrument(skip(self, body), fields(bucket = %self.bucket, bytes = body.len()))]
    async fn put(&self, key: &str, body: Bytes) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type("application/vnd.apache.parquet")
            .send()
            .await
            .map_err(|e| StorageError::Unreachable {
                location: self.location(key),
                source: Box::new(e),
            })?;

        info!(location = %self.location(key), "Uploaded object");
        Ok(())
    }

    /// Lists at most one key, which fails fast on bad credentials or a
    /// missing bucket.
    async fn probe(&self) -> Result<(), StorageError> {
        self.client
            .list_objects_v2()
            .bucket(&self.bucket)
            .max_keys(1)
            .send()
            .await
            .map_err(|e| StorageError::Unreachable {
                location: format!("s3://{}", self.bucket),
                source: Box::new(e),
            })?;
        Ok(())
    }
}
