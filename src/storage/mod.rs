//! Object storage access for the raw input and the cleaned table.
//!
//! [`StorageLocation`] names where a file lives (`s3://bucket/key` or a
//! local path). [`ObjectStore`] is the async trait both backends implement:
//! [`S3Store`] over the AWS SDK and [`LocalStore`] over the filesystem.

mod local;
mod s3;

pub use local::LocalStore;
pub use s3::S3Store;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StorageError;

/// Reads and writes whole objects by key.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetches the full contents of `key`.
    async fn get(&self, key: &str) -> Result<Bytes, StorageError>;

    /// Writes `body` to `key`, replacing any existing object.
    async fn put(&self, key: &str, body: Bytes) -> Result<(), StorageError>;

    /// Checks that the backend is reachable with the current credentials.
    async fn probe(&self) -> Result<(), StorageError>;
}

/// Where an object lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageLocation {
    S3 { bucket: String, key: String },
    Local(PathBuf),
}

impl StorageLocation {
    /// Parses `s3://bucket/key` or treats the input as a local path.
    pub fn parse(raw: &str) -> Result<Self, StorageError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(StorageError::InvalidLocation(raw.to_string()));
        }

        let Some(rest) = raw.strip_prefix("s3://") else {
            return Ok(Self::Local(PathBuf::from(raw)));
        };

        match rest.split_once('/') {
            Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => Ok(Self::S3 {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            _ => Err(StorageError::InvalidLocation(raw.to_string())),
        }
    }

    /// Key (or file name) the store should be addressed with.
    pub fn key(&self) -> String {
        match self {
            Self::S3 { key, .. } => key.clone(),
            Self::Local(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }

    /// True when the object name ends in `.gz`.
    pub fn is_gzip(&self) -> bool {
        self.key().ends_with(".gz")
    }

    /// Builds the store serving this location.
    pub async fn open_store(&self) -> Arc<dyn ObjectStore> {
        match self {
            Self::S3 { bucket, .. } => Arc::new(S3Store::from_env(bucket).await),
            Self::Local(path) => {
                let root = path
                    .parent()
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("."));
                Arc::new(LocalStore::new(root))
            }
        }
    }
}

impl fmt::Display for StorageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::S3 { bucket, key } => write!(f, "s3://{bucket}/{key}"),
            Self::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

impl std::str::FromStr for StorageLocation {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
