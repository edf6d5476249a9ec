use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use super::ObjectStore;
use crate::error::StorageError;

/// Filesystem-backed store rooted at a directory. Used for local development
/// and tests.
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn get(&self, key: &str) -> Result<Bytes, StorageError> {
        let path = self.path(key);
        let contents = tokio::fs::read(&path)
            .await
            .map_err(|e| StorageError::Unreachable {
                location: path.display().to_string(),
                source: Box::new(e),
            })?;
        debug!(path = %path.display(), bytes = contents.len(), "Read local object");
        Ok(Bytes::from(contents))
    }

    /// Writes through a sibling temp file and renames it into place so a
    /// reader never observes a half-written table.
    async fn put(&self, key: &str, body: Bytes) -> Result<(), StorageError> {
        let path = self.path(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, &body).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        debug!(path = %path.display(), bytes = body.len(), "Wrote local object");
        Ok(())
    }

    async fn probe(&self) -> Result<(), StorageError> {
        tokio::fs::metadata(&self.root)
            .await
            .map(|_| ())
            .map_err(|e| StorageError::Unreachable {
                location: self.root.display().to_string(),
                source: Box::new(e),
            })
    }
}
