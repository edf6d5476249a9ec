//! Process-wide cache of the cleaned table.
//!
//! [`TableCache`] loads the table from a [`TableSource`] on first use and
//! hands out shared read-only copies until the [`Invalidation`] policy says
//! the copy is stale or [`TableCache::invalidate`] is called.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::columnar;
use crate::error::Result;
use crate::record::AccidentTable;
use crate::storage::{ObjectStore, StorageLocation};

/// Produces a fresh copy of the cleaned table.
#[async_trait]
pub trait TableSource: Send + Sync {
    async fn load(&self) -> Result<AccidentTable>;
}

/// Loads the Parquet table from object storage.
pub struct ParquetSource {
    store: Arc<dyn ObjectStore>,
    location: StorageLocation,
}

impl ParquetSource {
    pub fn new(store: Arc<dyn ObjectStore>, location: StorageLocation) -> Self {
        Self { store, location }
    }

    pub async fn open(location: StorageLocation) -> Self {
        let store = location.open_store().await;
        Self::new(store, location)
    }
}

#[async_trait]
impl TableSource for ParquetSource {
    #[tracing::instrument(skip(self), fields(location = %self.location))]
    async fn load(&self) -> Result<AccidentTable> {
        let bytes = self.store.get(&self.location.key()).await?;
        let records = columnar::decode(bytes)?;
        info!(rows = records.len(), "Loaded cleaned table");
        Ok(AccidentTable::new(records))
    }
}

/// When a cached table is considered stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invalidation {
    /// Kept until [`TableCache::invalidate`] is called.
    Manual,
    /// Reloaded on the first access after the duration has elapsed.
    Ttl(Duration),
}

struct Entry {
    table: Arc<AccidentTable>,
    loaded: Instant,
}

pub struct TableCache<S> {
    source: S,
    policy: Invalidation,
    entry: Option<Entry>,
}

impl<S: TableSource> TableCache<S> {
    pub fn new(source: S, policy: Invalidation) -> Self {
        Self {
            source,
            policy,
            entry: None,
        }
    }

    pub fn policy(&self) -> Invalidation {
        self.policy
    }

    fn is_fresh(&self, entry: &Entry) -> bool {
        match self.policy {
            Invalidation::Manual => true,
            Invalidation::Ttl(ttl) => entry.loaded.elapsed() < ttl,
        }
    }

    /// Returns the cached table, loading it if absent or stale.
    ///
    /// A failed load leaves any previous entry untouched and returns the
    /// error.
    pub async fn get(&mut self) -> Result<Arc<AccidentTable>> {
        if let Some(entry) = &self.entry {
            if self.is_fresh(entry) {
                debug!("Table cache hit");
                return Ok(entry.table.clone());
            }
            debug!("Table cache entry expired");
        }

        let table = Arc::new(self.source.load().await?);
        self.entry = Some(Entry {
            table: table.clone(),
            loaded: Instant::now(),
        });
        Ok(table)
    }

    /// Drops the cached table so the next [`get`](Self::get) reloads it.
    pub fn invalidate(&mut self) {
        if self.entry.take().is_some() {
            info!("Table cache invalidated");
        }
    }
}
