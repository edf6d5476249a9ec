//! Error types shared by the transformer and the query layer.

use thiserror::Error;

/// Failures reaching or using the object storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be reached or refused the request.
    #[error("Storage unreachable at {location}: {source}")]
    Unreachable {
        /// `s3://bucket/key` or local path that was being accessed.
        location: String,
        /// Underlying SDK or filesystem error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The location string could not be interpreted.
    #[error("Invalid storage location '{0}'")]
    InvalidLocation(String),

    /// I/O error on the local filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the ETL and query pipeline.
#[derive(Debug, Error)]
pub enum AccidentError {
    /// Reading or writing the backing store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Columns the pipeline depends on are absent from the input.
    #[error("Schema mismatch in {source_name}: missing column(s) {}", missing.join(", "))]
    SchemaMismatch {
        /// What was being read (raw CSV, cleaned table, ...).
        source_name: String,
        /// Lowercase names of the missing columns.
        missing: Vec<String>,
    },

    /// Hour bounds outside `0..=23` or inverted.
    #[error("Invalid hour range {lo}..={hi}: bounds must satisfy 0 <= lo <= hi <= 23")]
    InvalidHourRange {
        /// Lower bound as given.
        lo: u32,
        /// Upper bound as given.
        hi: u32,
    },

    /// Malformed CSV input.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Malformed or unwritable Parquet file.
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Arrow array construction or cast failure.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// I/O error while decoding input (e.g. gzip).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = AccidentError> = std::result::Result<T, E>;
