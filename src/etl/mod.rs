//! The offline transformer.
//!
//! Reads the raw accident CSV, drops rows that fail the cleaning rules,
//! derives time and hotspot features, and overwrites the cleaned Parquet
//! table. Each run yields an [`crate::report::EtlReport`].

pub mod clean;
pub mod pipeline;
pub mod raw;
pub mod sample;

pub use pipeline::{run_etl, run_etl_with};
