//! Run configuration for the transformer and the dashboard query layer.
//!
//! The binary fills these from CLI flags with environment fallbacks
//! (`ACCIDENTS_*`, loaded from `.env` by `dotenvy`).

use std::time::Duration;

use clap::ValueEnum;
use serde::Serialize;

use crate::cache::Invalidation;
use crate::query::SamplingOptions;
use crate::storage::StorageLocation;

pub const DEFAULT_INPUT: &str = "s3://us-traffic-accidents-datalake/raw/accidents_2020_2023.csv";
pub const DEFAULT_OUTPUT: &str =
    "s3://us-traffic-accidents-datalake/processed/accidents_2020_2023.parquet";

/// How the ETL reacts to an unreadable source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Fail with a diagnostic.
    #[default]
    Production,
    /// Local development: log a warning and continue on built-in sample rows.
    Sample,
}

#[derive(Debug, Clone)]
pub struct EtlConfig {
    pub input: StorageLocation,
    pub output: StorageLocation,
    pub mode: RunMode,
}

impl EtlConfig {
    pub fn new(input: StorageLocation, output: StorageLocation, mode: RunMode) -> Self {
        Self {
            input,
            output,
            mode,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub table: StorageLocation,
    pub invalidation: Invalidation,
    pub sampling: SamplingOptions,
}

impl DashboardConfig {
    /// `cache_ttl_secs` of `None` or `0` means the table is only reloaded on
    /// explicit invalidation.
    pub fn new(table: StorageLocation, cache_ttl_secs: Option<u64>, sampling: SamplingOptions) -> Self {
        let invalidation = match cache_ttl_secs {
            Some(secs) if secs > 0 => Invalidation::Ttl(Duration::from_secs(secs)),
            _ => Invalidation::Manual,
        };
        Self {
            table,
            invalidation,
            sampling,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_mode_is_production() {
        assert_eq!(RunMode::default(), RunMode::Production);
    }

    #[test]
    fn test_default_locations_parse() {
        assert!(matches!(
            StorageLocation::parse(DEFAULT_INPUT).unwrap(),
            StorageLocation::S3 { .. }
        ));
        assert!(matches!(
            StorageLocation::parse(DEFAULT_OUTPUT).unwrap(),
            StorageLocation::S3 { .. }
        ));
    }

    #[test]
    fn test_cache_ttl_mapping() {
        let table = StorageLocation::parse("data/table.parquet").unwrap();

        let cfg = DashboardConfig::new(table.clone(), Some(300), SamplingOptions::default());
        assert_eq!(cfg.invalidation, Invalidation::Ttl(Duration::from_secs(300)));

        let cfg = DashboardConfig::new(table.clone(), Some(0), SamplingOptions::default());
        assert_eq!(cfg.invalidation, Invalidation::Manual);

        let cfg = DashboardConfig::new(table, None, SamplingOptions::default());
        assert_eq!(cfg.invalidation, Invalidation::Manual);
    }
}
