use tracing::{error, info, warn};

use crate::columnar;
use crate::config::{EtlConfig, RunMode};
use crate::error::{AccidentError, Result};
use crate::etl::clean::clean;
use crate::etl::raw::read_raw_bytes;
use crate::etl::sample::sample_observations;
use crate::record::Observation;
use crate::report::{DataOrigin, EtlReport};
use crate::storage::{ObjectStore, StorageLocation};

/// Loads raw observations, substituting sample rows only in sample mode.
///
/// A schema mismatch in a readable source is never papered over.
async fn load_observations(
    store: &dyn ObjectStore,
    input: &StorageLocation,
    mode: RunMode,
) -> Result<(Vec<Observation>, DataOrigin)> {
    match store.get(&input.key()).await {
        Ok(bytes) => {
            info!(bytes = bytes.len(), "Raw source downloaded");
            let rows = read_raw_bytes(&bytes, input.is_gzip())?;
            Ok((rows, DataOrigin::Source))
        }
        Err(e) => match mode {
            RunMode::Production => {
                error!(input = %input, error = %e, "Raw source unreadable");
                Err(AccidentError::Storage(e))
            }
            RunMode::Sample => {
                warn!(
                    input = %input,
                    error = %e,
                    "Raw source unreadable, continuing on built-in sample rows (sample mode)"
                );
                Ok((sample_observations(), DataOrigin::Sample))
            }
        },
    }
}

/// Runs the ETL against explicit stores. `run_etl` opens them from the config.
#[tracing::instrument(skip_all, fields(input = %config.input, output = %config.output, mode = ?config.mode))]
pub async fn run_etl_with(
    config: &EtlConfig,
    source: &dyn ObjectStore,
    sink: &dyn ObjectStore,
) -> Result<EtlReport> {
    let (observations, origin) = load_observations(source, &config.input, config.mode).await?;

    let mut report = EtlReport::new(
        &config.input.to_string(),
        &config.output.to_string(),
        origin,
    );
    let records = clean(observations, &mut report);

    let body = columnar::encode(&records)?;
    sink.put(&config.output.key(), body).await?;

    info!(
        rows_written = report.rows_written,
        retained_pct = report.retained_pct(),
        origin = ?report.origin,
        "ETL complete"
    );
    Ok(report)
}

/// Reads the raw dataset, cleans it and overwrites the cleaned table.
pub async fn run_etl(config: &EtlConfig) -> Result<EtlReport> {
    let source = config.input.open_store().await;
    let sink = config.output.open_store().await;
    run_etl_with(config, source.as_ref(), sink.as_ref()).await
}
