use tracing::{debug, info};

use crate::record::{AccidentRecord, Observation};
use crate::report::EtlReport;

/// Validates observations into records, tallying every drop on `report`.
pub fn clean(observations: Vec<Observation>, report: &mut EtlReport) -> Vec<AccidentRecord> {
    report.rows_read = observations.len();

    let mut records = Vec::with_capacity(observations.len());
    for obs in observations {
        match AccidentRecord::new(obs) {
            Ok(record) => records.push(record),
            Err(reason) => {
                debug!(?reason, "Dropping row");
                report.record_drop(reason);
            }
        }
    }

    report.rows_written = records.len();
    info!(
        rows_read = report.rows_read,
        rows_kept = report.rows_written,
        unparseable_time = report.dropped_unparseable_time,
        out_of_range = report.dropped_out_of_range,
        missing_coordinates = report.dropped_missing_coordinates,
        sentinel_coordinates = report.dropped_sentinel_coordinates,
        "Cleaning complete"
    );
    records
}
