//! Output formatting and persistence for summaries and ETL reports.
//!
//! Supports a human-readable summary, JSON serialization, and appending ETL
//! reports to a CSV run ledger.

use std::fmt::Display;
use std::fs::OpenOptions;
use std::path::Path;

use anyhow::Result;
use csv::WriterBuilder;
use serde::Serialize;
use tracing::{debug, info};

use crate::query::DashboardSummary;
use crate::report::EtlReport;

/// Label shown for metrics that are undefined on an empty selection.
pub const NO_DATA: &str = "no data";

/// Formats an optional metric, falling back to [`NO_DATA`].
pub fn metric<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| NO_DATA.to_string(), |v| v.to_string())
}

/// Renders the headline metrics as the dashboard's KPI row.
pub fn kpi_lines(summary: &DashboardSummary) -> Vec<String> {
    vec![
        format!("Total Accidents: {}", summary.total),
        format!("Unique States: {}", summary.distinct_states),
        format!(
            "Most Common Severity: {}",
            metric(summary.most_common_severity)
        ),
        format!(
            "Avg Response Time (min): {}",
            metric(summary.mean_response_minutes.map(|m| format!("{m:.2}")))
        ),
    ]
}

/// Logs the KPI row and the debug representation of the summary.
pub fn print_pretty(summary: &DashboardSummary) {
    for line in kpi_lines(summary) {
        info!("{line}");
    }
    debug!("{:#?}", summary);
}

/// Writes any serializable value as pretty JSON to stdout.
pub fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Appends an [`EtlReport`] as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_report(path: &str, report: &EtlReport) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, "Appending ETL report");

    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // header only on first write
        .from_writer(file);

    writer.serialize(report)?;
    writer.flush()?;

    Ok(())
}
