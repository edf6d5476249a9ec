//! Dashboard filtering and aggregation.
//!
//! A [`FilterSpec`] narrows the cleaned table in a fixed order (year, state,
//! severity, hour range) and [`aggregate::summarize`] turns the remaining
//! rows into a [`DashboardSummary`]. Every aggregate is defined for an empty
//! selection; an empty year set yields [`Selection::Required`] instead.

pub mod aggregate;
pub mod filter;
pub mod sampling;
pub mod states;
pub mod types;
pub mod utility;

pub use filter::{FilterSpec, HourRange, Selection, apply_filters, filter_options};
pub use sampling::SamplingOptions;
pub use types::{DashboardSummary, FilterOptions};

use crate::record::AccidentTable;

/// Filters `table` and summarizes the result.
pub fn evaluate(
    table: &AccidentTable,
    spec: &FilterSpec,
    sampling: &SamplingOptions,
) -> Selection<DashboardSummary> {
    apply_filters(table.records(), spec).map(|rows| aggregate::summarize(&rows, sampling))
}
