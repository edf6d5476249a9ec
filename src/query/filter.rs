use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::{AccidentError, Result};
use crate::query::types::FilterOptions;
use crate::record::{AccidentRecord, SUPPORTED_YEARS};

/// Outcome of a query that needs a year selection first.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection<T> {
    /// No years chosen yet; the user has to pick at least one.
    Required,
    Ready(T),
}

impl<T> Selection<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Selection<U> {
        match self {
            Selection::Required => Selection::Required,
            Selection::Ready(v) => Selection::Ready(f(v)),
        }
    }

    pub fn ready(self) -> Option<T> {
        match self {
            Selection::Required => None,
            Selection::Ready(v) => Some(v),
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(self, Selection::Required)
    }
}

/// Inclusive hour-of-day bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HourRange {
    lo: u32,
    hi: u32,
}

impl HourRange {
    pub const ALL: HourRange = HourRange { lo: 0, hi: 23 };

    pub fn new(lo: u32, hi: u32) -> Result<Self> {
        if lo > hi || hi > 23 {
            return Err(AccidentError::InvalidHourRange { lo, hi });
        }
        Ok(Self { lo, hi })
    }

    pub fn lo(&self) -> u32 {
        self.lo
    }

    pub fn hi(&self) -> u32 {
        self.hi
    }

    pub fn contains(&self, hour: u32) -> bool {
        (self.lo..=self.hi).contains(&hour)
    }
}

impl Default for HourRange {
    fn default() -> Self {
        Self::ALL
    }
}

/// The user's filter selection.
///
/// `severities: None` means every severity present in the data, so rows
/// without a severity are excluded either way.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterSpec {
    pub years: BTreeSet<i32>,
    pub state: Option<String>,
    pub severities: Option<BTreeSet<u8>>,
    pub hour_range: HourRange,
}

impl FilterSpec {
    pub fn new(years: impl IntoIterator<Item = i32>) -> Self {
        Self {
            years: years.into_iter().collect(),
            state: None,
            severities: None,
            hour_range: HourRange::ALL,
        }
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn with_severities(mut self, severities: impl IntoIterator<Item = u8>) -> Self {
        self.severities = Some(severities.into_iter().collect());
        self
    }

    pub fn with_hour_range(mut self, hour_range: HourRange) -> Self {
        self.hour_range = hour_range;
        self
    }

    fn year_matches(&self, r: &AccidentRecord) -> bool {
        self.years.contains(&r.year())
    }

    fn state_matches(&self, r: &AccidentRecord) -> bool {
        match &self.state {
            Some(state) => r.state() == Some(state.as_str()),
            None => true,
        }
    }

    fn severity_matches(&self, r: &AccidentRecord) -> bool {
        match (&self.severities, r.severity()) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(allowed), Some(s)) => allowed.contains(&s),
        }
    }
}

/// Narrows the table to the rows matching `spec`.
///
/// Filters apply in a fixed order: year, state, severity, hour range.
pub fn apply_filters<'a>(
    records: &'a [AccidentRecord],
    spec: &FilterSpec,
) -> Selection<Vec<&'a AccidentRecord>> {
    if spec.years.is_empty() {
        return Selection::Required;
    }

    let rows = records
        .iter()
        .filter(|r| spec.year_matches(r))
        .filter(|r| spec.state_matches(r))
        .filter(|r| spec.severity_matches(r))
        .filter(|r| spec.hour_range.contains(r.hour()))
        .collect();

    Selection::Ready(rows)
}

/// Widget choices for the selected years: every supported year, plus the
/// states and severities present among those years' rows.
pub fn filter_options(records: &[AccidentRecord], years: &BTreeSet<i32>) -> FilterOptions {
    let in_years: Vec<&AccidentRecord> = records
        .iter()
        .filter(|r| years.contains(&r.year()))
        .collect();

    let states: BTreeSet<&str> = in_years.iter().filter_map(|r| r.state()).collect();
    let severities: BTreeSet<u8> = in_years.iter().filter_map(|r| r.severity()).collect();

    FilterOptions {
        years: SUPPORTED_YEARS.collect(),
        states: states.into_iter().map(str::to_string).collect(),
        severities: severities.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::tests::{observation, ts};

    fn record(year: i32, hour: u32, state: &str, severity: Option<u8>) -> AccidentRecord {
        let mut obs = observation(ts(year, 3, 1, hour, 0));
        obs.state = Some(state.to_string());
        obs.severity = severity;
        AccidentRecord::new(obs).unwrap()
    }

    fn table() -> Vec<AccidentRecord> {
        vec![
            record(2020, 8, "CA", Some(2)),
            record(2021, 17, "CA", Some(3)),
            record(2021, 2, "TX", Some(2)),
            record(2022, 12, "TX", Some(4)),
            record(2022, 23, "FL", None),
        ]
    }

    #[test]
    fn test_hour_range_validation() {
        assert!(HourRange::new(0, 23).is_ok());
        assert!(HourRange::new(5, 5).is_ok());
        assert!(matches!(
            HourRange::new(10, 9),
            Err(AccidentError::InvalidHourRange { lo: 10, hi: 9 })
        ));
        assert!(HourRange::new(0, 24).is_err());
    }

    #[test]
    fn test_empty_years_requires_selection() {
        let records = table();
        let result = apply_filters(&records, &FilterSpec::new([]));
        assert!(result.is_required());
    }

    #[test]
    fn test_year_filter() {
        let records = table();
        let rows = apply_filters(&records, &FilterSpec::new([2021]))
            .ready()
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.year() == 2021));
    }

    #[test]
    fn test_default_severity_excludes_null() {
        let records = table();
        let rows = apply_filters(&records, &FilterSpec::new([2022]))
            .ready()
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].state(), Some("TX"));
    }

    #[test]
    fn test_combined_filters() {
        let records = table();
        let spec = FilterSpec::new([2020, 2021, 2022])
            .with_state("CA")
            .with_severities([2, 3])
            .with_hour_range(HourRange::new(7, 9).unwrap());

        let rows = apply_filters(&records, &spec).ready().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].year(), 2020);
    }

    #[test]
    fn test_explicit_empty_severities_match_nothing() {
        let records = table();
        let spec = FilterSpec::new([2020, 2021, 2022]).with_severities([]);
        assert!(apply_filters(&records, &spec).ready().unwrap().is_empty());
    }

    #[test]
    fn test_filter_options_follow_years() {
        let records = table();
        let options = filter_options(&records, &BTreeSet::from([2021, 2022]));

        assert_eq!(options.years, vec![2020, 2021, 2022, 2023]);
        assert_eq!(options.states, vec!["CA", "FL", "TX"]);
        assert_eq!(options.severities, vec![2, 3, 4]);
    }
}
