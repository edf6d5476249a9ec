//! Reading the raw accident CSV.
//!
//! Headers are matched case-insensitively, so both the `Start_Time` style of
//! the public dataset and lowercase exports work. Only `start_time`,
//! `start_lat` and `start_lng` are required.

use std::borrow::Cow;
use std::collections::HashMap;
use std::io::Read;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::{ByteRecord, ReaderBuilder};
use flate2::read::GzDecoder;
use tracing::debug;

use crate::error::{AccidentError, Result};
use crate::record::Observation;

/// Columns a raw file must provide.
pub const REQUIRED_RAW_COLUMNS: &[&str] = &["start_time", "start_lat", "start_lng"];

const OPTIONAL_RAW_COLUMNS: &[&str] = &[
    "end_time",
    "state",
    "city",
    "severity",
    "weather_condition",
];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"];

/// Parses a timestamp as found in the raw dataset.
///
/// Offsets in RFC 3339 input are dropped and the wall-clock time kept, since
/// hour-of-day features are about local traffic.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(t) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(t);
        }
    }

    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.naive_local());
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn parse_f64(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Severity may arrive as `2` or `2.0`.
fn parse_severity(raw: &str) -> Option<u8> {
    let raw = raw.trim();
    if let Ok(v) = raw.parse::<u8>() {
        return Some(v);
    }
    let v = raw.parse::<f64>().ok()?;
    if v.fract() == 0.0 && (0.0..=f64::from(u8::MAX)).contains(&v) {
        Some(v as u8)
    } else {
        None
    }
}

fn non_empty(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}

/// Maps lowercase column names to their index in the header row.
struct HeaderIndex(HashMap<String, usize>);

impl HeaderIndex {
    fn new(headers: &ByteRecord) -> Result<Self> {
        let index: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (String::from_utf8_lossy(h).trim().to_ascii_lowercase(), i))
            .collect();

        let missing: Vec<String> = REQUIRED_RAW_COLUMNS
            .iter()
            .filter(|c| !index.contains_key(**c))
            .map(|c| c.to_string())
            .collect();

        if !missing.is_empty() {
            return Err(AccidentError::SchemaMismatch {
                source_name: "raw CSV".to_string(),
                missing,
            });
        }

        let absent: Vec<&str> = OPTIONAL_RAW_COLUMNS
            .iter()
            .copied()
            .filter(|c| !index.contains_key(*c))
            .collect();
        if !absent.is_empty() {
            debug!(?absent, "Optional raw columns absent, filling with nulls");
        }

        Ok(Self(index))
    }

    /// Invalid UTF-8 is replaced rather than failing the row.
    fn get<'r>(&self, record: &'r ByteRecord, column: &str) -> Option<Cow<'r, str>> {
        self.0
            .get(column)
            .and_then(|&i| record.get(i))
            .map(String::from_utf8_lossy)
    }
}

/// Parses one raw row. Unparseable values become `None`; validation is left
/// to [`crate::record::AccidentRecord::new`].
fn observation(index: &HeaderIndex, record: &ByteRecord) -> Observation {
    let field = |column: &str| index.get(record, column);
    Observation {
        start_time: field("start_time").and_then(|v| parse_timestamp(&v)),
        end_time: field("end_time").and_then(|v| parse_timestamp(&v)),
        start_lat: field("start_lat").and_then(|v| parse_f64(&v)),
        start_lng: field("start_lng").and_then(|v| parse_f64(&v)),
        state: field("state").and_then(|v| non_empty(&v)),
        city: field("city").and_then(|v| non_empty(&v)),
        severity: field("severity").and_then(|v| parse_severity(&v)),
        weather_condition: field("weather_condition").and_then(|v| non_empty(&v)),
    }
}

/// Reads every row of a raw CSV into observations.
pub fn read_observations<R: Read>(reader: R) -> Result<Vec<Observation>> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let index = HeaderIndex::new(rdr.byte_headers()?)?;

    let mut rows = Vec::new();
    for result in rdr.byte_records() {
        let record = result?;
        rows.push(observation(&index, &record));
    }

    debug!(rows = rows.len(), "Read raw CSV rows");
    Ok(rows)
}

/// Reads raw bytes, transparently gunzipping when `gzip` is set.
pub fn read_raw_bytes(bytes: &[u8], gzip: bool) -> Result<Vec<Observation>> {
    if gzip {
        read_observations(GzDecoder::new(bytes))
    } else {
        read_observations(bytes)
    }
}
