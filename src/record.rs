//! The cleaned accident record and the table that holds them.
//!
//! [`AccidentRecord`] is the data contract between the transformer and the
//! query layer. Its fields are private and the only constructor validates
//! the observation and computes every derived field, so a record that exists
//! always satisfies the cleaning invariants.

use std::ops::RangeInclusive;
use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDateTime, Timelike, Utc, Weekday};
use serde::Serialize;

/// Years the dataset covers. Rows outside this range are out of scope.
pub const SUPPORTED_YEARS: RangeInclusive<i32> = 2020..=2023;

/// Hours of day flagged as rush hour.
pub const RUSH_HOURS: [u32; 6] = [7, 8, 9, 16, 17, 18];

/// Decimal places kept for hotspot tile coordinates (~1.1 km at the equator).
pub const TILE_DECIMALS: i32 = 2;

/// Upper clamp for response durations, in minutes.
pub const MAX_RESPONSE_MINUTES: f64 = 120.0;

/// Why a row did not make it into the cleaned table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    UnparseableStartTime,
    OutOfRange { year: i32 },
    MissingCoordinates,
    SentinelCoordinates,
}

/// A parsed but not yet validated row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Observation {
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
    pub start_lat: Option<f64>,
    pub start_lng: Option<f64>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub severity: Option<u8>,
    pub weather_condition: Option<String>,
}

/// One accident after cleaning, with its derived features.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccidentRecord {
    start_time: NaiveDateTime,
    end_time: Option<NaiveDateTime>,
    start_lat: f64,
    start_lng: f64,
    state: Option<String>,
    city: Option<String>,
    severity: Option<u8>,
    weather_condition: Option<String>,

    year: i32,
    month: u32,
    #[serde(serialize_with = "serialize_weekday")]
    day_of_week: Weekday,
    hour: u32,
    rush_hour: bool,
    tile_lat: f64,
    tile_lng: f64,
}

impl AccidentRecord {
    /// Validates an observation and derives its features.
    ///
    /// Checks run in cleaning order: timestamp, year range, then coordinates.
    pub fn new(obs: Observation) -> Result<Self, DropReason> {
        let start_time = obs.start_time.ok_or(DropReason::UnparseableStartTime)?;

        let year = start_time.year();
        if !SUPPORTED_YEARS.contains(&year) {
            return Err(DropReason::OutOfRange { year });
        }

        let (start_lat, start_lng) = match (obs.start_lat, obs.start_lng) {
            (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => (lat, lng),
            _ => return Err(DropReason::MissingCoordinates),
        };
        if start_lat == 0.0 && start_lng == 0.0 {
            return Err(DropReason::SentinelCoordinates);
        }

        let hour = start_time.hour();

        Ok(Self {
            start_time,
            end_time: obs.end_time,
            start_lat,
            start_lng,
            state: obs.state,
            city: obs.city,
            severity: obs.severity,
            weather_condition: obs.weather_condition,
            year,
            month: start_time.month(),
            day_of_week: start_time.weekday(),
            hour,
            rush_hour: is_rush_hour(hour),
            tile_lat: round_to_tile(start_lat),
            tile_lng: round_to_tile(start_lng),
        })
    }

    pub fn start_time(&self) -> NaiveDateTime {
        self.start_time
    }

    pub fn end_time(&self) -> Option<NaiveDateTime> {
        self.end_time
    }

    pub fn start_lat(&self) -> f64 {
        self.start_lat
    }

    pub fn start_lng(&self) -> f64 {
        self.start_lng
    }

    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    pub fn city(&self) -> Option<&str> {
        self.city.as_deref()
    }

    pub fn severity(&self) -> Option<u8> {
        self.severity
    }

    pub fn weather_condition(&self) -> Option<&str> {
        self.weather_condition.as_deref()
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day_of_week(&self) -> Weekday {
        self.day_of_week
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn rush_hour(&self) -> bool {
        self.rush_hour
    }

    pub fn tile_lat(&self) -> f64 {
        self.tile_lat
    }

    pub fn tile_lng(&self) -> f64 {
        self.tile_lng
    }

    /// Minutes between start and end, clamped to `[0, 120]`.
    ///
    /// `None` when the end time is unknown.
    pub fn response_minutes(&self) -> Option<f64> {
        let end = self.end_time?;
        let minutes = (end - self.start_time).num_seconds() as f64 / 60.0;
        Some(minutes.clamp(0.0, MAX_RESPONSE_MINUTES))
    }
}

pub fn is_rush_hour(hour: u32) -> bool {
    RUSH_HOURS.contains(&hour)
}

/// Rounds a coordinate to the hotspot grid.
pub fn round_to_tile(coord: f64) -> f64 {
    let scale = 10f64.powi(TILE_DECIMALS);
    (coord * scale).round() / scale
}

/// Full English name of a weekday, as used in the persisted table.
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

fn serialize_weekday<S: serde::Serializer>(day: &Weekday, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(weekday_name(*day))
}

/// Read-only cleaned table as loaded by the query layer.
#[derive(Debug, Clone)]
pub struct AccidentTable {
    records: Arc<[AccidentRecord]>,
    loaded_at: DateTime<Utc>,
}

impl AccidentTable {
    pub fn new(records: Vec<AccidentRecord>) -> Self {
        Self {
            records: records.into(),
            loaded_at: Utc::now(),
        }
    }

    pub fn records(&self) -> &[AccidentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}
