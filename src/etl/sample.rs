//! Built-in rows for local development when the raw source is unreachable.
//! Only used in [`crate::config::RunMode::Sample`].

use crate::etl::raw::parse_timestamp;
use crate::record::Observation;

/// Two complete rows, so every dashboard view has something to show.
pub fn sample_observations() -> Vec<Observation> {
    vec![
        Observation {
            start_time: parse_timestamp("2021-01-01 08:00:00"),
            end_time: parse_timestamp("2021-01-01 08:30:00"),
            start_lat: Some(37.7749),
            start_lng: Some(-122.4194),
            state: Some("CA".to_string()),
            city: Some("San Francisco".to_string()),
            severity: Some(2),
            weather_condition: Some("Clear".to_string()),
        },
        Observation {
            start_time: parse_timestamp("2022-06-15 17:30:00"),
            end_time: parse_timestamp("2022-06-15 18:15:00"),
            start_lat: Some(40.7128),
            start_lng: Some(-74.0060),
            state: Some("NY".to_string()),
            city: Some("New York".to_string()),
            severity: Some(3),
            weather_condition: Some("Rain".to_string()),
        },
    ]
}
