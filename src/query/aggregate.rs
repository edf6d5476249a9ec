use std::collections::{BTreeMap, HashSet};

use chrono::Weekday;

use crate::query::sampling::{SamplingOptions, map_center, sample_points};
use crate::query::states::state_code;
use crate::query::types::{
    DashboardSummary, DayCount, DayHourCount, HistogramBin, HourCount, LabelCount, MonthCount,
    StateCount, TileCount,
};
use crate::query::utility::{mean, ranked, tally};
use crate::record::{AccidentRecord, MAX_RESPONSE_MINUTES, weekday_name};

/// How many weather conditions the weather chart shows.
pub const TOP_WEATHER: usize = 10;

/// How many hotspot tiles are reported.
pub const TOP_TILES: usize = 20;

/// Number of equal-width bins over `[0, 120]` minutes.
pub const RESPONSE_BINS: usize = 40;

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Row index of a day name in Monday-first order.
pub fn day_index(name: &str) -> Option<usize> {
    WEEK.iter().position(|d| weekday_name(*d) == name)
}

pub fn distinct_states(rows: &[&AccidentRecord]) -> usize {
    rows.iter()
        .filter_map(|r| r.state())
        .collect::<HashSet<_>>()
        .len()
}

/// Most frequent severity; ties go to the smallest value.
pub fn severity_mode(rows: &[&AccidentRecord]) -> Option<u8> {
    ranked(tally(rows.iter().filter_map(|r| r.severity())))
        .first()
        .map(|(severity, _)| *severity)
}

pub fn mean_response_minutes(rows: &[&AccidentRecord]) -> Option<f64> {
    let minutes: Vec<f64> = rows.iter().filter_map(|r| r.response_minutes()).collect();
    mean(&minutes)
}

/// Counts per state, most frequent first.
pub fn counts_by_state(rows: &[&AccidentRecord]) -> Vec<StateCount> {
    ranked(tally(rows.iter().filter_map(|r| r.state())))
        .into_iter()
        .map(|(state, count)| StateCount {
            state: state.to_string(),
            code: state_code(state),
            count,
        })
        .collect()
}

/// Counts per month, in calendar order.
pub fn counts_by_month(rows: &[&AccidentRecord]) -> Vec<MonthCount> {
    let mut counts = BTreeMap::new();
    for r in rows {
        *counts.entry(r.month()).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(month, count)| MonthCount { month, count })
        .collect()
}

/// Counts per day of week, Monday first. Days with no rows are omitted.
pub fn counts_by_day(rows: &[&AccidentRecord]) -> Vec<DayCount> {
    let mut counts = [0usize; 7];
    for r in rows {
        counts[r.day_of_week().num_days_from_monday() as usize] += 1;
    }
    WEEK.iter()
        .zip(counts)
        .filter(|(_, count)| *count > 0)
        .map(|(day, count)| DayCount {
            day: weekday_name(*day),
            count,
        })
        .collect()
}

/// Non-empty `(day_of_week, hour)` cells, ordered by day then hour.
pub fn counts_by_day_hour(rows: &[&AccidentRecord]) -> Vec<DayHourCount> {
    let mut counts = BTreeMap::new();
    for r in rows {
        let key = (r.day_of_week().num_days_from_monday(), r.hour());
        *counts.entry(key).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|((day, hour), count)| DayHourCount {
            day: weekday_name(WEEK[day as usize]),
            hour,
            count,
        })
        .collect()
}

pub fn counts_by_hour(rows: &[&AccidentRecord]) -> Vec<HourCount> {
    let mut counts = BTreeMap::new();
    for r in rows {
        *counts.entry(r.hour()).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(hour, count)| HourCount { hour, count })
        .collect()
}

/// The ten most frequent weather conditions, ties by label.
pub fn top_weather(rows: &[&AccidentRecord]) -> Vec<LabelCount> {
    ranked(tally(rows.iter().filter_map(|r| r.weather_condition())))
        .into_iter()
        .take(TOP_WEATHER)
        .map(|(label, count)| LabelCount {
            label: label.to_string(),
            count,
        })
        .collect()
}

/// Histogram of clamped response times. Empty when no row has an end time.
pub fn response_histogram(rows: &[&AccidentRecord]) -> Vec<HistogramBin> {
    let minutes: Vec<f64> = rows.iter().filter_map(|r| r.response_minutes()).collect();
    if minutes.is_empty() {
        return Vec::new();
    }

    let width = MAX_RESPONSE_MINUTES / RESPONSE_BINS as f64;
    let mut counts = vec![0usize; RESPONSE_BINS];
    for m in minutes {
        let bin = ((m / width) as usize).min(RESPONSE_BINS - 1);
        counts[bin] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lo: i as f64 * width,
            hi: (i + 1) as f64 * width,
            count,
        })
        .collect()
}

/// Densest hotspot tiles.
pub fn hotspots(rows: &[&AccidentRecord]) -> Vec<TileCount> {
    // f64 is neither Eq nor Ord; key on the integer grid index instead.
    let scale = 100.0;
    let keys = rows.iter().map(|r| {
        (
            (r.tile_lat() * scale).round() as i64,
            (r.tile_lng() * scale).round() as i64,
        )
    });

    ranked(tally(keys))
        .into_iter()
        .take(TOP_TILES)
        .map(|((lat, lng), count)| TileCount {
            tile_lat: lat as f64 / scale,
            tile_lng: lng as f64 / scale,
            count,
        })
        .collect()
}

/// Computes every dashboard aggregate for an already-filtered row set.
#[tracing::instrument(skip_all, fields(rows = rows.len()))]
pub fn summarize(rows: &[&AccidentRecord], sampling: &SamplingOptions) -> DashboardSummary {
    let map_points = sample_points(rows, sampling);
    let map_center = map_center(&map_points);

    DashboardSummary {
        total: rows.len(),
        distinct_states: distinct_states(rows),
        most_common_severity: severity_mode(rows),
        mean_response_minutes: mean_response_minutes(rows),
        by_state: counts_by_state(rows),
        by_month: counts_by_month(rows),
        by_day_of_week: counts_by_day(rows),
        by_day_hour: counts_by_day_hour(rows),
        by_hour: counts_by_hour(rows),
        top_weather: top_weather(rows),
        response_histogram: response_histogram(rows),
        hotspots: hotspots(rows),
        map_points,
        map_center,
    }
}
