//! Output types handed to the presentation widgets.

use serde::Serialize;

/// Frequency of a free-text label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
}

/// Accident count for one state, with its USPS code when known.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateCount {
    pub state: String,
    pub code: Option<&'static str>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthCount {
    pub month: u32,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayCount {
    pub day: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourCount {
    pub hour: u32,
    pub count: usize,
}

/// One non-empty cell of the day-of-week by hour heat aggregation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayHourCount {
    pub day: &'static str,
    pub hour: u32,
    pub count: usize,
}

/// A hotspot grid cell and how many accidents fall in it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileCount {
    pub tile_lat: f64,
    pub tile_lng: f64,
    pub count: usize,
}

/// Half-open bin `[lo, hi)` of the response-time histogram; the last bin
/// also includes `hi`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lo: f64,
    pub hi: f64,
    pub count: usize,
}

/// A sampled accident for the point map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPoint {
    pub start_lat: f64,
    pub start_lng: f64,
    pub city: Option<String>,
    pub state: Option<String>,
    pub severity: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapCenter {
    pub lat: f64,
    pub lng: f64,
}

/// Every aggregate the dashboard renders for one filter selection.
///
/// Metrics that cannot be computed on an empty selection are `None`, shown
/// as "no data".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub total: usize,
    pub distinct_states: usize,
    pub most_common_severity: Option<u8>,
    pub mean_response_minutes: Option<f64>,

    pub by_state: Vec<StateCount>,
    pub by_month: Vec<MonthCount>,
    pub by_day_of_week: Vec<DayCount>,
    pub by_day_hour: Vec<DayHourCount>,
    pub by_hour: Vec<HourCount>,
    pub top_weather: Vec<LabelCount>,
    pub response_histogram: Vec<HistogramBin>,
    pub hotspots: Vec<TileCount>,

    pub map_points: Vec<MapPoint>,
    pub map_center: Option<MapCenter>,
}

impl DashboardSummary {
    /// Dense 7x24 view of `by_day_hour`, Monday first, zero-filled.
    pub fn day_hour_grid(&self) -> [[usize; 24]; 7] {
        let mut grid = [[0usize; 24]; 7];
        for cell in &self.by_day_hour {
            if let Some(row) = crate::query::aggregate::day_index(cell.day) {
                if let Some(slot) = grid[row].get_mut(cell.hour as usize) {
                    *slot = cell.count;
                }
            }
        }
        grid
    }
}

/// Choices the filter widgets offer for a year selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterOptions {
    pub years: Vec<i32>,
    pub states: Vec<String>,
    pub severities: Vec<u8>,
}
