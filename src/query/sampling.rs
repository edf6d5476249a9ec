use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index;

use crate::query::types::{MapCenter, MapPoint};
use crate::query::utility::mean;
use crate::record::AccidentRecord;

/// Maximum number of points drawn for the point map.
pub const MAP_SAMPLE_CAP: usize = 3000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingOptions {
    pub cap: usize,
    /// Fixed seed for reproducible samples. A fresh seed is drawn when unset.
    pub seed: Option<u64>,
}

impl Default for SamplingOptions {
    fn default() -> Self {
        Self {
            cap: MAP_SAMPLE_CAP,
            seed: None,
        }
    }
}

/// Uniform sample without replacement of at most `cap` rows.
pub fn sample_points(rows: &[&AccidentRecord], options: &SamplingOptions) -> Vec<MapPoint> {
    let amount = options.cap.min(rows.len());
    let seed = options.seed.unwrap_or_else(rand::random);
    let mut rng = StdRng::seed_from_u64(seed);

    index::sample(&mut rng, rows.len(), amount)
        .into_iter()
        .map(|i| {
            let r = rows[i];
            MapPoint {
                start_lat: r.start_lat(),
                start_lng: r.start_lng(),
                city: r.city().map(str::to_string),
                state: r.state().map(str::to_string),
                severity: r.severity(),
            }
        })
        .collect()
}

/// Centre of the sampled points, for the initial map view.
pub fn map_center(points: &[MapPoint]) -> Option<MapCenter> {
    let lats: Vec<f64> = points.iter().map(|p| p.start_lat).collect();
    let lngs: Vec<f64> = points.iter().map(|p| p.start_lng).collect();
    Some(MapCenter {
        lat: mean(&lats)?,
        lng: mean(&lngs)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::tests::{observation, ts};
    use std::collections::HashSet;

    fn records(n: usize) -> Vec<AccidentRecord> {
        (0..n)
            .map(|i| {
                let mut obs = observation(ts(2021, 1, 1, 0, 0));
                obs.start_lat = Some(30.0 + i as f64 * 0.001);
                AccidentRecord::new(obs).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_sample_capped() {
        let table = records(50);
        let rows: Vec<&AccidentRecord> = table.iter().collect();
        let options = SamplingOptions {
            cap: 10,
            seed: Some(7),
        };

        let points = sample_points(&rows, &options);
        assert_eq!(points.len(), 10);

        let distinct: HashSet<u64> = points.iter().map(|p| p.start_lat.to_bits()).collect();
        assert_eq!(distinct.len(), 10, "sampling must not repeat rows");
    }

    #[test]
    fn test_sample_smaller_than_cap() {
        let table = records(5);
        let rows: Vec<&AccidentRecord> = table.iter().collect();

        let points = sample_points(&rows, &SamplingOptions::default());
        assert_eq!(points.len(), 5);
    }

    #[test]
    fn test_seeded_sample_is_reproducible() {
        let table = records(100);
        let rows: Vec<&AccidentRecord> = table.iter().collect();
        let options = SamplingOptions {
            cap: 20,
            seed: Some(42),
        };

        assert_eq!(sample_points(&rows, &options), sample_points(&rows, &options));
    }

    #[test]
    fn test_empty_rows() {
        let points = sample_points(&[], &SamplingOptions::default());
        assert!(points.is_empty());
        assert_eq!(map_center(&points), None);
    }

    #[test]
    fn test_map_center() {
        let points = vec![
            MapPoint {
                start_lat: 30.0,
                start_lng: -100.0,
                city: None,
                state: None,
                severity: None,
            },
            MapPoint {
                start_lat: 40.0,
                start_lng: -80.0,
                city: None,
                state: None,
                severity: None,
            },
        ];
        assert_eq!(
            map_center(&points),
            Some(MapCenter {
                lat: 35.0,
                lng: -90.0
            })
        );
    }
}
