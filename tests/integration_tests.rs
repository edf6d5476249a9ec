use std::collections::BTreeSet;
use std::env;
use std::io::Write;
use std::path::PathBuf;

use accident_analytics::config::{DashboardConfig, EtlConfig, RunMode};
use accident_analytics::dashboard::Dashboard;
use accident_analytics::etl::run_etl;
use accident_analytics::query::{FilterSpec, HourRange, SamplingOptions};
use accident_analytics::report::DataOrigin;
use accident_analytics::storage::StorageLocation;
use flate2::Compression;
use flate2::write::GzEncoder;

const RAW: &str = "\
Start_Time,End_Time,Start_Lat,Start_Lng,State,City,Severity,Weather_Condition
2021-03-01 08:15:00,2021-03-01 08:45:00,34.05,-118.24,CA,Los Angeles,2,Clear
2021-03-02 17:05:00,2021-03-02 17:15:00,34.05,-118.24,CA,Los Angeles,2,Rain
2021-07-04 12:00:00,,29.76,-95.36,TX,Houston,3,Clear
2022-01-10 07:30:00,2022-01-10 10:30:00,29.76,-95.36,TX,Houston,4,Fog
2019-01-01 10:00:00,,40.71,-74.00,NY,New York,2,Clear
2022-05-05 09:00:00,,0,0,FL,,1,Clear
yesterday,,25.76,-80.19,FL,Miami,1,Clear
";

fn temp_root(name: &str) -> PathBuf {
    let root = env::temp_dir().join(name);
    let _ = std::fs::remove_dir_all(&root);
    std::fs::create_dir_all(&root).unwrap();
    root
}

fn write_gzip(path: &PathBuf, contents: &str) {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(contents.as_bytes()).unwrap();
    std::fs::write(path, encoder.finish().unwrap()).unwrap();
}

fn dashboard_config(table: &PathBuf, seed: Option<u64>) -> DashboardConfig {
    DashboardConfig::new(
        StorageLocation::Local(table.clone()),
        None,
        SamplingOptions { cap: 3000, seed },
    )
}

#[tokio::test]
async fn test_full_pipeline() {
    let root = temp_root("accident_analytics_it_full");
    let raw = root.join("accidents.csv.gz");
    let table = root.join("accidents.parquet");
    write_gzip(&raw, RAW);

    let config = EtlConfig::new(
        StorageLocation::Local(raw),
        StorageLocation::Local(table.clone()),
        RunMode::Production,
    );
    let report = run_etl(&config).await.expect("ETL failed");

    assert_eq!(report.origin, DataOrigin::Source);
    assert_eq!(report.rows_read, 7);
    assert_eq!(report.dropped_unparseable_time, 1);
    assert_eq!(report.dropped_out_of_range, 1);
    assert_eq!(report.dropped_sentinel_coordinates, 1);
    assert_eq!(report.rows_written, 4);

    let mut dashboard = Dashboard::open(&dashboard_config(&table, Some(1))).await;

    let summary = dashboard
        .render(&FilterSpec::new([2021]))
        .await
        .unwrap()
        .ready()
        .expect("years were selected");

    assert_eq!(summary.total, 3);
    assert_eq!(summary.distinct_states, 2);
    assert_eq!(summary.most_common_severity, Some(2));
    assert_eq!(summary.mean_response_minutes, Some(20.0));
    assert_eq!(summary.by_state[0].state, "CA");
    assert_eq!(summary.by_state[0].code, Some("CA"));
    assert_eq!(summary.by_state[0].count, 2);
    assert_eq!(summary.top_weather[0].label, "Clear");
    assert_eq!(summary.top_weather[0].count, 2);
    assert_eq!(summary.hotspots[0].count, 2);
    assert_eq!(summary.map_points.len(), 3);
    assert!(summary.map_center.is_some());

    // Fog row responds in 180 minutes, clamped to 120.
    let spec = FilterSpec::new([2021, 2022])
        .with_state("TX")
        .with_hour_range(HourRange::new(7, 12).unwrap());
    let texas = dashboard.render(&spec).await.unwrap().ready().unwrap();

    assert_eq!(texas.total, 2);
    assert_eq!(texas.mean_response_minutes, Some(120.0));
    assert_eq!(texas.most_common_severity, Some(3));

    let none = dashboard
        .render(&FilterSpec::new([2021]).with_severities([4]))
        .await
        .unwrap()
        .ready()
        .unwrap();
    assert_eq!(none.total, 0);
    assert_eq!(none.most_common_severity, None);
    assert_eq!(none.mean_response_minutes, None);
    assert!(none.map_points.is_empty());

    let options = dashboard.options(&BTreeSet::from([2022])).await.unwrap();
    assert_eq!(options.states, vec!["TX"]);
    assert_eq!(options.severities, vec![4]);

    std::fs::remove_dir_all(&root).unwrap();
}

#[tokio::test]
async fn test_no_years_selected() {
    let root = temp_root("accident_analytics_it_no_years");
    let raw = root.join("accidents.csv");
    let table = root.join("accidents.parquet");
    std::fs::write(&raw, RAW).unwrap();

    let config = EtlConfig::new(
        StorageLocation::Local(raw),
        StorageLocation::Local(table.clone()),
        RunMode::Production,
    );
    run_etl(&config).await.unwrap();

    let mut dashboard = Dashboard::open(&dashboard_config(&table, None)).await;
    let outcome = dashboard.render(&FilterSpec::new([])).await.unwrap();
    assert!(outcome.is_required());

    std::fs::remove_dir_all(&root).unwrap();
}

#[tokio::test]
async fn test_sample_mode_pipeline() {
    let root = temp_root("accident_analytics_it_sample");
    let table = root.join("accidents.parquet");

    let config = EtlConfig::new(
        StorageLocation::Local(root.join("missing.csv")),
        StorageLocation::Local(table.clone()),
        RunMode::Sample,
    );
    let report = run_etl(&config).await.unwrap();
    assert_eq!(report.origin, DataOrigin::Sample);
    assert_eq!(report.rows_written, 2);

    let mut dashboard = Dashboard::open(&dashboard_config(&table, None)).await;
    let summary = dashboard
        .render(&FilterSpec::new([2021]))
        .await
        .unwrap()
        .ready()
        .unwrap();

    assert_eq!(summary.total, 1);
    assert_eq!(summary.distinct_states, 1);
    assert_eq!(summary.most_common_severity, Some(2));
    assert_eq!(summary.mean_response_minutes, Some(30.0));
    assert_eq!(summary.by_state[0].code, Some("CA"));
    assert_eq!(summary.map_points.len(), 1);

    std::fs::remove_dir_all(&root).unwrap();
}

#[tokio::test]
async fn test_seeded_map_sample_is_stable() {
    let root = temp_root("accident_analytics_it_seed");
    let raw = root.join("accidents.csv");
    let table = root.join("accidents.parquet");
    std::fs::write(&raw, RAW).unwrap();

    let config = EtlConfig::new(
        StorageLocation::Local(raw),
        StorageLocation::Local(table.clone()),
        RunMode::Production,
    );
    run_etl(&config).await.unwrap();

    let mut cfg = dashboard_config(&table, Some(42));
    cfg.sampling.cap = 2;
    let mut dashboard = Dashboard::open(&cfg).await;
    let spec = FilterSpec::new([2021, 2022]);

    let first = dashboard.render(&spec).await.unwrap().ready().unwrap();
    let second = dashboard.render(&spec).await.unwrap().ready().unwrap();

    assert_eq!(first.total, 4);
    assert_eq!(first.map_points.len(), 2);
    assert_eq!(
        serde_json::to_string(&first.map_points).unwrap(),
        serde_json::to_string(&second.map_points).unwrap()
    );

    std::fs::remove_dir_all(&root).unwrap();
}
