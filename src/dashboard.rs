//! The dashboard backend: a cached table plus the filter/aggregate pass
//! that runs on every selection change.

use std::collections::BTreeSet;

use tracing::{info, warn};

use crate::cache::{ParquetSource, TableCache, TableSource};
use crate::config::DashboardConfig;
use crate::error::Result;
use crate::query::{
    DashboardSummary, FilterOptions, FilterSpec, SamplingOptions, Selection, evaluate,
    filter_options,
};

pub struct Dashboard<S> {
    cache: TableCache<S>,
    sampling: SamplingOptions,
}

impl Dashboard<ParquetSource> {
    /// Builds a dashboard reading the table named in `config`.
    pub async fn open(config: &DashboardConfig) -> Self {
        let source = ParquetSource::open(config.table.clone()).await;
        Self::new(TableCache::new(source, config.invalidation), config.sampling)
    }
}

impl<S: TableSource> Dashboard<S> {
    pub fn new(cache: TableCache<S>, sampling: SamplingOptions) -> Self {
        Self { cache, sampling }
    }

    /// Widget choices for the given year selection.
    pub async fn options(&mut self, years: &BTreeSet<i32>) -> Result<FilterOptions> {
        let table = self.cache.get().await?;
        Ok(filter_options(table.records(), years))
    }

    /// Recomputes every aggregate for `spec`.
    ///
    /// Storage and schema failures propagate; an empty year selection or an
    /// empty result does not.
    #[tracing::instrument(skip(self))]
    pub async fn render(&mut self, spec: &FilterSpec) -> Result<Selection<DashboardSummary>> {
        let table = self.cache.get().await?;
        let outcome = evaluate(&table, spec, &self.sampling);

        match &outcome {
            Selection::Required => warn!("No years selected, waiting for a selection"),
            Selection::Ready(summary) => info!(
                rows = summary.total,
                table_rows = table.len(),
                "Dashboard recomputed"
            ),
        }
        Ok(outcome)
    }

    /// Forces the next render to reload the table.
    pub fn refresh(&mut self) {
        self.cache.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Invalidation;
    use crate::columnar;
    use crate::error::AccidentError;
    use crate::record::tests::{observation, ts};
    use crate::record::{AccidentRecord, AccidentTable};
    use crate::storage::{LocalStore, StorageLocation};
    use arrow::array::{Float64Array, StringArray, TimestampMicrosecondArray};
    use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
    use arrow::record_batch::RecordBatch;
    use async_trait::async_trait;
    use parquet::arrow::ArrowWriter;
    use std::env;
    use std::path::PathBuf;
    use std::sync::Arc;

    struct FixedSource;

    #[async_trait]
    impl TableSource for FixedSource {
        async fn load(&self) -> Result<AccidentTable> {
            let mut a = observation(ts(2020, 6, 1, 7, 0));
            a.state = Some("CA".to_string());
            a.severity = Some(2);
            let mut b = observation(ts(2021, 6, 1, 7, 0));
            b.state = Some("OR".to_string());
            b.severity = Some(4);
            Ok(AccidentTable::new(vec![
                AccidentRecord::new(a).unwrap(),
                AccidentRecord::new(b).unwrap(),
            ]))
        }
    }

    fn dashboard() -> Dashboard<FixedSource> {
        Dashboard::new(
            TableCache::new(FixedSource, Invalidation::Manual),
            SamplingOptions::default(),
        )
    }

    #[tokio::test]
    async fn test_render_requires_years() {
        let mut dash = dashboard();
        let outcome = dash.render(&FilterSpec::new([])).await.unwrap();
        assert!(outcome.is_required());
    }

    #[tokio::test]
    async fn test_render_filters() {
        let mut dash = dashboard();
        let summary = dash
            .render(&FilterSpec::new([2021]))
            .await
            .unwrap()
            .ready()
            .unwrap();

        assert_eq!(summary.total, 1);
        assert_eq!(summary.most_common_severity, Some(4));
    }

    fn parquet_dashboard(root: &std::path::Path) -> Dashboard<ParquetSource> {
        let location = StorageLocation::Local(root.join("accidents.parquet"));
        let source = ParquetSource::new(Arc::new(LocalStore::new(root)), location);
        Dashboard::new(
            TableCache::new(source, Invalidation::Manual),
            SamplingOptions::default(),
        )
    }

    fn temp_root(name: &str) -> PathBuf {
        let root = env::temp_dir().join(name);
        let _ = std::fs::remove_dir_all(&root);
        std::fs::create_dir_all(&root).unwrap();
        root
    }

    fn write_valid_table(root: &std::path::Path) {
        let mut obs = observation(ts(2021, 6, 1, 7, 0));
        obs.state = Some("CA".to_string());
        obs.severity = Some(2);
        let bytes = columnar::encode(&[AccidentRecord::new(obs).unwrap()]).unwrap();
        std::fs::write(root.join("accidents.parquet"), bytes).unwrap();
    }

    #[tokio::test]
    async fn test_missing_table_fails_then_retries() {
        let root = temp_root("accident_analytics_dash_missing");
        let mut dash = parquet_dashboard(&root);

        let err = dash.render(&FilterSpec::new([2021])).await.unwrap_err();
        assert!(matches!(err, AccidentError::Storage(_)));
        let err = dash.options(&BTreeSet::from([2021])).await.unwrap_err();
        assert!(matches!(err, AccidentError::Storage(_)));

        // Nothing was cached, so the next call loads the table once it exists.
        write_valid_table(&root);
        let summary = dash
            .render(&FilterSpec::new([2021]))
            .await
            .unwrap()
            .ready()
            .unwrap();
        assert_eq!(summary.total, 1);

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[tokio::test]
    async fn test_table_without_severity_fails_then_retries() {
        let root = temp_root("accident_analytics_dash_schema");
        let schema = Arc::new(Schema::new(vec![
            Field::new("start_time", DataType::Timestamp(TimeUnit::Microsecond, None), false),
            Field::new("start_lat", DataType::Float64, false),
            Field::new("start_lng", DataType::Float64, false),
            Field::new("state", DataType::Utf8, true),
        ]));
        let start = ts(2021, 6, 1, 7, 0).and_utc().timestamp_micros();
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(TimestampMicrosecondArray::from(vec![start])),
                Arc::new(Float64Array::from(vec![37.77])),
                Arc::new(Float64Array::from(vec![-122.41])),
                Arc::new(StringArray::from(vec![Some("CA")])),
            ],
        )
        .unwrap();
        let mut buf = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buf, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
        std::fs::write(root.join("accidents.parquet"), buf).unwrap();

        let mut dash = parquet_dashboard(&root);
        match dash.render(&FilterSpec::new([2021])).await {
            Err(AccidentError::SchemaMismatch { missing, .. }) => {
                assert_eq!(missing, vec!["severity"]);
            }
            other => panic!("expected schema mismatch, got {other:?}"),
        }

        write_valid_table(&root);
        let options = dash.options(&BTreeSet::from([2021])).await.unwrap();
        assert_eq!(options.severities, vec![2]);

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[tokio::test]
    async fn test_options_follow_years() {
        let mut dash = dashboard();
        let options = dash.options(&BTreeSet::from([2020])).await.unwrap();

        assert_eq!(options.states, vec!["CA"]);
        assert_eq!(options.severities, vec![2]);
    }
}
