//! Parquet encoding of the cleaned accident table.
//!
//! Column names are lowercase snake_case. On read, names are matched
//! case-insensitively and numeric/timestamp columns are cast to the expected
//! type, so tables written by other tools load as long as the base columns
//! exist. Derived columns are written for downstream consumers but are
//! recomputed on read.

use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, BooleanArray, Float64Array, Int32Array, Int64Array, StringArray,
    TimestampMicrosecondArray,
};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime};
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use tracing::{debug, warn};

use crate::error::{AccidentError, Result};
use crate::record::{AccidentRecord, Observation, weekday_name};

/// Columns the query layer cannot work without.
pub const REQUIRED_COLUMNS: &[&str] = &["start_time", "start_lat", "start_lng", "state", "severity"];

/// Alternate spellings accepted on read.
const COLUMN_ALIASES: &[(&str, &str)] = &[("day_of_week", "dayofweek")];

/// Arrow schema of the persisted table.
pub fn accident_schema() -> SchemaRef {
    let ts = DataType::Timestamp(TimeUnit::Microsecond, None);
    Arc::new(Schema::new(vec![
        Field::new("start_time", ts.clone(), false),
        Field::new("end_time", ts, true),
        Field::new("start_lat", DataType::Float64, false),
        Field::new("start_lng", DataType::Float64, false),
        Field::new("state", DataType::Utf8, true),
        Field::new("city", DataType::Utf8, true),
        Field::new("severity", DataType::Int64, true),
        Field::new("weather_condition", DataType::Utf8, true),
        // Derived
        Field::new("year", DataType::Int32, false),
        Field::new("month", DataType::Int32, false),
        Field::new("day_of_week", DataType::Utf8, false),
        Field::new("hour", DataType::Int32, false),
        Field::new("rush_hour", DataType::Boolean, false),
        Field::new("tile_lat", DataType::Float64, false),
        Field::new("tile_lng", DataType::Float64, false),
    ]))
}

fn micros(t: NaiveDateTime) -> i64 {
    t.and_utc().timestamp_micros()
}

fn from_micros(v: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_micros(v).map(|dt| dt.naive_utc())
}

/// Serializes records into a single-row-group-per-batch Parquet file.
#[tracing::instrument(skip(records), fields(rows = records.len()))]
pub fn encode(records: &[AccidentRecord]) -> Result<Bytes> {
    let schema = accident_schema();

    let columns: Vec<ArrayRef> = vec![
        Arc::new(TimestampMicrosecondArray::from(
            records.iter().map(|r| micros(r.start_time())).collect::<Vec<_>>(),
        )),
        Arc::new(TimestampMicrosecondArray::from(
            records
                .iter()
                .map(|r| r.end_time().map(micros))
                .collect::<Vec<_>>(),
        )),
        Arc::new(Float64Array::from(
            records.iter().map(|r| r.start_lat()).collect::<Vec<_>>(),
        )),
        Arc::new(Float64Array::from(
            records.iter().map(|r| r.start_lng()).collect::<Vec<_>>(),
        )),
        Arc::new(StringArray::from(
            records.iter().map(|r| r.state()).collect::<Vec<_>>(),
        )),
        Arc::new(StringArray::from(
            records.iter().map(|r| r.city()).collect::<Vec<_>>(),
        )),
        Arc::new(Int64Array::from(
            records
                .iter()
                .map(|r| r.severity().map(i64::from))
                .collect::<Vec<_>>(),
        )),
        Arc::new(StringArray::from(
            records
                .iter()
                .map(|r| r.weather_condition())
                .collect::<Vec<_>>(),
        )),
        Arc::new(Int32Array::from(
            records.iter().map(|r| r.year()).collect::<Vec<_>>(),
        )),
        Arc::new(Int32Array::from(
            records.iter().map(|r| r.month() as i32).collect::<Vec<_>>(),
        )),
        Arc::new(StringArray::from(
            records
                .iter()
                .map(|r| weekday_name(r.day_of_week()))
                .collect::<Vec<_>>(),
        )),
        Arc::new(Int32Array::from(
            records.iter().map(|r| r.hour() as i32).collect::<Vec<_>>(),
        )),
        Arc::new(BooleanArray::from(
            records.iter().map(|r| r.rush_hour()).collect::<Vec<_>>(),
        )),
        Arc::new(Float64Array::from(
            records.iter().map(|r| r.tile_lat()).collect::<Vec<_>>(),
        )),
        Arc::new(Float64Array::from(
            records.iter().map(|r| r.tile_lng()).collect::<Vec<_>>(),
        )),
    ];

    let batch = RecordBatch::try_new(schema.clone(), columns)?;

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut buf = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buf, schema, Some(props))?;
    writer.write(&batch)?;
    writer.close()?;

    debug!(bytes = buf.len(), "Encoded parquet table");
    Ok(Bytes::from(buf))
}

/// Finds a column by case-insensitive name, honouring aliases.
fn find_column(batch: &RecordBatch, name: &str) -> Option<ArrayRef> {
    let schema = batch.schema();
    let alias = COLUMN_ALIASES
        .iter()
        .find(|(canonical, _)| *canonical == name)
        .map(|(_, alias)| *alias);

    schema
        .fields()
        .iter()
        .position(|f| {
            f.name().eq_ignore_ascii_case(name)
                || alias.is_some_and(|a| f.name().eq_ignore_ascii_case(a))
        })
        .map(|i| batch.column(i).clone())
}

fn column_as(batch: &RecordBatch, name: &str, to: &DataType) -> Result<Option<ArrayRef>> {
    find_column(batch, name)
        .map(|col| cast(&col, to))
        .transpose()
        .map_err(AccidentError::from)
}

fn downcast<'a, T: 'static>(array: &'a ArrayRef, name: &str) -> Result<&'a T> {
    array.as_any().downcast_ref::<T>().ok_or_else(|| {
        AccidentError::Arrow(arrow::error::ArrowError::CastError(format!(
            "column '{name}' has unexpected type {}",
            array.data_type()
        )))
    })
}

fn string_at(array: Option<&StringArray>, i: usize) -> Option<String> {
    let array = array?;
    if array.is_null(i) {
        return None;
    }
    let value = array.value(i).trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn primitive_at<T>(array: Option<&arrow::array::PrimitiveArray<T>>, i: usize) -> Option<T::Native>
where
    T: arrow::datatypes::ArrowPrimitiveType,
{
    let array = array?;
    if array.is_null(i) {
        None
    } else {
        Some(array.value(i))
    }
}

/// Checks that every required column exists in the file schema.
fn check_schema(schema: &Schema) -> Result<()> {
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|name| {
            !schema
                .fields()
                .iter()
                .any(|f| f.name().eq_ignore_ascii_case(name))
        })
        .map(|name| name.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AccidentError::SchemaMismatch {
            source_name: "cleaned table".to_string(),
            missing,
        })
    }
}

/// Decodes a Parquet file into records.
///
/// Rows that no longer satisfy the cleaning invariants are skipped with a
/// warning rather than failing the whole load.
#[tracing::instrument(skip(bytes), fields(bytes = bytes.len()))]
pub fn decode(bytes: Bytes) -> Result<Vec<AccidentRecord>> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(bytes)?;
    check_schema(builder.schema())?;
    let reader = builder.build()?;

    let ts = DataType::Timestamp(TimeUnit::Microsecond, None);
    let mut records = Vec::new();
    let mut skipped = 0usize;

    for batch in reader {
        let batch = batch?;

        let start_time = column_as(&batch, "start_time", &ts)?;
        let end_time = column_as(&batch, "end_time", &ts)?;
        let start_lat = column_as(&batch, "start_lat", &DataType::Float64)?;
        let start_lng = column_as(&batch, "start_lng", &DataType::Float64)?;
        let state = column_as(&batch, "state", &DataType::Utf8)?;
        let city = column_as(&batch, "city", &DataType::Utf8)?;
        let severity = column_as(&batch, "severity", &DataType::Int64)?;
        let weather = column_as(&batch, "weather_condition", &DataType::Utf8)?;

        let start_time = start_time
            .as_ref()
            .map(|a| downcast::<TimestampMicrosecondArray>(a, "start_time"))
            .transpose()?;
        let end_time = end_time
            .as_ref()
            .map(|a| downcast::<TimestampMicrosecondArray>(a, "end_time"))
            .transpose()?;
        let start_lat = start_lat
            .as_ref()
            .map(|a| downcast::<Float64Array>(a, "start_lat"))
            .transpose()?;
        let start_lng = start_lng
            .as_ref()
            .map(|a| downcast::<Float64Array>(a, "start_lng"))
            .transpose()?;
        let state = state
            .as_ref()
            .map(|a| downcast::<StringArray>(a, "state"))
            .transpose()?;
        let city = city
            .as_ref()
            .map(|a| downcast::<StringArray>(a, "city"))
            .transpose()?;
        let severity = severity
            .as_ref()
            .map(|a| downcast::<Int64Array>(a, "severity"))
            .transpose()?;
        let weather = weather
            .as_ref()
            .map(|a| downcast::<StringArray>(a, "weather_condition"))
            .transpose()?;

        for i in 0..batch.num_rows() {
            let obs = Observation {
                start_time: primitive_at(start_time, i).and_then(from_micros),
                end_time: primitive_at(end_time, i).and_then(from_micros),
                start_lat: primitive_at(start_lat, i),
                start_lng: primitive_at(start_lng, i),
                state: string_at(state, i),
                city: string_at(city, i),
                severity: primitive_at(severity, i).and_then(|v| u8::try_from(v).ok()),
                weather_condition: string_at(weather, i),
            };

            match AccidentRecord::new(obs) {
                Ok(record) => records.push(record),
                Err(_) => skipped += 1,
            }
        }
    }

    if skipped > 0 {
        warn!(skipped, "Skipped rows violating table invariants");
    }
    debug!(rows = records.len(), "Decoded parquet table");
    Ok(records)
}
