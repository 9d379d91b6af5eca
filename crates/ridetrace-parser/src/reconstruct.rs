use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use polars::prelude::*;

use crate::errors::ParseError;
use crate::model::{ColumnNames, TimeSeries, TimeSeriesRecord};
use crate::naming::parse_start_timestamp;
use crate::tabular::TabularSource;

/// Builds the absolute time series for one batch file: the start time comes
/// from the file name and each row adds its elapsed-seconds offset. The
/// elapsed column is consumed; output order is source order.
pub fn reconstruct<S>(
    path: &Path,
    source: &S,
    columns: &ColumnNames,
) -> Result<TimeSeries, ParseError>
where
    S: TabularSource + ?Sized,
{
    let start = parse_start_timestamp(path)?;
    let table = source.load_columns(path, &columns.required())?;

    let elapsed = float_values(path, &table, &columns.elapsed)?;
    let distance = float_values(path, &table, &columns.distance)?;
    let altitude = float_values(path, &table, &columns.altitude)?;

    let mut records = Vec::with_capacity(table.height());
    for (row, ((secs, km), alt)) in elapsed
        .into_iter()
        .zip(distance)
        .zip(altitude)
        .enumerate()
    {
        let row_index = row + 1;
        let secs = require(path, secs, row_index, &columns.elapsed)?;
        records.push(TimeSeriesRecord {
            timestamp: offset_timestamp(path, start, secs, row_index)?,
            distance: require(path, km, row_index, &columns.distance)?,
            altitude: require(path, alt, row_index, &columns.altitude)?,
        });
    }

    Ok(TimeSeries {
        source: path.to_path_buf(),
        start,
        columns: columns.clone(),
        records,
    })
}

/// `start + secs`, keeping microsecond precision.
pub fn offset_timestamp(
    path: &Path,
    start: DateTime<Utc>,
    secs: f64,
    row_index: usize,
) -> Result<DateTime<Utc>, ParseError> {
    let invalid = |message: String| ParseError::DataRow {
        path: path.to_path_buf(),
        row_index,
        message,
    };

    if !secs.is_finite() || secs < 0.0 {
        return Err(invalid(format!(
            "elapsed seconds must be a non-negative number, got {secs}"
        )));
    }

    let micros = (secs * 1_000_000.0).round() as i64;
    start
        .checked_add_signed(Duration::microseconds(micros))
        .ok_or_else(|| invalid(format!("elapsed seconds {secs} overflow the start timestamp")))
}

fn float_values(
    path: &Path,
    table: &DataFrame,
    name: &str,
) -> Result<Vec<Option<f64>>, ParseError> {
    let polars_err = |source: PolarsError| ParseError::Polars {
        path: path.to_path_buf(),
        source,
    };

    let column = table.column(name).map_err(|_| ParseError::MissingColumns {
        path: path.to_path_buf(),
        missing: vec![name.to_string()],
    })?;
    let cast = column.cast(&DataType::Float64).map_err(polars_err)?;
    let values = cast.f64().map_err(polars_err)?.into_iter().collect();
    Ok(values)
}

fn require(
    path: &Path,
    value: Option<f64>,
    row_index: usize,
    column: &str,
) -> Result<f64, ParseError> {
    value.ok_or_else(|| ParseError::DataRow {
        path: path.to_path_buf(),
        row_index,
        message: format!("column '{column}' is empty"),
    })
}
