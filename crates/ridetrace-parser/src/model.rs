use std::path::PathBuf;

use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

pub const TIMESTAMP_COLUMN: &str = "timestamp_utc";

/// Header names of the three columns a batch file must carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnNames {
    pub elapsed: String,
    pub distance: String,
    pub altitude: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            elapsed: "secs".to_string(),
            distance: "km".to_string(),
            altitude: "alt".to_string(),
        }
    }
}

impl ColumnNames {
    pub fn required(&self) -> [&str; 3] {
        [
            self.elapsed.as_str(),
            self.distance.as_str(),
            self.altitude.as_str(),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesRecord {
    pub timestamp: DateTime<Utc>,
    pub distance: f64,
    pub altitude: f64,
}

/// Rows of one batch file with absolute timestamps, in source row order.
#[derive(Debug, Clone)]
pub struct TimeSeries {
    pub source: PathBuf,
    pub start: DateTime<Utc>,
    pub columns: ColumnNames,
    pub records: Vec<TimeSeriesRecord>,
}

impl TimeSeries {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Earliest and latest timestamp. Rows are not assumed to be sorted.
    pub fn time_span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let first = self.records.first()?.timestamp;
        Some(
            self.records
                .iter()
                .fold((first, first), |(min, max), record| {
                    (min.min(record.timestamp), max.max(record.timestamp))
                }),
        )
    }

    /// Tabular view with the timestamp column in place of the elapsed-seconds column.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let micros: Vec<i64> = self
            .records
            .iter()
            .map(|record| record.timestamp.timestamp_micros())
            .collect();
        let distance: Vec<f64> = self.records.iter().map(|record| record.distance).collect();
        let altitude: Vec<f64> = self.records.iter().map(|record| record.altitude).collect();

        let ts_series = Series::new(TIMESTAMP_COLUMN.into(), micros)
            .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?;

        DataFrame::new(vec![
            ts_series.into(),
            Series::new(self.columns.distance.as_str().into(), distance).into(),
            Series::new(self.columns.altitude.as_str().into(), altitude).into(),
        ])
    }
}
