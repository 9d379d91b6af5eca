use std::fs::File;
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use polars::prelude::*;

use crate::errors::ParseError;

/// Loads named columns from a tabular file.
///
/// Implementations return a frame holding exactly `columns`, in the order
/// given, as `Float64`, with source row order preserved. Any requested name
/// absent from the source is a [`ParseError::MissingColumns`].
pub trait TabularSource: Send + Sync {
    fn name(&self) -> &'static str;
    fn load_columns(&self, path: &Path, columns: &[&str]) -> Result<DataFrame, ParseError>;
}

/// Delimited text with a header row, read through the `csv` crate.
#[derive(Debug, Clone, Copy)]
pub struct CsvTabularSource {
    pub delimiter: u8,
}

impl Default for CsvTabularSource {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl TabularSource for CsvTabularSource {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn load_columns(&self, path: &Path, columns: &[&str]) -> Result<DataFrame, ParseError> {
        let file = File::open(path).map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let csv_err = |source: csv::Error| ParseError::Csv {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(file);

        let headers = reader.headers().map_err(csv_err)?.clone();
        let mut indices = Vec::with_capacity(columns.len());
        let mut missing = Vec::new();
        for name in columns {
            match headers.iter().position(|header| header == *name) {
                Some(index) => indices.push(index),
                None => missing.push((*name).to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(ParseError::MissingColumns {
                path: path.to_path_buf(),
                missing,
            });
        }

        let mut values: Vec<Vec<f64>> = vec![Vec::new(); columns.len()];
        for (row, record) in reader.records().enumerate() {
            let record = record.map_err(csv_err)?;
            for (slot, (&index, name)) in indices.iter().zip(columns).enumerate() {
                let raw = record.get(index).unwrap_or_default();
                values[slot].push(parse_required_f64(path, raw, row + 1, name)?);
            }
        }

        let frame_columns: Vec<Column> = columns
            .iter()
            .zip(values)
            .map(|(name, data)| Series::new((*name).into(), data).into())
            .collect();

        DataFrame::new(frame_columns).map_err(|source| ParseError::Polars {
            path: path.to_path_buf(),
            source,
        })
    }
}

pub(crate) fn parse_required_f64(
    path: &Path,
    value: &str,
    row_index: usize,
    column: &str,
) -> Result<f64, ParseError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|err| ParseError::DataRow {
            path: path.to_path_buf(),
            row_index,
            message: format!("failed to parse column '{column}' value '{value}' as float: {err}"),
        })
}
