use std::path::PathBuf;

use polars::error::PolarsError;
use thiserror::Error;

/// Failures scoped to a single batch file. The pipeline records these per file
/// and moves on to the next one.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("{}: file name has no usable stem", .path.display())]
    MissingStem { path: PathBuf },

    #[error(
        "{}: file name '{stem}' has {found} '_'-separated fields, expected 6 (YYYY_MM_DD_HH_MM_SS)",
        .path.display()
    )]
    FieldCount {
        path: PathBuf,
        stem: String,
        found: usize,
    },

    #[error("{}: file name field {position} ('{field}') is not numeric", .path.display())]
    NonNumericField {
        path: PathBuf,
        field: String,
        position: usize,
    },

    #[error("{}: file name '{stem}' is not a valid calendar timestamp", .path.display())]
    InvalidDate { path: PathBuf, stem: String },

    #[error("{}: failed to open tabular source: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: CSV error: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{}: missing required columns: {}", .path.display(), .missing.join(", "))]
    MissingColumns { path: PathBuf, missing: Vec<String> },

    #[error("{}: data row {row_index} invalid: {message}", .path.display())]
    DataRow {
        path: PathBuf,
        row_index: usize,
        message: String,
    },

    #[error("{}: polars operation failed: {source}", .path.display())]
    Polars {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },
}

impl ParseError {
    /// The batch file this error belongs to.
    pub fn path(&self) -> &std::path::Path {
        match self {
            ParseError::MissingStem { path }
            | ParseError::FieldCount { path, .. }
            | ParseError::NonNumericField { path, .. }
            | ParseError::InvalidDate { path, .. }
            | ParseError::Io { path, .. }
            | ParseError::Csv { path, .. }
            | ParseError::MissingColumns { path, .. }
            | ParseError::DataRow { path, .. }
            | ParseError::Polars { path, .. } => path,
        }
    }
}
