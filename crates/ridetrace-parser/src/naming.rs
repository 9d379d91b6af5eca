use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};

use crate::errors::ParseError;

pub const STEM_DELIMITER: char = '_';
pub const STEM_FIELD_COUNT: usize = 6;

/// Decodes the recording start time from a batch file name such as
/// `2023_04_01_12_30_00.csv`. Fields may be zero padded or not. The value is
/// taken as UTC; no zone inference happens here.
pub fn parse_start_timestamp(path: &Path) -> Result<DateTime<Utc>, ParseError> {
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| ParseError::MissingStem {
            path: path.to_path_buf(),
        })?;

    let fields: Vec<&str> = stem.split(STEM_DELIMITER).collect();
    if fields.len() != STEM_FIELD_COUNT {
        return Err(ParseError::FieldCount {
            path: path.to_path_buf(),
            stem: stem.to_string(),
            found: fields.len(),
        });
    }

    let mut values = [0u32; STEM_FIELD_COUNT];
    for (position, field) in fields.iter().enumerate() {
        values[position] = parse_field(path, field, position)?;
    }

    let [year, month, day, hour, minute, second] = values;
    let year = i32::try_from(year).map_err(|_| ParseError::InvalidDate {
        path: path.to_path_buf(),
        stem: stem.to_string(),
    })?;

    Utc.with_ymd_and_hms(year, month, day, hour, minute, second)
        .single()
        .ok_or_else(|| ParseError::InvalidDate {
            path: path.to_path_buf(),
            stem: stem.to_string(),
        })
}

fn parse_field(path: &Path, field: &str, position: usize) -> Result<u32, ParseError> {
    let non_numeric = || ParseError::NonNumericField {
        path: path.to_path_buf(),
        field: field.to_string(),
        position,
    };

    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(non_numeric());
    }
    field.parse::<u32>().map_err(|_| non_numeric())
}
