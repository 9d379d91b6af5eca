#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::Path;

use chrono::{DateTime, Duration, TimeZone, Utc};
use ridetrace_core::parser::{ColumnNames, TimeSeries, TimeSeriesRecord};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

pub fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, contents) in entries {
        zip.start_file(*name, options).expect("start zip entry");
        zip.write_all(contents).expect("write zip entry");
    }
    zip.finish().expect("finish zip").into_inner()
}

pub fn write_file(path: &Path, contents: &[u8]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent");
    }
    std::fs::write(path, contents).expect("write file");
}

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 4, 1, 12, 30, 0).unwrap()
}

/// Series with one record per `(elapsed_secs, altitude)` pair.
pub fn series(points: &[(i64, f64)]) -> TimeSeries {
    let start = start();
    TimeSeries {
        source: "2023_04_01_12_30_00.csv".into(),
        start,
        columns: ColumnNames::default(),
        records: points
            .iter()
            .enumerate()
            .map(|(idx, (secs, alt))| TimeSeriesRecord {
                timestamp: start + Duration::seconds(*secs),
                distance: idx as f64 * 0.01,
                altitude: *alt,
            })
            .collect(),
    }
}

pub const GOOD_BATCH: &str = "secs,km,alt\n0,0,100.0\n1,0.01,100.5\n2,0.02,101.0\n65,0.3,104.0\n";
