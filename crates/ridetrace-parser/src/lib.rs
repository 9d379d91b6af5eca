pub mod errors;
pub mod model;
pub mod naming;
mod reconstruct;
pub mod tabular;

pub use errors::ParseError;
pub use model::{ColumnNames, TimeSeries, TimeSeriesRecord, TIMESTAMP_COLUMN};
pub use naming::parse_start_timestamp;
pub use reconstruct::{offset_timestamp, reconstruct};
pub use tabular::{CsvTabularSource, TabularSource};
