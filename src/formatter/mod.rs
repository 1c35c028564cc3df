pub mod influx;
pub mod json;

pub use influx::{InfluxBatchFormatter, Measurement, TimestampSource};
pub use json::JsonFormatter;
