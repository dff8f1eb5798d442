pub mod day;
pub mod row_index;

pub use day::{DayCheck, DayTracker, TrackerState, HEADER_ROW};
pub use row_index::{SensorRowIndex, SkippedRow};

/// Identifier written in the sheet's identifier column for each physical sensor.
pub type SensorId = i64;
