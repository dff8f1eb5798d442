//! Rolling sensor log kept in a spreadsheet-style grid: one row per sensor, one
//! column per calendar day, and a `morning/afternoon` pair of readings per cell.

pub mod clock;
pub mod error;
pub mod feed;
pub mod readings;
pub mod settings;
pub mod sheet;
pub mod tracker;
mod utils;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{SheetError, StoreError};
pub use readings::{ReadingSlot, WriteCoordinator, WriteOutcome};
pub use settings::{SheetConfig, Settings};
pub use sheet::{MemorySheet, SheetStore, SqliteSheet, StoreHandle, WriteMode};
pub use tracker::{DayCheck, DayTracker, SensorId, SensorRowIndex};
