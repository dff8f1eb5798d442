#![allow(dead_code)]

use std::{
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    time::Duration,
};

use chrono::{DateTime, TimeZone, Utc};
use templog_lib::{
    sheet::{CellRange, Table},
    Clock, MemorySheet, SheetConfig, SheetStore, StoreError, StoreHandle, WriteMode,
};

pub fn config() -> SheetConfig {
    SheetConfig {
        zone: chrono_tz::UTC,
        noon_hour: 12,
        sheet_id: "test".into(),
        id_column: 2,
        store_timeout: Duration::from_secs(2),
    }
}

pub fn at(month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, month, day, hour, 0, 0).unwrap()
}

/// Name column, id column and one dated column for June 1st.
pub fn fixture_cells() -> Vec<(&'static str, &'static str)> {
    vec![
        ("A1", "Name"),
        ("B1", "Number"),
        ("C1", "6/1"),
        ("A2", "Kitchen"),
        ("B2", "42"),
        ("C2", "20.1/22.4"),
        ("A3", "Porch"),
        ("B3", "43"),
        ("A4", "Attic"),
        ("B4", "oops"),
    ]
}

pub fn handle<S: SheetStore>(store: S) -> StoreHandle<S> {
    StoreHandle::new(store, Duration::from_secs(2))
}

/// Memory sheet whose reads stall, widening read-modify-write windows.
pub struct SlowSheet {
    pub inner: MemorySheet,
    pub delay: Duration,
}

impl SheetStore for SlowSheet {
    fn get_range(&self, range: &CellRange) -> Result<Table, StoreError> {
        std::thread::sleep(self.delay);
        self.inner.get_range(range)
    }

    fn set_cell(&self, col: u32, row: u32, value: &str, mode: WriteMode) -> Result<(), StoreError> {
        self.inner.set_cell(col, row, value, mode)
    }
}

/// Memory sheet whose first cell write stalls for `delay` before landing.
pub struct StallFirstWrite {
    pub inner: MemorySheet,
    pub delay: Duration,
    stalled: AtomicBool,
}

impl StallFirstWrite {
    pub fn new(inner: MemorySheet, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            stalled: AtomicBool::new(false),
        }
    }
}

impl SheetStore for StallFirstWrite {
    fn get_range(&self, range: &CellRange) -> Result<Table, StoreError> {
        self.inner.get_range(range)
    }

    fn set_cell(&self, col: u32, row: u32, value: &str, mode: WriteMode) -> Result<(), StoreError> {
        if !self.stalled.swap(true, Ordering::SeqCst) {
            std::thread::sleep(self.delay);
        }
        self.inner.set_cell(col, row, value, mode)
    }
}

/// Memory sheet that rejects writes below the header row.
pub struct ReadOnlyBody {
    pub inner: MemorySheet,
}

impl SheetStore for ReadOnlyBody {
    fn get_range(&self, range: &CellRange) -> Result<Table, StoreError> {
        self.inner.get_range(range)
    }

    fn set_cell(&self, col: u32, row: u32, value: &str, mode: WriteMode) -> Result<(), StoreError> {
        if row > 1 {
            return Err(StoreError::Request("permission denied".into()));
        }
        self.inner.set_cell(col, row, value, mode)
    }
}

/// Hands out the given instants in turn, repeating the last one.
pub struct SequenceClock {
    times: Vec<DateTime<Utc>>,
    next: AtomicUsize,
}

impl SequenceClock {
    pub fn new(times: Vec<DateTime<Utc>>) -> Self {
        Self {
            times,
            next: AtomicUsize::new(0),
        }
    }
}

impl Clock for SequenceClock {
    fn now(&self) -> DateTime<Utc> {
        let idx = self.next.fetch_add(1, Ordering::SeqCst);
        self.times[idx.min(self.times.len() - 1)]
    }
}
