use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SheetError};
use crate::sheet::{CellRange, SheetStore, StoreHandle, WriteMode};

use super::row_index::SensorRowIndex;

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Row holding the `month/day` label of every day column.
pub const HEADER_ROW: u32 = 1;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TrackerState {
    Uninitialized,
    Synced,
    /// The last header check failed; the column is kept and the next call checks again.
    Stale,
}

/// What a [`DayTracker::check_date`] call did.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DayCheck {
    /// Already checked today; the store was not touched.
    Cached,
    /// The header matches today.
    Current,
    /// A new day column was opened.
    Advanced { column: u32, header: String },
}

/// Parse a `month/day` header (no year). Leading zeros are accepted.
pub fn parse_header(text: &str) -> Result<(u32, u32)> {
    let bad = || SheetError::format("date header", text);

    let (month, day) = text.trim().split_once('/').ok_or_else(bad)?;
    let number = |part: &str| -> Result<u32> {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(bad());
        }
        part.parse().map_err(|_| bad())
    };
    let month = number(month)?;
    let day = number(day)?;

    // Leap year so that 2/29 is a valid header.
    NaiveDate::from_ymd_opt(2000, month, day).ok_or_else(bad)?;
    Ok((month, day))
}

pub fn format_header(date: NaiveDate) -> String {
    format!("{}/{}", date.month(), date.day())
}

/// Owns the current day column and the date it was last checked against.
#[derive(Debug, Clone)]
pub struct DayTracker {
    zone: Tz,
    col_now: u32,
    last_checked: Option<NaiveDate>,
    state: TrackerState,
}

impl DayTracker {
    pub fn new(zone: Tz) -> Self {
        Self::resume_at(zone, 0)
    }

    /// Start from a column already known to be the latest day column.
    pub fn resume_at(zone: Tz, column: u32) -> Self {
        Self {
            zone,
            col_now: column,
            last_checked: None,
            state: TrackerState::Uninitialized,
        }
    }

    pub fn column(&self) -> u32 {
        self.col_now
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    pub fn last_checked(&self) -> Option<NaiveDate> {
        self.last_checked
    }

    /// Confirm the current column carries a header. When it does not, the column is
    /// recomputed from the header row and the identifier column is re-indexed; the
    /// fresh index is returned in that case.
    pub async fn init<S: SheetStore>(
        &mut self,
        store: &StoreHandle<S>,
        id_column: u32,
    ) -> Result<Option<SensorRowIndex>> {
        let header = if self.col_now >= 1 {
            store.read_cell(self.col_now, HEADER_ROW).await?
        } else {
            String::new()
        };

        let rebuilt = if header.is_empty() {
            let index = SensorRowIndex::scan(store, id_column).await?;
            let header_row = store
                .read_range(CellRange::rows(HEADER_ROW, HEADER_ROW))
                .await?;
            self.col_now = last_populated(header_row.first().map(Vec::as_slice));
            log_info!(
                "day tracker: {} sensors indexed, latest day column {}",
                index.len(),
                self.col_now
            );
            Some(index)
        } else {
            None
        };

        self.state = TrackerState::Synced;
        Ok(rebuilt)
    }

    /// Make sure the current column is today's, opening a new one at rollover.
    pub async fn check_date<S: SheetStore>(
        &mut self,
        store: &StoreHandle<S>,
        now: DateTime<Utc>,
    ) -> Result<DayCheck> {
        let today = now.with_timezone(&self.zone).date_naive();
        if self.state == TrackerState::Synced && self.last_checked == Some(today) {
            return Ok(DayCheck::Cached);
        }
        self.last_checked = Some(today);

        match self.sync_column(store, today).await {
            Ok(check) => {
                self.state = TrackerState::Synced;
                Ok(check)
            }
            Err(err) => {
                log_warn!(
                    "day tracker: header check failed, staying on column {}: {}",
                    self.col_now,
                    err
                );
                self.state = TrackerState::Stale;
                Err(err)
            }
        }
    }

    async fn sync_column<S: SheetStore>(
        &mut self,
        store: &StoreHandle<S>,
        today: NaiveDate,
    ) -> Result<DayCheck> {
        if self.col_now >= 1 {
            let header = store.read_cell(self.col_now, HEADER_ROW).await?;
            let (month, day) = parse_header(&header)?;
            if month == today.month() && day == today.day() {
                return Ok(DayCheck::Current);
            }
        }

        let column = self.col_now + 1;
        let header = format_header(today);
        log_info!("day tracker: moving to column {} for {}", column, header);
        store
            .write_cell(column, HEADER_ROW, header.clone(), WriteMode::Interpreted)
            .await?;
        self.col_now = column;

        Ok(DayCheck::Advanced { column, header })
    }
}

/// 1-based position of the last non-empty cell, 0 when there is none.
fn last_populated(row: Option<&[String]>) -> u32 {
    row.and_then(|cells| cells.iter().rposition(|cell| !cell.is_empty()))
        .map_or(0, |idx| idx as u32 + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::sheet::{MemorySheet, Table};
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    fn store_with(cells: &[(&str, &str)]) -> StoreHandle<MemorySheet> {
        StoreHandle::new(
            MemorySheet::with_cells(cells.iter().copied()),
            Duration::from_secs(1),
        )
    }

    fn noon_utc(month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, month, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn header_parsing() {
        assert_eq!(parse_header("6/1").unwrap(), (6, 1));
        assert_eq!(parse_header("06/01").unwrap(), (6, 1));
        assert_eq!(parse_header("2/29").unwrap(), (2, 29));
        for bad in ["", "6-1", "13/1", "2/30", "6/1/2026", "June 1", "+6/+1", "6/ 1", "/1"] {
            assert!(parse_header(bad).is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn header_formatting_has_no_padding() {
        let date = NaiveDate::from_ymd_opt(2026, 6, 2).unwrap();
        assert_eq!(format_header(date), "6/2");
    }

    #[tokio::test]
    async fn rollover_opens_next_column_once() {
        let store = store_with(&[("C1", "6/1")]);
        let mut tracker = DayTracker::resume_at(chrono_tz::UTC, 3);

        let check = tracker.check_date(&store, noon_utc(6, 2)).await.unwrap();
        assert_eq!(
            check,
            DayCheck::Advanced {
                column: 4,
                header: "6/2".to_string()
            }
        );
        assert_eq!(tracker.column(), 4);
        assert_eq!(store.store().cell("D1").as_deref(), Some("6/2"));
        assert_eq!(store.store().cell_mode("D1"), Some(WriteMode::Interpreted));

        let before = store.store().stats();
        let again = tracker
            .check_date(&store, noon_utc(6, 2) + chrono::Duration::hours(3))
            .await
            .unwrap();
        assert_eq!(again, DayCheck::Cached);
        assert_eq!(store.store().stats(), before);
        assert_eq!(tracker.column(), 4);
    }

    #[tokio::test]
    async fn matching_header_keeps_column() {
        let store = store_with(&[("C1", "6/2")]);
        let mut tracker = DayTracker::resume_at(chrono_tz::UTC, 3);

        let check = tracker.check_date(&store, noon_utc(6, 2)).await.unwrap();
        assert_eq!(check, DayCheck::Current);
        assert_eq!(tracker.column(), 3);
        assert_eq!(store.store().stats().writes, 0);
    }

    #[tokio::test]
    async fn malformed_header_leaves_column_and_retries() {
        let store = store_with(&[("C1", "Tuesday")]);
        let mut tracker = DayTracker::resume_at(chrono_tz::UTC, 3);

        let err = tracker.check_date(&store, noon_utc(6, 2)).await.unwrap_err();
        assert!(matches!(err, SheetError::Format { .. }));
        assert_eq!(tracker.column(), 3);
        assert_eq!(tracker.state(), TrackerState::Stale);
        assert_eq!(tracker.last_checked(), NaiveDate::from_ymd_opt(2026, 6, 2));

        store.store().set_cell(3, 1, "6/1", WriteMode::Raw).unwrap();
        let check = tracker.check_date(&store, noon_utc(6, 2)).await.unwrap();
        assert_eq!(
            check,
            DayCheck::Advanced {
                column: 4,
                header: "6/2".to_string()
            }
        );
        assert_eq!(tracker.state(), TrackerState::Synced);
    }

    /// Rejects header-row writes while `reject` is set.
    struct HeaderOutage {
        inner: MemorySheet,
        reject: AtomicBool,
    }

    impl SheetStore for HeaderOutage {
        fn get_range(&self, range: &CellRange) -> std::result::Result<Table, StoreError> {
            self.inner.get_range(range)
        }

        fn set_cell(
            &self,
            col: u32,
            row: u32,
            value: &str,
            mode: WriteMode,
        ) -> std::result::Result<(), StoreError> {
            if row == HEADER_ROW && self.reject.load(Ordering::SeqCst) {
                return Err(StoreError::Request("quota exceeded".into()));
            }
            self.inner.set_cell(col, row, value, mode)
        }
    }

    #[tokio::test]
    async fn failed_header_write_keeps_column_and_retries() {
        let store = StoreHandle::new(
            HeaderOutage {
                inner: MemorySheet::with_cells([("C1", "6/1")]),
                reject: AtomicBool::new(true),
            },
            Duration::from_secs(1),
        );
        let mut tracker = DayTracker::resume_at(chrono_tz::UTC, 3);

        let err = tracker.check_date(&store, noon_utc(6, 2)).await.unwrap_err();
        assert!(matches!(err, SheetError::Store(StoreError::Request(_))));
        assert_eq!(tracker.column(), 3);
        assert_eq!(tracker.state(), TrackerState::Stale);
        assert_eq!(store.store().inner.cell("D1"), None);

        store.store().reject.store(false, Ordering::SeqCst);
        let check = tracker.check_date(&store, noon_utc(6, 2)).await.unwrap();
        assert_eq!(
            check,
            DayCheck::Advanced {
                column: 4,
                header: "6/2".to_string()
            }
        );
        assert_eq!(tracker.column(), 4);
        assert_eq!(tracker.state(), TrackerState::Synced);
        assert_eq!(store.store().inner.cell("D1").as_deref(), Some("6/2"));
    }

    #[tokio::test]
    async fn rollover_follows_configured_zone() {
        // 2026-06-02 03:00 UTC is still June 1st in New York.
        let store = store_with(&[("B1", "6/1")]);
        let mut tracker = DayTracker::resume_at(chrono_tz::America::New_York, 2);
        let now = Utc.with_ymd_and_hms(2026, 6, 2, 3, 0, 0).unwrap();

        assert_eq!(
            tracker.check_date(&store, now).await.unwrap(),
            DayCheck::Current
        );
    }

    #[tokio::test]
    async fn init_rebuilds_from_header_row() {
        let store = store_with(&[
            ("A1", "Name"),
            ("B1", "Number"),
            ("C1", "5/31"),
            ("D1", "6/1"),
            ("B2", "42"),
            ("B3", "43"),
        ]);
        let mut tracker = DayTracker::new(chrono_tz::UTC);
        assert_eq!(tracker.state(), TrackerState::Uninitialized);

        let index = tracker.init(&store, 2).await.unwrap().expect("rescanned");
        assert_eq!(tracker.column(), 4);
        assert_eq!(tracker.state(), TrackerState::Synced);
        assert_eq!(index.lookup(43).unwrap(), 3);
    }

    #[tokio::test]
    async fn init_keeps_known_column_with_header() {
        let store = store_with(&[("C1", "6/1"), ("D1", "6/2")]);
        let mut tracker = DayTracker::resume_at(chrono_tz::UTC, 3);

        assert!(tracker.init(&store, 2).await.unwrap().is_none());
        assert_eq!(tracker.column(), 3);
        assert_eq!(store.store().stats().reads, 1);
    }

    #[tokio::test]
    async fn empty_header_row_starts_first_column() {
        let store = store_with(&[]);
        let mut tracker = DayTracker::new(chrono_tz::UTC);
        tracker.init(&store, 2).await.unwrap();
        assert_eq!(tracker.column(), 0);

        let check = tracker.check_date(&store, noon_utc(6, 2)).await.unwrap();
        assert_eq!(
            check,
            DayCheck::Advanced {
                column: 1,
                header: "6/2".to_string()
            }
        );
    }

    #[test]
    fn last_populated_ignores_trailing_blanks() {
        let row = vec!["a".to_string(), String::new(), "b".to_string(), String::new()];
        assert_eq!(last_populated(Some(&row)), 3);
        assert_eq!(last_populated(None), 0);
    }
}
