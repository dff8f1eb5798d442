use std::collections::HashMap;

use crate::error::{Result, SheetError};
use crate::sheet::{CellRange, SheetStore, StoreHandle};

use super::SensorId;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// A raw identifier cell that did not parse as a sensor id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    pub row: u32,
    pub raw: String,
}

/// Sensor id to 1-based sheet row. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct SensorRowIndex {
    rows: HashMap<SensorId, u32>,
    skipped: Vec<SkippedRow>,
}

impl SensorRowIndex {
    /// Later rows win when the same id appears more than once.
    pub fn build<I, R>(rows: I) -> Self
    where
        I: IntoIterator<Item = (R, u32)>,
        R: AsRef<str>,
    {
        let mut index = Self::default();
        for (raw, row) in rows {
            let raw = raw.as_ref();
            if raw.is_empty() {
                continue;
            }
            match raw.parse::<SensorId>() {
                Ok(id) => {
                    log_debug!("row map: sensor {} -> row {}", id, row);
                    if let Some(previous) = index.rows.insert(id, row) {
                        log_warn!(
                            "sensor {} listed on rows {} and {}; using row {}",
                            id,
                            previous,
                            row,
                            row
                        );
                    }
                }
                Err(err) => {
                    log_warn!("row map: skipping row {} with id '{}': {}", row, raw, err);
                    index.skipped.push(SkippedRow {
                        row,
                        raw: raw.to_string(),
                    });
                }
            }
        }
        index
    }

    /// Read the identifier column from the store and index it.
    pub async fn scan<S: SheetStore>(store: &StoreHandle<S>, id_column: u32) -> Result<Self> {
        let table = store
            .read_range(CellRange::columns(id_column, id_column))
            .await?;

        Ok(Self::build(table.into_iter().enumerate().filter_map(
            |(offset, line)| {
                let raw = line.into_iter().next()?;
                Some((raw, offset as u32 + 1))
            },
        )))
    }

    pub fn lookup(&self, id: SensorId) -> Result<u32> {
        self.rows
            .get(&id)
            .copied()
            .ok_or(SheetError::NotFound(id))
    }

    pub fn rows(&self) -> impl Iterator<Item = u32> + '_ {
        self.rows.values().copied()
    }

    pub fn skipped(&self) -> &[SkippedRow] {
        &self.skipped
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
