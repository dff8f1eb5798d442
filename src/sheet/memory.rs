use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex,
    },
};

use crate::error::StoreError;

use super::{address::CellRange, tabulate, SheetStore, Table, WriteMode};

/// Counts of calls a [`MemorySheet`] has served.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub reads: u64,
    pub writes: u64,
}

#[derive(Debug, Clone)]
struct StoredCell {
    value: String,
    mode: WriteMode,
}

/// In-process grid, keyed by (column, row). Used for dry runs and tests.
#[derive(Default)]
pub struct MemorySheet {
    cells: Mutex<BTreeMap<(u32, u32), StoredCell>>,
    reads: AtomicU64,
    writes: AtomicU64,
}

impl MemorySheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed cells without counting them as writes.
    pub fn with_cells<'a>(cells: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let sheet = Self::new();
        {
            let mut guard = sheet.lock_cells();
            for (address, value) in cells {
                if let Ok((col, row)) = super::parse_address(address) {
                    guard.insert(
                        (col, row),
                        StoredCell {
                            value: value.to_string(),
                            mode: WriteMode::Raw,
                        },
                    );
                }
            }
        }
        sheet
    }

    /// Current text at `address`, if any.
    pub fn cell(&self, address: &str) -> Option<String> {
        let (col, row) = super::parse_address(address).ok()?;
        self.lock_cells().get(&(col, row)).map(|c| c.value.clone())
    }

    /// Mode the cell at `address` was last written with.
    pub fn cell_mode(&self, address: &str) -> Option<WriteMode> {
        let (col, row) = super::parse_address(address).ok()?;
        self.lock_cells().get(&(col, row)).map(|c| c.mode)
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            reads: self.reads.load(Ordering::SeqCst),
            writes: self.writes.load(Ordering::SeqCst),
        }
    }

    fn lock_cells(&self) -> std::sync::MutexGuard<'_, BTreeMap<(u32, u32), StoredCell>> {
        match self.cells.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl SheetStore for MemorySheet {
    fn get_range(&self, range: &CellRange) -> Result<Table, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let guard = self.lock_cells();
        Ok(tabulate(
            range,
            guard
                .iter()
                .map(|(&(col, row), cell)| (col, row, cell.value.as_str())),
        ))
    }

    fn set_cell(&self, col: u32, row: u32, value: &str, mode: WriteMode) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut guard = self.lock_cells();
        if value.is_empty() {
            guard.remove(&(col, row));
        } else {
            guard.insert(
                (col, row),
                StoredCell {
                    value: value.to_string(),
                    mode,
                },
            );
        }
        Ok(())
    }
}
