pub mod address;
pub mod memory;
mod migrations;
pub mod sqlite;

use std::{sync::Arc, time::Duration};

use crate::error::{Result, SheetError, StoreError};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

pub use address::{column_letters, parse_address, to_address, CellRange};
pub use memory::{MemorySheet, StoreStats};
pub use sqlite::SqliteSheet;

/// Rows of cell text, top to bottom, as returned for a range. Trailing empty cells
/// and rows are trimmed; an absent range is an empty table.
pub type Table = Vec<Vec<String>>;

/// How the store should treat a written value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Stored verbatim.
    Raw,
    /// Parsed the way a user typing into the sheet would be.
    Interpreted,
}

impl WriteMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteMode::Raw => "RAW",
            WriteMode::Interpreted => "USER_ENTERED",
        }
    }
}

/// Grid storage the logger reads from and writes to. Calls are blocking; the
/// [`StoreHandle`] moves them off the async runtime.
pub trait SheetStore: Send + Sync + 'static {
    fn get_range(&self, range: &CellRange) -> std::result::Result<Table, StoreError>;

    fn set_cell(
        &self,
        col: u32,
        row: u32,
        value: &str,
        mode: WriteMode,
    ) -> std::result::Result<(), StoreError>;
}

/// Lay out `cells` (col, row, text) that fall inside `range` as a [`Table`] anchored
/// at the range's first row and column.
pub(crate) fn tabulate<'a>(
    range: &CellRange,
    cells: impl IntoIterator<Item = (u32, u32, &'a str)>,
) -> Table {
    let mut table: Table = Vec::new();
    for (col, row, value) in cells {
        if value.is_empty() || !range.contains(col, row) {
            continue;
        }
        let r = (row - range.first_row) as usize;
        let c = (col - range.first_col) as usize;
        if table.len() <= r {
            table.resize_with(r + 1, Vec::new);
        }
        let line = &mut table[r];
        if line.len() <= c {
            line.resize(c + 1, String::new());
        }
        line[c] = value.to_string();
    }
    table
}

/// Shared async handle over a blocking [`SheetStore`]; every call runs on the
/// blocking pool and is bounded by `timeout`.
pub struct StoreHandle<S> {
    store: Arc<S>,
    timeout: Duration,
}

impl<S> Clone for StoreHandle<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            timeout: self.timeout,
        }
    }
}

impl<S: SheetStore> StoreHandle<S> {
    pub fn new(store: S, timeout: Duration) -> Self {
        Self::from_arc(Arc::new(store), timeout)
    }

    pub fn from_arc(store: Arc<S>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn execute<F, T>(&self, task: F) -> std::result::Result<T, StoreError>
    where
        F: FnOnce(&S) -> std::result::Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        self.execute_holding((), task).await
    }

    /// Like [`execute`](Self::execute), but `guard` is dropped only once `task` has
    /// returned on the blocking pool. A timed-out call keeps running, so a caller that
    /// serializes on a lock must hand its guard over rather than drop it on timeout.
    pub async fn execute_holding<G, F, T>(
        &self,
        guard: G,
        task: F,
    ) -> std::result::Result<T, StoreError>
    where
        G: Send + 'static,
        F: FnOnce(&S) -> std::result::Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let worker = tokio::task::spawn_blocking(move || {
            let result = task(&store);
            drop(guard);
            result
        });

        match tokio::time::timeout(self.timeout, worker).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(StoreError::Worker(join_err.to_string())),
            Err(_) => {
                log_warn!(
                    "store call exceeded {:?}; it keeps running on the blocking pool",
                    self.timeout
                );
                Err(StoreError::Timeout(self.timeout))
            }
        }
    }

    pub async fn read_range(&self, range: CellRange) -> Result<Table> {
        self.execute(move |store| store.get_range(&range))
            .await
            .map_err(SheetError::from)
    }

    /// Text of a single cell; empty when the cell holds nothing.
    pub async fn read_cell(&self, col: u32, row: u32) -> Result<String> {
        to_address(col, row)?;
        let table = self.read_range(CellRange::cell(col, row)).await?;
        Ok(table
            .into_iter()
            .next()
            .and_then(|line| line.into_iter().next())
            .unwrap_or_default())
    }

    pub async fn write_cell(
        &self,
        col: u32,
        row: u32,
        value: String,
        mode: WriteMode,
    ) -> Result<()> {
        self.write_cell_holding(col, row, value, mode, ()).await
    }

    /// Write one cell, releasing `guard` only after the store call has finished,
    /// even when the call timed out.
    pub async fn write_cell_holding<G: Send + 'static>(
        &self,
        col: u32,
        row: u32,
        value: String,
        mode: WriteMode,
        guard: G,
    ) -> Result<()> {
        let address = to_address(col, row)?;
        log_debug!("store: write {} ({})", address, mode.as_str());
        self.execute_holding(guard, move |store| store.set_cell(col, row, &value, mode))
            .await
            .map_err(SheetError::from)
    }
}
