//! Durable local grid backed by SQLite. Several sheets, told apart by their sheet
//! id, can share one database file.

use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

use anyhow::{Context, Result};
use chrono::Utc;
use log::{error, info};
use rusqlite::{params, Connection};

use crate::error::StoreError;

use super::{address::CellRange, migrations::run_migrations, tabulate, SheetStore, Table, WriteMode};

pub struct SqliteSheet {
    conn: Mutex<Connection>,
    sheet_id: String,
    path: Option<PathBuf>,
}

impl SqliteSheet {
    pub fn open(path: impl Into<PathBuf>, sheet_id: impl Into<String>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create grid directory {}", parent.display())
            })?;
        }

        let conn = Connection::open(&path)
            .with_context(|| format!("failed to open grid database {}", path.display()))?;
        if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
            error!("Failed to enable WAL mode: {err}");
        }

        let sheet = Self::from_connection(conn, sheet_id.into(), Some(path))?;
        if let Some(path) = &sheet.path {
            info!(
                "Grid store for sheet '{}' opened at {}",
                sheet.sheet_id,
                path.display()
            );
        }
        Ok(sheet)
    }

    pub fn open_in_memory(sheet_id: impl Into<String>) -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory grid")?;
        Self::from_connection(conn, sheet_id.into(), None)
    }

    fn from_connection(
        mut conn: Connection,
        sheet_id: String,
        path: Option<PathBuf>,
    ) -> Result<Self> {
        run_migrations(&mut conn).context("failed to run grid migrations")?;
        Ok(Self {
            conn: Mutex::new(conn),
            sheet_id,
            path,
        })
    }

    pub fn sheet_id(&self) -> &str {
        &self.sheet_id
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock_conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn bound(value: Option<u32>) -> i64 {
    value.map_or(i64::MAX, i64::from)
}

impl SheetStore for SqliteSheet {
    fn get_range(&self, range: &CellRange) -> std::result::Result<Table, StoreError> {
        let conn = self.lock_conn();
        let mut stmt = conn.prepare_cached(
            "SELECT col, row, value
             FROM cells
             WHERE sheet_id = ?1
               AND col >= ?2 AND col <= ?3
               AND row >= ?4 AND row <= ?5",
        )?;

        let rows = stmt.query_map(
            params![
                self.sheet_id,
                i64::from(range.first_col),
                bound(range.last_col),
                i64::from(range.first_row),
                bound(range.last_row),
            ],
            |row| {
                Ok((
                    row.get::<_, u32>(0)?,
                    row.get::<_, u32>(1)?,
                    row.get::<_, String>(2)?,
                ))
            },
        )?;

        let mut cells = Vec::new();
        for cell in rows {
            cells.push(cell?);
        }

        Ok(tabulate(
            range,
            cells.iter().map(|(col, row, value)| (*col, *row, value.as_str())),
        ))
    }

    fn set_cell(
        &self,
        col: u32,
        row: u32,
        value: &str,
        mode: WriteMode,
    ) -> std::result::Result<(), StoreError> {
        let conn = self.lock_conn();
        if value.is_empty() {
            conn.execute(
                "DELETE FROM cells WHERE sheet_id = ?1 AND col = ?2 AND row = ?3",
                params![self.sheet_id, col, row],
            )?;
        } else {
            conn.execute(
                "INSERT INTO cells (sheet_id, col, row, value, mode, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT (sheet_id, col, row) DO UPDATE
                 SET value = excluded.value,
                     mode = excluded.mode,
                     updated_at = excluded.updated_at",
                params![
                    self.sheet_id,
                    col,
                    row,
                    value,
                    mode.as_str(),
                    Utc::now().to_rfc3339(),
                ],
            )?;
        }
        Ok(())
    }
}
