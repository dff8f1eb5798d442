//! Schema upgrades for the SQLite grid, tracked in the `user_version` pragma.
//!
//! Version 1 creates `cells`: one row per non-empty cell, keyed by
//! `(sheet_id, col, row)`, holding the text and the [`WriteMode`](super::WriteMode)
//! it was written with. Several sheets share one database file.

use anyhow::{bail, Context, Result};
use rusqlite::Connection;

const ENABLE_LOGS: bool = true;

use crate::log_info;

/// Schema scripts in version order; entry `i` upgrades to version `i + 1`.
const GRID_MIGRATIONS: &[(&str, &str)] = &[(
    "schema_v1.sql",
    include_str!("schemas/schema_v1.sql"),
)];

fn grid_schema_version() -> i32 {
    GRID_MIGRATIONS.len() as i32
}

pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    let target = grid_schema_version();
    let mut version: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .context("failed to read user_version pragma")?;

    if version < 0 {
        bail!("grid database has a negative user_version ({version})");
    }
    if version > target {
        bail!("grid database version ({version}) is newer than supported schema ({target})");
    }
    if version == target {
        return Ok(());
    }

    let tx = conn
        .transaction()
        .context("failed to open migration transaction")?;

    for (name, script) in &GRID_MIGRATIONS[version as usize..] {
        tx.execute_batch(script)
            .with_context(|| format!("failed to execute {name}"))?;
        version += 1;
        log_info!("grid database upgraded to version {} ({})", version, name);
    }

    tx.pragma_update(None, "user_version", version)
        .context("failed to update user_version pragma")?;
    tx.commit().context("failed to commit migrations")?;

    Ok(())
}
