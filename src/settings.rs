use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf, time::Duration};

use crate::error::SheetError;

/// Settings file contents. Key names match the `conf.json` the logger has always
/// been deployed with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Settings {
    pub time_zone: String,
    pub noon: i64,
    #[serde(alias = "SheetsID", alias = "SheetsId")]
    pub sheet_id: String,
    #[serde(default = "default_id_column")]
    pub id_column: u32,
    #[serde(default = "default_store_timeout_secs")]
    pub store_timeout_secs: u64,
    #[serde(default = "default_grid_path")]
    pub grid_path: PathBuf,
}

fn default_id_column() -> u32 {
    2
}

fn default_store_timeout_secs() -> u64 {
    10
}

fn default_grid_path() -> PathBuf {
    PathBuf::from("templog.sqlite3")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            time_zone: "UTC".into(),
            noon: 12,
            sheet_id: "default".into(),
            id_column: default_id_column(),
            store_timeout_secs: default_store_timeout_secs(),
            grid_path: default_grid_path(),
        }
    }
}

/// Validated settings the core runs with.
#[derive(Debug, Clone)]
pub struct SheetConfig {
    pub zone: Tz,
    pub noon_hour: u32,
    pub sheet_id: String,
    pub id_column: u32,
    pub store_timeout: Duration,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings in {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write settings to {}", path.display()))
    }

    pub fn resolve(&self) -> std::result::Result<SheetConfig, SheetError> {
        let zone: Tz = self
            .time_zone
            .parse()
            .map_err(|_| SheetError::Config(format!("unknown time zone '{}'", self.time_zone)))?;

        let noon_hour = u32::try_from(self.noon)
            .ok()
            .filter(|hour| *hour <= 23)
            .ok_or_else(|| {
                SheetError::Config(format!("noon must be an hour 0-23, got {}", self.noon))
            })?;

        if self.id_column == 0 {
            return Err(SheetError::Config("identifier column must be 1 or greater".into()));
        }
        if self.store_timeout_secs == 0 {
            return Err(SheetError::Config("store timeout must be at least one second".into()));
        }

        Ok(SheetConfig {
            zone,
            noon_hour,
            sheet_id: self.sheet_id.clone(),
            id_column: self.id_column,
            store_timeout: Duration::from_secs(self.store_timeout_secs),
        })
    }
}
