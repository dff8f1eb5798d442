//! Error types for sheet logging operations.

use std::time::Duration;

use thiserror::Error;

use crate::tracker::SensorId;

/// Failures raised by a [`SheetStore`](crate::sheet::SheetStore) backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store did not answer within the configured bound
    #[error("store call timed out after {0:?}")]
    Timeout(Duration),

    /// The backend rejected or failed the request
    #[error("store request failed: {0}")]
    Request(String),

    /// SQLite backend error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The blocking worker running the call panicked or was cancelled
    #[error("store worker failed: {0}")]
    Worker(String),
}

/// Errors surfaced by the core sheet logging operations.
#[derive(Error, Debug)]
pub enum SheetError {
    /// Sensor id has no row in the identifier column
    #[error("sensor {0} has no row in the sheet")]
    NotFound(SensorId),

    /// Malformed cell, header or address text
    #[error("malformed {what}: '{value}'")]
    Format { what: &'static str, value: String },

    /// Read or write against the store failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Invalid time zone, noon hour or other setting
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Column or row outside the 1-based grid
    #[error("invalid cell position: column {col}, row {row}")]
    InvalidArgument { col: u32, row: u32 },
}

impl SheetError {
    pub(crate) fn format(what: &'static str, value: impl Into<String>) -> Self {
        SheetError::Format {
            what,
            value: value.into(),
        }
    }

    /// Short label for the error kind, used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            SheetError::NotFound(_) => "not-found",
            SheetError::Format { .. } => "format",
            SheetError::Store(_) => "store",
            SheetError::Config(_) => "config",
            SheetError::InvalidArgument { .. } => "invalid-argument",
        }
    }
}

/// Result type alias for sheet operations.
pub type Result<T> = std::result::Result<T, SheetError>;
