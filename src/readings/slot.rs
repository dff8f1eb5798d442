//! The two-slot `morning/afternoon` cell text. Nothing else in the crate reads or
//! builds raw reading cells.

use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SheetError};

pub const SEPARATOR: char = '/';
pub const PLACEHOLDER: &str = "--";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ReadingSlot {
    Morning,
    Afternoon,
}

impl ReadingSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadingSlot::Morning => "morning",
            ReadingSlot::Afternoon => "afternoon",
        }
    }
}

/// Decoded day cell: one value per slot, each a one-decimal number or `--`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotPair {
    pub morning: String,
    pub afternoon: String,
}

impl Default for SlotPair {
    fn default() -> Self {
        Self {
            morning: PLACEHOLDER.to_string(),
            afternoon: PLACEHOLDER.to_string(),
        }
    }
}

impl SlotPair {
    pub fn get(&self, slot: ReadingSlot) -> &str {
        match slot {
            ReadingSlot::Morning => &self.morning,
            ReadingSlot::Afternoon => &self.afternoon,
        }
    }

    /// Replace the value in `slot`; the other slot keeps its text.
    pub fn set(&mut self, slot: ReadingSlot, temperature: f32) {
        let value = format_temperature(temperature);
        match slot {
            ReadingSlot::Morning => self.morning = value,
            ReadingSlot::Afternoon => self.afternoon = value,
        }
    }
}

pub fn decode(cell: &str) -> Result<SlotPair> {
    if cell.is_empty() {
        return Ok(SlotPair::default());
    }

    let mut parts = cell.split(SEPARATOR);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(morning), Some(afternoon), None) => Ok(SlotPair {
            morning: morning.to_string(),
            afternoon: afternoon.to_string(),
        }),
        _ => Err(SheetError::format("reading cell", cell)),
    }
}

pub fn encode(pair: &SlotPair) -> String {
    format!("{}{}{}", pair.morning, SEPARATOR, pair.afternoon)
}

pub fn format_temperature(temperature: f32) -> String {
    format!("{temperature:.1}")
}

/// Morning while `local hour + 1 < noon_hour`, afternoon otherwise.
pub fn determine_slot(now: DateTime<Utc>, noon_hour: u32, zone: Tz) -> ReadingSlot {
    let local_hour = now.with_timezone(&zone).hour();
    if local_hour + 1 < noon_hour {
        ReadingSlot::Morning
    } else {
        ReadingSlot::Afternoon
    }
}
