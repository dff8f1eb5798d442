use std::{collections::HashMap, sync::Arc};

use chrono_tz::Tz;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::{
    clock::Clock,
    error::{Result, SheetError},
    settings::SheetConfig,
    sheet::{to_address, SheetStore, StoreHandle, WriteMode},
    tracker::{DayCheck, DayTracker, SensorId, SensorRowIndex},
};

use super::slot::{self, ReadingSlot};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

/// Result of one successful [`WriteCoordinator::write_reading`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteOutcome {
    pub sensor_id: SensorId,
    pub address: String,
    pub slot: ReadingSlot,
    pub cell: String,
    pub day: Option<DayCheck>,
}

/// Applies sensor readings to the current day column.
pub struct WriteCoordinator<S> {
    store: StoreHandle<S>,
    clock: Arc<dyn Clock>,
    rows: SensorRowIndex,
    row_locks: HashMap<u32, Arc<Mutex<()>>>,
    tracker: Mutex<DayTracker>,
    zone: Tz,
    noon_hour: u32,
}

impl<S: SheetStore> WriteCoordinator<S> {
    pub fn new(
        store: StoreHandle<S>,
        clock: Arc<dyn Clock>,
        rows: SensorRowIndex,
        tracker: DayTracker,
        config: &SheetConfig,
    ) -> Self {
        let row_locks = rows
            .rows()
            .map(|row| (row, Arc::new(Mutex::new(()))))
            .collect();

        Self {
            store,
            clock,
            rows,
            row_locks,
            tracker: Mutex::new(tracker),
            zone: config.zone,
            noon_hour: config.noon_hour,
        }
    }

    /// Index the sheet, locate the latest day column and run the first day check.
    pub async fn bootstrap(
        store: StoreHandle<S>,
        config: &SheetConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        log_info!("Connecting to sheet '{}'...", config.sheet_id);

        let mut tracker = DayTracker::new(config.zone);
        let rows = match tracker.init(&store, config.id_column).await? {
            Some(rows) => rows,
            None => SensorRowIndex::scan(&store, config.id_column).await?,
        };

        match tracker.check_date(&store, clock.now()).await {
            Ok(_) | Err(SheetError::Format { .. }) => {}
            Err(err) => return Err(err),
        }

        log_info!(
            "Sheet '{}' ready: {} sensors, day column {}",
            config.sheet_id,
            rows.len(),
            tracker.column()
        );
        Ok(Self::new(store, clock, rows, tracker, config))
    }

    pub fn rows(&self) -> &SensorRowIndex {
        &self.rows
    }

    pub async fn day_column(&self) -> u32 {
        self.tracker.lock().await.column()
    }

    pub fn store(&self) -> &StoreHandle<S> {
        &self.store
    }

    /// Record `temperature` for `sensor_id` in the slot for the current time. Fails
    /// fast without touching the store when the sensor has no row; never retries.
    pub async fn write_reading(
        &self,
        sensor_id: SensorId,
        temperature: f32,
    ) -> Result<WriteOutcome> {
        let result = self.apply_reading(sensor_id, temperature).await;
        if let Err(err) = &result {
            log_error!(
                "write reading for sensor {} failed ({}): {}",
                sensor_id,
                err.kind(),
                err
            );
        }
        result
    }

    async fn apply_reading(&self, sensor_id: SensorId, temperature: f32) -> Result<WriteOutcome> {
        let row = self.rows.lookup(sensor_id)?;
        let row_lock = self
            .row_locks
            .get(&row)
            .cloned()
            .ok_or(SheetError::NotFound(sensor_id))?;
        // Held until the cell write has left the store, including after a timeout.
        let row_guard = row_lock.lock_owned().await;

        let now = self.clock.now();
        let (column, day) = {
            let mut tracker = self.tracker.lock().await;
            let day = match tracker.check_date(&self.store, now).await {
                Ok(check) => Some(check),
                Err(SheetError::Format { what, value }) => {
                    log_warn!(
                        "malformed {} '{}'; assuming column {} is today",
                        what,
                        value,
                        tracker.column()
                    );
                    None
                }
                Err(err) => return Err(err),
            };
            (tracker.column(), day)
        };
        let address = to_address(column, row)?;

        let current = self.store.read_cell(column, row).await?;
        let mut pair = slot::decode(&current)?;

        let slot = slot::determine_slot(now, self.noon_hour, self.zone);
        pair.set(slot, temperature);
        let cell = slot::encode(&pair);

        self.store
            .write_cell_holding(column, row, cell.clone(), WriteMode::Interpreted, row_guard)
            .await?;

        log_info!(
            "sensor {}: {} {} -> {}",
            sensor_id,
            slot.as_str(),
            address,
            cell
        );

        Ok(WriteOutcome {
            sensor_id,
            address,
            slot,
            cell,
            day,
        })
    }
}
