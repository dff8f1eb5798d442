//! Line-oriented reading intake: one `<sensor-id> <temperature>` pair per line.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt},
    task::JoinSet,
};
use tokio_util::sync::CancellationToken;

use crate::{
    error::SheetError,
    readings::WriteCoordinator,
    sheet::SheetStore,
    tracker::SensorId,
};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Totals for one feed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedSummary {
    pub written: u64,
    pub failed: u64,
    pub rejected_lines: u64,
}

/// `Ok(None)` for blank and `#` comment lines.
pub fn parse_reading_line(line: &str) -> std::result::Result<Option<(SensorId, f32)>, SheetError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let bad = || SheetError::format("reading line", line);
    let mut fields = line.split_whitespace();
    let (Some(id), Some(temp), None) = (fields.next(), fields.next(), fields.next()) else {
        return Err(bad());
    };

    let id: SensorId = id.parse().map_err(|_| bad())?;
    let temp: f32 = temp.parse().map_err(|_| bad())?;
    if !temp.is_finite() {
        return Err(bad());
    }
    Ok(Some((id, temp)))
}

/// Apply every reading from `input` until it ends or `cancel` fires. Each reading is
/// written on its own task; outstanding writes are awaited before returning.
pub async fn run_feed<S, R>(
    coordinator: Arc<WriteCoordinator<S>>,
    input: R,
    cancel: CancellationToken,
) -> Result<FeedSummary>
where
    S: SheetStore,
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut writes = JoinSet::new();
    let mut summary = FeedSummary::default();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read reading feed")? else {
                    break;
                };
                match parse_reading_line(&line) {
                    Ok(Some((sensor_id, temperature))) => {
                        let coordinator = Arc::clone(&coordinator);
                        writes.spawn(async move {
                            coordinator.write_reading(sensor_id, temperature).await
                        });
                    }
                    Ok(None) => {}
                    Err(err) => {
                        log_warn!("feed: {err}");
                        summary.rejected_lines += 1;
                    }
                }
            }
            Some(joined) = writes.join_next(), if !writes.is_empty() => {
                tally(&mut summary, joined);
            }
            _ = cancel.cancelled() => {
                log_info!("feed: shutdown requested");
                break;
            }
        }
    }

    while let Some(joined) = writes.join_next().await {
        tally(&mut summary, joined);
    }

    log_info!(
        "feed finished: {} written, {} failed, {} rejected lines",
        summary.written,
        summary.failed,
        summary.rejected_lines
    );
    Ok(summary)
}

fn tally(
    summary: &mut FeedSummary,
    joined: std::result::Result<
        crate::error::Result<crate::readings::WriteOutcome>,
        tokio::task::JoinError,
    >,
) {
    match joined {
        Ok(Ok(outcome)) => {
            summary.written += 1;
            if let Ok(json) = serde_json::to_string(&outcome) {
                println!("{json}");
            }
        }
        // write_reading already logged the failure
        Ok(Err(_)) => summary.failed += 1,
        Err(join_err) => {
            log_warn!("feed: write task failed: {join_err}");
            summary.failed += 1;
        }
    }
}
