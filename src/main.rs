use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;

use templog_lib::{
    feed::run_feed, Settings, SqliteSheet, StoreHandle, SystemClock, WriteCoordinator,
};

#[derive(Parser)]
#[command(name = "templog")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Append sensor temperature readings to a rolling day-column grid")]
struct Cli {
    /// Settings file (JSON)
    #[arg(default_value = "conf.json", value_name = "FILE")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let settings = Settings::load(&cli.config)?;
    let config = settings.resolve()?;

    info!("templog starting up...");

    let sheet = SqliteSheet::open(&settings.grid_path, config.sheet_id.clone())?;
    let store = StoreHandle::new(sheet, config.store_timeout);
    let coordinator = WriteCoordinator::bootstrap(store, &config, Arc::new(SystemClock))
        .await
        .context("failed to prepare sheet")?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {err}");
                return;
            }
            cancel.cancel();
        });
    }

    let input = BufReader::new(tokio::io::stdin());
    let summary = run_feed(Arc::new(coordinator), input, cancel).await?;
    info!(
        "templog exiting: {} readings written, {} failed",
        summary.written, summary.failed
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_defaults_to_conf_json() {
        let cli = Cli::try_parse_from(["templog"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("conf.json"));

        let cli = Cli::try_parse_from(["templog", "/etc/templog/porch.json"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("/etc/templog/porch.json"));
    }
}
