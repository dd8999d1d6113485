mod args;
mod ble;

use std::process::ExitCode;

use anyhow::{Context as _, Result, anyhow};
use args::Args;
use btleplug::api::{Central as _, Manager as _, ScanFilter};
use btleplug::platform::Manager;
use clap::Parser as _;
use home_climate::config::Config;
use home_climate::influx::{publish, to_line_protocol};
use log::{error, warn};
use tokio::time::{Duration, sleep};

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    if let Err(e) = run().await {
        eprintln!("{e:#}");
        return ExitCode::from(1);
    }

    ExitCode::from(0)
}

async fn run() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(&args.config)
        .with_context(|| format!("failed to load config file: {:?}", args.config))?;

    let manager = Manager::new()
        .await
        .context("failed to initialize Bluetooth manager")?;

    let adapters = manager
        .adapters()
        .await
        .context("failed to get Bluetooth adapters")?;

    let adapter = adapters
        .into_iter()
        .nth(args.iface)
        .ok_or_else(|| anyhow!("no Bluetooth adapter at interface index {}", args.iface))?;

    adapter
        .start_scan(ScanFilter::default())
        .await
        .context("failed to start BLE scan")?;

    // Give the adapter a moment to see the sensors before connecting.
    sleep(Duration::from_secs(2)).await;

    let timeout = Duration::from_secs(args.timeout);
    let mut readings = Vec::new();

    for sensor in &config.sensors {
        match ble::poll_sensor(&adapter, sensor, timeout).await {
            Ok(Some(reading)) => readings.push(reading),
            Ok(None) => warn!(
                "no notification from sensor {} ({}) within {}s",
                sensor.label, sensor.address, args.timeout
            ),
            Err(err) => warn!(
                "failed to poll sensor {} ({}): {err}",
                sensor.label, sensor.address
            ),
        }
    }

    let records = to_line_protocol(&readings);
    match &config.influxdb {
        Some(sink) => {
            if let Err(err) = publish(sink, &records).await {
                error!("failed to publish measurements: {err}");
            }
        }
        None => print!("{records}"),
    }

    Ok(())
}
