mod args;

use std::process::ExitCode;

use anyhow::{Context as _, Result, anyhow};
use args::Args;
use btleplug::api::{Central as _, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::Manager;
use clap::Parser as _;
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

    sleep(Duration::from_secs(args.duration)).await;

    let peripherals = adapter
        .peripherals()
        .await
        .context("failed to get BLE peripherals")?;

    for peripheral in peripherals {
        let address = peripheral.address();

        let maybe_properties = match peripheral.properties().await {
            Ok(p) => p,
            Err(err) => {
                eprintln!("failed to get properties for {address}: {err}");
                continue;
            }
        };

        let Some(properties) = maybe_properties else {
            println!("Device {address}, no advertisement data seen");
            println!("---------------------------");
            continue;
        };

        let address_type = properties
            .address_type
            .map(|t| format!("{t:?}"))
            .unwrap_or_else(|| "unknown".to_string());
        let rssi = properties
            .rssi
            .map(|r| format!("{r} dB"))
            .unwrap_or_else(|| "n/a".to_string());
        let name = properties
            .local_name
            .unwrap_or_else(|| "(unnamed)".to_string());

        println!("Device {address} ({address_type}), RSSI={rssi}, name={name}");

        for service in &properties.services {
            println!("  service {service}");
        }
        for (company_id, data) in &properties.manufacturer_data {
            println!("  manufacturer 0x{company_id:04x} = {}", hex(data));
        }
        for (uuid, data) in &properties.service_data {
            println!("  service data {uuid} = {}", hex(data));
        }
        println!("---------------------------");
    }

    Ok(())
}

fn hex(data: &[u8]) -> String {
    data.iter().map(|b| format!("{b:02x}")).collect()
}
