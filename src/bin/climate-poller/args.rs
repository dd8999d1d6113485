use std::path::PathBuf;

use clap::Parser;

/// Polls the configured BLE climate sensors once and publishes the readings.
#[derive(Debug, Parser)]
pub struct Args {
    /// Config file location
    #[arg(long, default_value = "config.ini")]
    pub config: PathBuf,

    /// Bluetooth adapter index to poll through
    #[arg(long, default_value_t = 1)]
    pub iface: usize,

    /// Seconds to wait for a notification from each sensor
    #[arg(long, default_value_t = 1)]
    pub timeout: u64,
}
