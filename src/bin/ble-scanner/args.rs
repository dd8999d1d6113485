use clap::Parser;

/// Scans for nearby BLE devices and prints what they advertise.
#[derive(Debug, Parser)]
pub struct Args {
    /// Bluetooth adapter index to scan on
    #[arg(long, default_value_t = 0)]
    pub iface: usize,

    /// Seconds to scan before printing results
    #[arg(long, default_value_t = 10)]
    pub duration: u64,
}
