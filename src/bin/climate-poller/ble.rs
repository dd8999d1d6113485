pub mod mijia;

use std::time::Duration;

use btleplug::api::{Central as _, Peripheral as _};
use btleplug::platform::{Adapter, Peripheral};
use chrono::Utc;
use home_climate::config::SensorConfig;
use home_climate::reading::SensorReading;
use log::warn;
use macaddr::MacAddr6;
use thiserror::Error;
use tokio::time::{Instant, timeout_at};
use tokio_stream::StreamExt as _;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("sensor {0} not found in scan results")]
    DeviceNotFound(MacAddr6),

    #[error("characteristic {0} not found on sensor")]
    CharacteristicNotFound(Uuid),

    #[error("connection lost while waiting for a notification")]
    LinkLost,

    #[error(transparent)]
    Ble(#[from] btleplug::Error),
}

/// Polls one sensor for a single reading. `Ok(None)` means the timeout
/// elapsed without a decodable notification. The connection is released on
/// every path before this returns.
pub async fn poll_sensor(
    adapter: &Adapter,
    sensor: &SensorConfig,
    timeout: Duration,
) -> Result<Option<SensorReading>, ConnectionError> {
    let peripheral = find_peripheral(adapter, sensor.address)
        .await?
        .ok_or(ConnectionError::DeviceNotFound(sensor.address))?;

    peripheral.connect().await?;

    let outcome = listen_for_reading(&peripheral, &sensor.label, timeout).await;

    if let Err(err) = peripheral.disconnect().await {
        warn!("failed to disconnect from {}: {err}", sensor.address);
    }

    outcome
}

async fn find_peripheral(
    adapter: &Adapter,
    address: MacAddr6,
) -> Result<Option<Peripheral>, ConnectionError> {
    for peripheral in adapter.peripherals().await? {
        let peripheral_address: MacAddr6 = peripheral.address().into_inner().into();
        if peripheral_address == address {
            return Ok(Some(peripheral));
        }
    }

    Ok(None)
}

/// Enables push mode on the data characteristic, then waits for the first
/// notification that decodes. Subscribing writes the `01 00` enable value to
/// the characteristic's client configuration descriptor. Malformed payloads
/// are logged and skipped; the wait keeps running until the deadline.
async fn listen_for_reading(
    peripheral: &Peripheral,
    label: &str,
    timeout: Duration,
) -> Result<Option<SensorReading>, ConnectionError> {
    peripheral.discover_services().await?;

    let characteristic = peripheral
        .characteristics()
        .into_iter()
        .find(|c| c.uuid == mijia::DATA_CHARACTERISTIC)
        .ok_or(ConnectionError::CharacteristicNotFound(
            mijia::DATA_CHARACTERISTIC,
        ))?;

    let mut notifications = peripheral.notifications().await?;
    peripheral.subscribe(&characteristic).await?;

    let deadline = Instant::now() + timeout;
    loop {
        let notification = match timeout_at(deadline, notifications.next()).await {
            Err(_) => return Ok(None),
            Ok(None) => return Err(ConnectionError::LinkLost),
            Ok(Some(notification)) => notification,
        };

        if notification.uuid != mijia::DATA_CHARACTERISTIC {
            continue;
        }

        match mijia::decode_notification(&notification.value) {
            Ok(decoded) => {
                return Ok(Some(SensorReading {
                    label: label.to_string(),
                    measured_at: Utc::now(),
                    temperature: decoded.temperature,
                    humidity: decoded.humidity,
                }));
            }
            Err(err) => {
                warn!("discarding malformed notification from {label}: {err}");
            }
        }
    }
}
