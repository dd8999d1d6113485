use chrono::{DateTime, Utc};

/// One reading captured from a sensor notification. The temperature and
/// humidity fields hold the raw decoded text from the payload; nothing here
/// parses them into numbers.
#[derive(Debug, Clone)]
pub struct SensorReading {
    pub label: String,

    pub measured_at: DateTime<Utc>,

    pub temperature: String,

    pub humidity: String,
}

impl SensorReading {
    /// Renders the capture instant for the sink's nanosecond timestamp
    /// column: microseconds since the epoch padded with three zero digits.
    /// The sink has always received this shape, so the padding stays.
    pub fn to_nano(&self) -> String {
        format!("{}000", self.measured_at.timestamp_micros())
    }
}
