use std::ops::Range;
use std::str;

use thiserror::Error;
use uuid::{Uuid, uuid};

/// The MJ_HT_V1 temperature/humidity data characteristic. Readings arrive as
/// notifications on it, with an ASCII payload shaped like `T=23.5 H=45.2`.
pub const DATA_CHARACTERISTIC: Uuid = uuid!("226caa55-6476-4566-7562-66734470666d");

const TEMPERATURE_RANGE: Range<usize> = 2..6;
const HUMIDITY_RANGE: Range<usize> = 9..13;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload too short: expected at least {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },

    #[error("payload field is not UTF-8: {0:02x?}")]
    NotUtf8(Vec<u8>),
}

#[derive(Debug, PartialEq, Eq)]
pub struct DecodedReading {
    pub temperature: String,
    pub humidity: String,
}

pub fn decode_notification(payload: &[u8]) -> Result<DecodedReading, DecodeError> {
    Ok(DecodedReading {
        temperature: field(payload, TEMPERATURE_RANGE)?,
        humidity: field(payload, HUMIDITY_RANGE)?,
    })
}

fn field(payload: &[u8], range: Range<usize>) -> Result<String, DecodeError> {
    let expected = range.end;
    let bytes = payload.get(range).ok_or(DecodeError::TooShort {
        expected,
        actual: payload.len(),
    })?;

    let text = str::from_utf8(bytes).map_err(|_| DecodeError::NotUtf8(bytes.to_vec()))?;

    Ok(text.to_string())
}
