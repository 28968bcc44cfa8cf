//! The reading record and its wire layout
//!
//! ```text
//! offset  size  type        meaning
//! 0       1     u8          sensor id
//! 1       4     f32 (LE)    value
//! ```
//!
//! No padding, no header, no checksum. The float is always little-endian regardless of host.

use std::{fmt, mem::size_of};

use static_assertions::const_assert_eq;
use zerocopy::{
    byteorder::{LittleEndian, F32},
    AsBytes, FromBytes, FromZeroes, Unaligned,
};

use crate::sensor::SensorId;

/// size of an encoded reading, in bytes
pub const READING_LEN: usize = 5;

#[derive(Debug, Clone, Copy, FromZeroes, FromBytes, AsBytes, Unaligned)]
#[repr(C)]
struct RawReading {
    sensor_id: u8,
    value: F32<LittleEndian>,
}

const_assert_eq!(size_of::<RawReading>(), READING_LEN);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("a reading is exactly 5 bytes, got {0}")]
    BadLength(usize),
}

/// One sensor reading, built fresh for every transmission
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub sensor: SensorId,
    pub value: f32,
}

impl Reading {
    pub fn new(sensor: impl Into<SensorId>, value: f32) -> Self {
        Self {
            sensor: sensor.into(),
            value,
        }
    }

    pub fn encode(&self) -> [u8; READING_LEN] {
        let raw = RawReading {
            sensor_id: self.sensor.0,
            value: F32::new(self.value),
        };
        let mut buf = [0u8; READING_LEN];
        buf.copy_from_slice(raw.as_bytes());
        buf
    }

    /// decodes a complete datagram. trailing or missing bytes are an error
    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let raw = RawReading::read_from(buf).ok_or(DecodeError::BadLength(buf.len()))?;
        Ok(Self {
            sensor: SensorId(raw.sensor_id),
            value: raw.value.get(),
        })
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sensor.kind() {
            Some(kind) => write!(
                f,
                "ID: {} | {}: {} {}",
                self.sensor,
                kind.label(),
                self.value,
                kind.unit()
            ),
            None => write!(f, "ID: {} | value: {}", self.sensor, self.value),
        }
    }
}
