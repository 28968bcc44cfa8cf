//! Sensor identity: the raw 8-bit id carried on the wire, and the (informal) kinds it maps to

use std::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Identifier byte of a reading.
///
/// Any value is valid on the wire, ids 1..=3 are known [`SensorKind`]s by convention only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SensorId(pub u8);

impl SensorId {
    pub fn kind(self) -> Option<SensorKind> {
        SensorKind::try_from(self.0).ok()
    }
}

impl From<u8> for SensorId {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl From<SensorKind> for SensorId {
    fn from(kind: SensorKind) -> Self {
        Self(kind.into())
    }
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum SensorKind {
    Humidity = 1,
    Temperature = 2,
    Light = 3,
}

impl SensorKind {
    pub const ALL: [SensorKind; 3] = [Self::Humidity, Self::Temperature, Self::Light];

    pub fn label(self) -> &'static str {
        match self {
            Self::Humidity => "humidity",
            Self::Temperature => "temperature",
            Self::Light => "light",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Self::Humidity => "%",
            Self::Temperature => "°C",
            Self::Light => "lx",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
