//! Receiving side, for checking emitters without the greenhouse controller at hand.
//!
//! Keeps the latest value of each known sensor kind, drops datagrams that don't look like
//! readings, and reports values over their threshold as well as sensors that went quiet.

use std::{
    collections::HashMap,
    fmt::Write as _,
    io,
    net::SocketAddr,
    ops::RangeInclusive,
    time::{Duration, Instant},
};

use serde::Deserialize;
use tokio::{net::UdpSocket, select, time::interval};

use crate::{
    core::shutdown::ShutdownHandle,
    reading::{DecodeError, Reading},
    sensor::{SensorId, SensorKind},
};

#[cfg(test)]
mod test;

/// largest datagram that is read whole, anything longer is reported with this length
const RECV_BUF_LEN: usize = 512;

/// values strictly above these raise an alert
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub humidity: f32,
    pub temperature: f32,
    pub light: f32,
}

impl Thresholds {
    pub fn of(&self, kind: SensorKind) -> f32 {
        match kind {
            SensorKind::Humidity => self.humidity,
            SensorKind::Temperature => self.temperature,
            SensorKind::Light => self.light,
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            humidity: 80.0,
            temperature: 24.0,
            light: 500.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// how long a sensor may stay silent before it is reported
    pub timeout: Duration,
    /// changes smaller than this are not counted as updates
    pub min_delta: f32,
    /// values outside of this are dropped
    pub valid: RangeInclusive<f32>,
    pub thresholds: Thresholds,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            min_delta: 0.1,
            valid: 0.0..=1000.0,
            thresholds: Thresholds::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Alert {
    pub kind: SensorKind,
    pub value: f32,
    pub threshold: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Ignored {
    BadLength(usize),
    OutOfRange(Reading),
    UnknownSensor(SensorId),
}

/// What happened to one received datagram
#[derive(Debug, Clone, PartialEq)]
pub enum Ingest {
    /// stored as the sensor's new value. `alerts` lists every kind currently over its threshold
    Updated {
        reading: Reading,
        alerts: Vec<Alert>,
    },
    /// within `min_delta` of the stored value
    Unchanged(Reading),
    Ignored(Ignored),
}

#[derive(Debug, Clone, Copy)]
struct SensorState {
    value: f32,
    last_update: Instant,
    timeout_reported: bool,
}

/// The bookkeeping half of the monitor, independent of any socket
#[derive(Debug, Clone)]
pub struct MonitorState {
    settings: Settings,
    sensors: HashMap<SensorKind, SensorState>,
}

impl MonitorState {
    /// all known kinds start at 0, as if last heard from at `now`
    pub fn new(settings: Settings, now: Instant) -> Self {
        let sensors = SensorKind::ALL
            .into_iter()
            .map(|kind| {
                (
                    kind,
                    SensorState {
                        value: 0.0,
                        last_update: now,
                        timeout_reported: false,
                    },
                )
            })
            .collect();
        Self { settings, sensors }
    }

    pub fn value(&self, kind: SensorKind) -> f32 {
        self.sensors.get(&kind).map_or(0.0, |s| s.value)
    }

    pub fn ingest(&mut self, datagram: &[u8], now: Instant) -> Ingest {
        let reading = match Reading::decode(datagram) {
            Ok(reading) => reading,
            Err(DecodeError::BadLength(len)) => return Ingest::Ignored(Ignored::BadLength(len)),
        };
        if !self.settings.valid.contains(&reading.value) {
            return Ingest::Ignored(Ignored::OutOfRange(reading));
        }
        let Some(kind) = reading.sensor.kind() else {
            return Ingest::Ignored(Ignored::UnknownSensor(reading.sensor));
        };
        let min_delta = self.settings.min_delta;
        let Some(state) = self.sensors.get_mut(&kind) else {
            return Ingest::Ignored(Ignored::UnknownSensor(reading.sensor));
        };
        if (reading.value - state.value).abs() < min_delta {
            return Ingest::Unchanged(reading);
        }
        *state = SensorState {
            value: reading.value,
            last_update: now,
            timeout_reported: false,
        };
        Ingest::Updated {
            reading,
            alerts: self.alerts(),
        }
    }

    /// kinds whose current value is above their threshold
    pub fn alerts(&self) -> Vec<Alert> {
        SensorKind::ALL
            .into_iter()
            .filter_map(|kind| {
                let value = self.value(kind);
                let threshold = self.settings.thresholds.of(kind);
                (value > threshold).then_some(Alert {
                    kind,
                    value,
                    threshold,
                })
            })
            .collect()
    }

    /// kinds that just went past the timeout. each silence is reported once
    pub fn check_timeouts(&mut self, now: Instant) -> Vec<SensorKind> {
        let timeout = self.settings.timeout;
        let mut expired = Vec::new();
        for kind in SensorKind::ALL {
            let Some(state) = self.sensors.get_mut(&kind) else {
                continue;
            };
            if !state.timeout_reported && now.saturating_duration_since(state.last_update) > timeout
            {
                state.timeout_reported = true;
                expired.push(kind);
            }
        }
        expired
    }

    pub fn summary(&self) -> String {
        let mut buf = String::new();
        for (i, kind) in SensorKind::ALL.into_iter().enumerate() {
            if i != 0 {
                buf.push_str(" | ");
            }
            let _ = write!(buf, "{kind}: {:.2} {}", self.value(kind), kind.unit());
        }
        buf
    }
}

pub struct Monitor {
    sock: UdpSocket,
    state: MonitorState,
}

impl Monitor {
    pub async fn bind(settings: Settings, addr: SocketAddr) -> io::Result<Self> {
        let sock = UdpSocket::bind(addr).await?;
        Ok(Self {
            sock,
            state: MonitorState::new(settings, Instant::now()),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.sock.local_addr()
    }

    pub async fn run(mut self, mut shutdown: ShutdownHandle) -> io::Result<MonitorState> {
        let mut buf = [0u8; RECV_BUF_LEN];
        let mut ticker = interval(Duration::from_secs(1));
        loop {
            select! {
                _ = shutdown.wait_for_shutdown() => break,
                _ = ticker.tick() => {
                    for kind in self.state.check_timeouts(Instant::now()) {
                        warn!(
                            "The {kind} sensor stopped responding (nothing new for {:?})",
                            self.state.settings.timeout
                        );
                    }
                }
                recv = self.sock.recv_from(&mut buf) => {
                    let (len, from) = recv?;
                    let outcome = self.state.ingest(&buf[..len], Instant::now());
                    self.report(outcome, from);
                }
            }
        }
        Ok(self.state)
    }

    fn report(&self, outcome: Ingest, from: SocketAddr) {
        match outcome {
            Ingest::Updated { reading, alerts } => {
                info!("Sensor {} updated: {:.2}", reading.sensor, reading.value);
                info!("{}", self.state.summary());
                for Alert {
                    kind,
                    value,
                    threshold,
                } in alerts
                {
                    warn!(
                        "High {kind}: {value:.2} {} (threshold {threshold})",
                        kind.unit()
                    );
                }
            }
            Ingest::Unchanged(reading) => trace!(%from, "no change: {reading}"),
            Ingest::Ignored(Ignored::BadLength(len)) => {
                warn!(%from, "Datagram of unexpected size ({len} bytes), ignored")
            }
            Ingest::Ignored(Ignored::OutOfRange(reading)) => {
                warn!(%from, "Value out of range, ignored: {reading}")
            }
            Ingest::Ignored(Ignored::UnknownSensor(id)) => {
                warn!(%from, "Unknown sensor id {id}, ignored")
            }
        }
    }
}
