//! Layered configuration: built-in defaults < `--preset` < config file < command line

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::Path,
    time::Duration,
};

use anyhow::{Context, Result};
use config::{builder::DefaultState, ConfigBuilder, File, FileFormat};
use serde::Deserialize;

use super::args::{EmitterArgs, MonitorArgs};
use crate::{
    emitter::{self, SendErrorPolicy},
    monitor::{self, Thresholds},
    sensor::{SensorId, SensorKind},
    source::ValueSource,
};

pub const DEFAULT_HOST: &str = "192.168.1.11";
pub const DEFAULT_PORT: u16 = 4210;
pub const DEFAULT_INTERVAL_MS: u64 = 2000;

#[cfg(test)]
mod test;

/// The stock sensors of the greenhouse test setup
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Preset {
    /// id 1, constant 70 %
    Humidity,
    /// id 2, random 20..=28 °C
    Temperature,
    /// id 3, random 10..=600 lx
    Light,
}

impl Preset {
    pub fn kind(self) -> SensorKind {
        match self {
            Self::Humidity => SensorKind::Humidity,
            Self::Temperature => SensorKind::Temperature,
            Self::Light => SensorKind::Light,
        }
    }

    fn apply(self, builder: ConfigBuilder<DefaultState>) -> Result<ConfigBuilder<DefaultState>> {
        let builder = builder.set_default("sensor.id", i64::from(u8::from(self.kind())))?;
        let builder = match self {
            Self::Humidity => builder
                .set_default("value.mode", "constant")?
                .set_default("value.value", 70.0f64)?,
            Self::Temperature => builder
                .set_default("value.mode", "random")?
                .set_default("value.low", 20i64)?
                .set_default("value.high", 28i64)?,
            Self::Light => builder
                .set_default("value.mode", "random")?
                .set_default("value.low", 10i64)?
                .set_default("value.high", 600i64)?,
        };
        Ok(builder)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct EmitterConfig {
    /// where readings are sent
    pub destination: Destination,
    pub sensor: Sensor,
    /// how each reading's value is produced
    pub value: ValueMode,
    /// timing and failure handling
    pub emitter: Timing,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Destination {
    /// IP address or DNS name, resolved once at startup
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Sensor {
    pub id: u8,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ValueMode {
    Constant { value: f32 },
    Random { low: i32, high: i32 },
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Timing {
    pub interval_ms: u64,
    pub on_send_error: SendErrorPolicy,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl EmitterConfig {
    /// validates the parts that serde can't, and builds the emitter settings
    pub fn settings(&self) -> Result<emitter::Settings> {
        if self.destination.port == 0 {
            bail!("destination port must not be 0");
        }
        if self.emitter.interval_ms == 0 {
            bail!("emitter.interval_ms must be at least 1");
        }
        let source = match self.value {
            ValueMode::Constant { value } => {
                if !value.is_finite() {
                    bail!("constant value must be a finite number, got {value}");
                }
                ValueSource::constant(value)
            }
            ValueMode::Random { low, high } => {
                ValueSource::uniform(low, high).context("invalid random value range")?
            }
        };
        Ok(emitter::Settings {
            sensor: SensorId(self.sensor.id),
            label: self.sensor.label.clone(),
            source,
            interval: Duration::from_millis(self.emitter.interval_ms),
            on_send_error: self.emitter.on_send_error,
            seed: self.emitter.seed,
        })
    }
}

pub fn load_emitter(args: &EmitterArgs) -> Result<EmitterConfig> {
    let file = args.config.as_deref().map(read_file).transpose()?;
    emitter_from(args, file.as_deref())
}

pub(crate) fn emitter_from(args: &EmitterArgs, file: Option<&str>) -> Result<EmitterConfig> {
    let mut builder = config::Config::builder()
        .set_default("destination.host", DEFAULT_HOST)?
        .set_default("destination.port", i64::from(DEFAULT_PORT))?
        .set_default("emitter.interval_ms", DEFAULT_INTERVAL_MS as i64)?
        .set_default("emitter.on_send_error", policy_name(SendErrorPolicy::default()))?;
    if let Some(preset) = args.preset {
        builder = preset.apply(builder)?;
    }
    if let Some(file) = file {
        builder = builder.add_source(File::from_str(file, FileFormat::Toml));
    }
    if let Some(host) = &args.host {
        builder = builder.set_override("destination.host", host.as_str())?;
    }
    if let Some(port) = args.port {
        builder = builder.set_override("destination.port", i64::from(port))?;
    }
    if let Some(id) = args.sensor_id {
        builder = builder.set_override("sensor.id", i64::from(id))?;
    }
    if let Some(label) = &args.label {
        builder = builder.set_override("sensor.label", label.as_str())?;
    }
    if let Some(value) = args.constant {
        builder = builder
            .set_override("value.mode", "constant")?
            .set_override("value.value", f64::from(value))?;
    }
    if let (Some(low), Some(high)) = (args.low, args.high) {
        builder = builder
            .set_override("value.mode", "random")?
            .set_override("value.low", i64::from(low))?
            .set_override("value.high", i64::from(high))?;
    }
    if let Some(interval) = args.interval_ms {
        let interval = i64::try_from(interval).context("interval is too large")?;
        builder = builder.set_override("emitter.interval_ms", interval)?;
    }
    if let Some(policy) = args.on_send_error {
        builder = builder.set_override("emitter.on_send_error", policy_name(policy))?;
    }
    let built = builder.build()?;
    check_int::<u16>(&built, "destination.port")?;
    check_int::<u8>(&built, "sensor.id")?;
    check_int::<u64>(&built, "emitter.interval_ms")?;
    check_int::<u64>(&built, "emitter.seed")?;
    let mut cfg: EmitterConfig = built
        .try_deserialize()
        .context("invalid emitter configuration")?;
    // seeds use the whole u64 range, which the config value model can't carry
    if let Some(seed) = args.seed {
        cfg.emitter.seed = Some(seed);
    }
    Ok(cfg)
}

/// `config` narrows integers with `as`, so out of range values would silently wrap.
/// missing or non-integer keys are left for deserialization to report
fn check_int<T: TryFrom<i64>>(cfg: &config::Config, key: &str) -> Result<()> {
    match cfg.get::<i64>(key) {
        Ok(value) if T::try_from(value).is_err() => bail!(
            "{key} = {value} is out of range ({} expected)",
            std::any::type_name::<T>()
        ),
        _ => Ok(()),
    }
}

fn policy_name(policy: SendErrorPolicy) -> &'static str {
    match policy {
        SendErrorPolicy::Fatal => "fatal",
        SendErrorPolicy::Log => "log",
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct MonitorConfig {
    pub bind: IpAddr,
    pub port: u16,
    /// a sensor is reported after this long without an update
    pub timeout_ms: u64,
    /// smallest change that counts as an update
    pub min_delta: f32,
    /// readings outside of `valid_min..=valid_max` are dropped
    pub valid_min: f32,
    pub valid_max: f32,
    pub thresholds: Thresholds,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        let defaults = monitor::Settings::default();
        Self {
            bind: Ipv4Addr::UNSPECIFIED.into(),
            port: DEFAULT_PORT,
            timeout_ms: defaults.timeout.as_millis() as u64,
            min_delta: defaults.min_delta,
            valid_min: *defaults.valid.start(),
            valid_max: *defaults.valid.end(),
            thresholds: defaults.thresholds,
        }
    }
}

impl MonitorConfig {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    pub fn settings(&self) -> Result<monitor::Settings> {
        if !(self.valid_min <= self.valid_max) {
            bail!(
                "monitor.valid_min ({}) must not be greater than monitor.valid_max ({})",
                self.valid_min,
                self.valid_max
            );
        }
        if !(self.min_delta >= 0.0) {
            bail!("monitor.min_delta must not be negative");
        }
        Ok(monitor::Settings {
            timeout: Duration::from_millis(self.timeout_ms),
            min_delta: self.min_delta,
            valid: self.valid_min..=self.valid_max,
            thresholds: self.thresholds,
        })
    }
}

#[derive(Debug, Deserialize)]
struct MonitorFile {
    #[serde(default)]
    monitor: MonitorConfig,
}

pub fn load_monitor(args: &MonitorArgs) -> Result<MonitorConfig> {
    let file = args.config.as_deref().map(read_file).transpose()?;
    monitor_from(args, file.as_deref())
}

pub(crate) fn monitor_from(args: &MonitorArgs, file: Option<&str>) -> Result<MonitorConfig> {
    let mut builder = config::Config::builder();
    if let Some(file) = file {
        builder = builder.add_source(File::from_str(file, FileFormat::Toml));
    }
    if let Some(bind) = args.bind {
        builder = builder.set_override("monitor.bind", bind.to_string())?;
    }
    if let Some(port) = args.port {
        builder = builder.set_override("monitor.port", i64::from(port))?;
    }
    let built = builder.build()?;
    check_int::<u16>(&built, "monitor.port")?;
    check_int::<u64>(&built, "monitor.timeout_ms")?;
    let file: MonitorFile = built
        .try_deserialize()
        .context("invalid monitor configuration")?;
    Ok(file.monitor)
}

fn read_file(path: &Path) -> Result<String> {
    info!("Reading configuration from {:?}", path);
    if !path.exists() {
        error!("Configuration file does not exist!");
        bail!("Configuration file {path:?} does not exist!");
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {path:?}"))
}
