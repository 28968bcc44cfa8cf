use std::{net::IpAddr, path::PathBuf};

use clap::{Args, Parser, Subcommand};

use super::config::Preset;
use crate::emitter::SendErrorPolicy;

#[derive(Parser, Debug)]
#[command(version, about)]
pub struct ArgsParser {
    #[arg(
        long,
        global = true,
        help = "also write logs to an hourly rotated file in this directory"
    )]
    pub log_dir: Option<PathBuf>,
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// send readings forever, until killed (or ctrl+c)
    Run {
        #[command(flatten)]
        args: EmitterArgs,
    },
    /// send a single reading and exit
    Once {
        #[command(flatten)]
        args: EmitterArgs,
    },
    /// listen for readings and report them the way the greenhouse controller would
    Monitor {
        #[command(flatten)]
        args: MonitorArgs,
    },
}

/// Emitter settings. Anything given here overrides the config file, which overrides the preset
#[derive(Args, Debug, Default)]
pub struct EmitterArgs {
    #[arg(long, short, help = "config filepath")]
    pub config: Option<PathBuf>,
    #[arg(long, short, value_enum, help = "start from the settings of one of the stock sensors")]
    pub preset: Option<Preset>,
    #[arg(long, help = "destination host (IP address or DNS name)")]
    pub host: Option<String>,
    #[arg(long, help = "destination UDP port")]
    pub port: Option<u16>,
    #[arg(long, short, help = "sensor id byte (1 = humidity, 2 = temperature, 3 = light)")]
    pub sensor_id: Option<u8>,
    #[arg(long, help = "name of the sensor in log output")]
    pub label: Option<String>,
    #[arg(
        long,
        allow_negative_numbers = true,
        conflicts_with_all = ["low", "high"],
        help = "send this value every time"
    )]
    pub constant: Option<f32>,
    #[arg(
        long,
        allow_negative_numbers = true,
        requires = "high",
        help = "lower bound (inclusive) of random integer values"
    )]
    pub low: Option<i32>,
    #[arg(
        long,
        allow_negative_numbers = true,
        requires = "low",
        help = "upper bound (inclusive) of random integer values"
    )]
    pub high: Option<i32>,
    #[arg(long, short, help = "delay between two readings, in milliseconds")]
    pub interval_ms: Option<u64>,
    #[arg(long, value_enum, help = "what to do when a reading cannot be sent")]
    pub on_send_error: Option<SendErrorPolicy>,
    #[arg(long, help = "seed for the random number generator (reproducible runs)")]
    pub seed: Option<u64>,
}

#[derive(Args, Debug, Default)]
pub struct MonitorArgs {
    #[arg(long, short, help = "config filepath (only the [monitor] table is used)")]
    pub config: Option<PathBuf>,
    #[arg(long, help = "address to listen on")]
    pub bind: Option<IpAddr>,
    #[arg(long, help = "UDP port to listen on")]
    pub port: Option<u16>,
}
