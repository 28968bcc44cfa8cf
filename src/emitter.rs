//! The periodic emitter: draw a value, pack it, send it, log it, sleep, repeat.

use std::{
    io,
    net::{Ipv4Addr, Ipv6Addr, SocketAddr},
    time::Duration,
};

use rand::{rngs::StdRng, SeedableRng};
use serde::Deserialize;
use tokio::{net::UdpSocket, select, time::sleep};

use crate::{
    core::shutdown::ShutdownHandle,
    reading::{Reading, READING_LEN},
    sensor::SensorId,
    source::ValueSource,
};


#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to open a UDP socket: {0}")]
    Bind(#[source] io::Error),
    #[error("failed to send reading to {dest}: {source}")]
    Send {
        dest: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("only {sent} of 5 bytes were sent to {dest}")]
    ShortSend { dest: SocketAddr, sent: usize },
}

/// What to do when a datagram could not be handed to the network
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SendErrorPolicy {
    /// stop the emitter, returning the error
    #[default]
    Fatal,
    /// log a warning, count the failure and keep going
    Log,
}

/// Everything about an emitter except where it sends to
#[derive(Debug, Clone)]
pub struct Settings {
    pub sensor: SensorId,
    /// name used in log lines, defaults to the kind name for known sensor ids
    pub label: Option<String>,
    pub source: ValueSource,
    pub interval: Duration,
    pub on_send_error: SendErrorPolicy,
    /// fixed RNG seed, for reproducible random sequences
    pub seed: Option<u64>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub sent: u64,
    pub failed: u64,
}

pub struct Emitter {
    settings: Settings,
    dest: SocketAddr,
    sock: UdpSocket,
    rng: StdRng,
    stats: Stats,
}

impl Emitter {
    /// opens the socket that is used for the lifetime of the emitter.
    /// the local address is picked by the OS, matching the address family of `dest`
    pub async fn bind(settings: Settings, dest: SocketAddr) -> Result<Self, Error> {
        let local: SocketAddr = if dest.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let sock = UdpSocket::bind(local).await.map_err(Error::Bind)?;
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        debug!(local = ?sock.local_addr().ok(), %dest, "socket ready");
        Ok(Self {
            settings,
            dest,
            sock,
            rng,
            stats: Stats::default(),
        })
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn next_reading(&mut self) -> Reading {
        let value = self.settings.source.sample(&mut self.rng);
        Reading::new(self.settings.sensor, value)
    }

    /// draws, sends and logs a single reading. no retry
    pub async fn emit_once(&mut self) -> Result<Reading, Error> {
        let reading = self.next_reading();
        let buf = reading.encode();
        match self.sock.send_to(&buf, self.dest).await {
            Ok(sent) if sent == READING_LEN => {}
            Ok(sent) => {
                self.stats.failed += 1;
                return Err(Error::ShortSend {
                    dest: self.dest,
                    sent,
                });
            }
            Err(source) => {
                self.stats.failed += 1;
                return Err(Error::Send {
                    dest: self.dest,
                    source,
                });
            }
        }
        self.stats.sent += 1;
        info!("Sent -> {}", self.describe(&reading));
        Ok(reading)
    }

    /// sends forever, until `shutdown` fires or (with [`SendErrorPolicy::Fatal`]) a send fails.
    /// shutdown is only observed between sends
    pub async fn run(mut self, mut shutdown: ShutdownHandle) -> Result<Stats, Error> {
        info!(
            sensor = %self.settings.sensor,
            dest = %self.dest,
            interval = ?self.settings.interval,
            "emitting {}",
            self.settings.source.describe()
        );
        loop {
            if let Err(err) = self.emit_once().await {
                match self.settings.on_send_error {
                    SendErrorPolicy::Fatal => return Err(err),
                    SendErrorPolicy::Log => warn!("{err} (continuing)"),
                }
            }
            select! {
                _ = sleep(self.settings.interval) => {}
                _ = shutdown.wait_for_shutdown() => break,
            }
        }
        info!(
            sent = self.stats.sent,
            failed = self.stats.failed,
            "emitter stopped"
        );
        Ok(self.stats)
    }

    fn describe(&self, reading: &Reading) -> String {
        match &self.settings.label {
            Some(label) => format!("ID: {} | {label}: {}", reading.sensor, reading.value),
            None => reading.to_string(),
        }
    }
}
