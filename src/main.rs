//! Sends a sensor reading over UDP every few seconds, forever.
//!
//! Each reading is a 5 byte datagram (sensor id + little-endian f32, see [`reading`]).
//! `monitor` is the other side of the wire, for trying emitters out without the real receiver.

#[macro_use]
extern crate tracing;
#[macro_use]
extern crate anyhow;

mod core;
mod emitter;
mod monitor;
mod reading;
mod sensor;
mod source;

fn main() -> anyhow::Result<()> {
    core::rt::stage0_delegate()
}
