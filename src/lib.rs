//! # obc-link
//!
//! Radio link layer between a CubeSat on-board computer and its ground
//! station.
//!
//! Both ends talk through a half-duplex transceiver on a UART. Every
//! transmission is a fixed 64-byte frame; longer messages are announced by
//! a header packet and followed by countdown-indexed information packets.
//!
//! ## Architecture
//!
//! - **Protocol** ([`protocol`]): frames, receive envelopes, packets, reassembly
//! - **Codecs** ([`codec`]): WOD telemetry, science images, thermo/current readings
//! - **Dispatch** ([`dispatcher`]): satellite command handling, ground-side decoding
//! - **Runtime** ([`SatelliteNode`], [`GroundStation`]): reader loop plus a
//!   single writer task that owns the transmit side
//!
//! ## Example
//!
//! ```ignore
//! use std::time::Duration;
//! use obc_link::{Command, GroundStation, LinkConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut ground = GroundStation::open(LinkConfig::default()).await?;
//!     let reply = ground.request(Command::SendPing, Duration::from_secs(5)).await?;
//!     println!("{:?}", reply);
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod config;
pub mod dispatcher;
pub mod epoch;
pub mod error;
pub mod protocol;
pub mod transceiver;
pub mod transfer;
pub mod transport;
pub mod writer;

mod node;

pub use config::LinkConfig;
pub use dispatcher::{Command, Downlink, SatelliteServices};
pub use error::LinkError;
pub use node::{GroundStation, SatelliteBuilder, SatelliteNode};
