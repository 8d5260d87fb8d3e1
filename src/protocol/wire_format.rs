//! Wire format constants and tag types.
//!
//! Every frame on the radio is exactly 64 bytes. Outbound header packets
//! and inbound envelopes look like this:
//! ```text
//! inbound:  ┌────┬─────┬────────┬──────────┬──────┬──────────────┐
//!           │ #R │ len │ signal │ station  │ type │ body         │
//!           │ 2  │ 1   │ 1      │ 4 bytes  │ 1    │ up to 59     │
//!           └────┴─────┴────────┴──────────┴──────┴──────────────┘
//! info:     ┌───────────┬──────┬──────────────────────────────┐
//!           │ countdown │ type │ chunk (zero padded)          │
//!           │ u16 LE    │ 1    │ 61 bytes                     │
//!           └───────────┴──────┴──────────────────────────────┘
//! ```
//!
//! All multi-byte integers are little endian.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{LinkError, Result};

/// Size of every frame exchanged with the transceiver.
pub const FRAME_SIZE: usize = 64;

/// Length of a station identifier.
pub const STATION_ID_LEN: usize = 4;

/// Largest header packet body (frame minus address and message type).
pub const HEADER_BODY_MAX: usize = FRAME_SIZE - STATION_ID_LEN - 1;

/// Countdown plus message type in front of every information chunk.
pub const INFO_PREFIX_SIZE: usize = 3;

/// Chunk bytes carried by one information packet.
pub const CHUNK_SIZE: usize = FRAME_SIZE - INFO_PREFIX_SIZE;

/// Marker the transceiver puts in front of every received packet.
pub const RECEIVE_MARKER: [u8; 2] = *b"#R";

/// Marker, packet length and signal strength.
pub const ENVELOPE_PREFIX_SIZE: usize = 4;

/// A received information frame starting with these bytes ends a transfer.
pub const TRANSFER_SENTINEL: [u8; 4] = *b"#EOT";

/// Highest transceiver channel.
pub const MAX_CHANNEL: u8 = 15;

/// Four-byte station address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct StationId(pub [u8; STATION_ID_LEN]);

impl StationId {
    /// Create a station identifier from raw bytes.
    pub const fn new(id: [u8; STATION_ID_LEN]) -> Self {
        Self(id)
    }

    /// Read an identifier from the first four bytes of `buf`.
    pub fn from_slice(buf: &[u8]) -> Option<Self> {
        let id: [u8; STATION_ID_LEN] = buf.get(..STATION_ID_LEN)?.try_into().ok()?;
        Some(Self(id))
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; STATION_ID_LEN] {
        &self.0
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{:02x}", b)?;
            }
        }
        Ok(())
    }
}

impl FromStr for StationId {
    type Err = LinkError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes: [u8; STATION_ID_LEN] = s.as_bytes().try_into().map_err(|_| {
            LinkError::InvalidArgument(format!(
                "station id must be {} bytes, got {:?}",
                STATION_ID_LEN, s
            ))
        })?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for StationId {
    type Error = LinkError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

/// Discriminates what a header packet announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    Wod = 1,
    ScienceImage = 2,
    ScienceThermoAndCurrent = 3,
    GroundStationCommand = 4,
    Time = 5,
    Pong = 6,
    Debug = 7,
}

impl MessageType {
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for MessageType {
    type Error = LinkError;

    fn try_from(code: u8) -> Result<Self> {
        Ok(match code {
            1 => MessageType::Wod,
            2 => MessageType::ScienceImage,
            3 => MessageType::ScienceThermoAndCurrent,
            4 => MessageType::GroundStationCommand,
            5 => MessageType::Time,
            6 => MessageType::Pong,
            7 => MessageType::Debug,
            other => return Err(LinkError::UnrecognizedMessageType(other)),
        })
    }
}

/// Command code carried after a `GroundStationCommand` message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandCode {
    RequestWod = 1,
    RequestScienceImage = 2,
    RequestScienceThermoAndCurrent = 3,
    SendPing = 4,
    RequestTime = 5,
    SetTime = 6,
    SetOperatingMode = 7,
    ClearStorageData = 8,
    ActivatePayloadStrikingMechanism = 9,
    PerformScienceMeasurement = 10,
}

impl CommandCode {
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for CommandCode {
    type Error = LinkError;

    fn try_from(code: u8) -> Result<Self> {
        Ok(match code {
            1 => CommandCode::RequestWod,
            2 => CommandCode::RequestScienceImage,
            3 => CommandCode::RequestScienceThermoAndCurrent,
            4 => CommandCode::SendPing,
            5 => CommandCode::RequestTime,
            6 => CommandCode::SetTime,
            7 => CommandCode::SetOperatingMode,
            8 => CommandCode::ClearStorageData,
            9 => CommandCode::ActivatePayloadStrikingMechanism,
            10 => CommandCode::PerformScienceMeasurement,
            other => return Err(LinkError::UnrecognizedCommand(other)),
        })
    }
}

/// Payload camera selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Camera {
    Left = 0,
    Right = 1,
}

impl Camera {
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Camera {
    type Error = LinkError;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            0 => Ok(Camera::Left),
            1 => Ok(Camera::Right),
            other => Err(LinkError::InvalidArgument(format!("camera {}", other))),
        }
    }
}

/// Transceiver operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum OperatingMode {
    /// Receive only.
    Receive = 1,
    /// Fast switching between TX and RX.
    #[default]
    Switching = 2,
    Sleep = 3,
}

impl OperatingMode {
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for OperatingMode {
    type Error = LinkError;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            1 => Ok(OperatingMode::Receive),
            2 => Ok(OperatingMode::Switching),
            3 => Ok(OperatingMode::Sleep),
            other => Err(LinkError::InvalidArgument(format!(
                "operating mode {}",
                other
            ))),
        }
    }
}
