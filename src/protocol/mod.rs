//! Protocol module - wire format, frames, packets and reassembly.
//!
//! This module implements the radio link layer:
//! - fixed 64-byte frame encoding/decoding and the receive envelope
//! - header packets and countdown-indexed information packets
//! - reassembly of chunked transfers with bounded reads

mod frame;
mod packet;
mod reassembly;
mod wire_format;

pub use frame::{Direction, Frame, ReceiveEnvelope};
pub use packet::{HeaderPacket, InformationPacket, MAX_PACKETS};
pub use reassembly::{Reassembler, TransferKind, WOD_READ_CAP};
pub use wire_format::{
    Camera, CommandCode, MessageType, OperatingMode, StationId, CHUNK_SIZE, ENVELOPE_PREFIX_SIZE,
    FRAME_SIZE, HEADER_BODY_MAX, INFO_PREFIX_SIZE, MAX_CHANNEL, RECEIVE_MARKER, STATION_ID_LEN,
    TRANSFER_SENTINEL,
};
