//! Header and information packets.
//!
//! A logical message is one [`HeaderPacket`] optionally followed by a run of
//! [`InformationPacket`]s whose countdown falls to zero on the last one.

use bytes::Bytes;

use super::frame::Frame;
use super::wire_format::{
    MessageType, StationId, CHUNK_SIZE, FRAME_SIZE, HEADER_BODY_MAX, INFO_PREFIX_SIZE,
    STATION_ID_LEN,
};
use crate::error::{LinkError, Result};

/// Most information packets one transfer can carry (countdown is a u16).
pub const MAX_PACKETS: usize = u16::MAX as usize + 1;

/// Announces a message and carries its fixed-size metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderPacket {
    pub target: StationId,
    pub message_type: MessageType,
    pub body: Bytes,
}

impl HeaderPacket {
    /// Create a header packet, rejecting bodies over 59 bytes.
    pub fn new(target: StationId, message_type: MessageType, body: impl Into<Bytes>) -> Result<Self> {
        let body = body.into();
        if body.len() > HEADER_BODY_MAX {
            return Err(LinkError::PayloadTooLarge {
                len: body.len(),
                max: HEADER_BODY_MAX,
            });
        }
        Ok(Self {
            target,
            message_type,
            body,
        })
    }

    /// Header packet with no body.
    pub fn empty(target: StationId, message_type: MessageType) -> Self {
        Self {
            target,
            message_type,
            body: Bytes::new(),
        }
    }

    /// Address, message type and body, ready for [`Frame::encode`].
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(STATION_ID_LEN + 1 + self.body.len());
        out.extend_from_slice(self.target.as_bytes());
        out.push(self.message_type.code());
        out.extend_from_slice(&self.body);
        out
    }

    /// Parse a received frame as a header packet.
    ///
    /// The body is everything after the message type, padding included.
    pub fn decode(frame: &Frame) -> Result<Self> {
        let raw = frame.raw();
        let target = StationId::from_slice(raw).ok_or(LinkError::FrameTooShort {
            got: raw.len(),
            need: STATION_ID_LEN,
        })?;
        let message_type = MessageType::try_from(raw[STATION_ID_LEN])?;
        Ok(Self {
            target,
            message_type,
            body: Bytes::copy_from_slice(&raw[STATION_ID_LEN + 1..]),
        })
    }

    pub fn to_frame(&self, channel: u8) -> Result<Frame> {
        Frame::encode(channel, &self.encode())
    }
}

/// One chunk of a larger payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InformationPacket {
    /// Packets still to come after this one.
    pub countdown: u16,
    pub message_type: MessageType,
    /// Up to 61 bytes; padding is added only on the wire.
    pub chunk: Bytes,
}

impl InformationPacket {
    /// Split `contents` into packets in transmission order.
    ///
    /// The first packet carries the first 61 bytes and the highest
    /// countdown; the last carries countdown 0. An empty payload still
    /// yields one terminal packet so the receiver can finish.
    pub fn split(message_type: MessageType, contents: &[u8]) -> Result<Vec<Self>> {
        let n = contents.len().div_ceil(CHUNK_SIZE).max(1);
        if n > MAX_PACKETS {
            return Err(LinkError::PayloadTooLarge {
                len: contents.len(),
                max: MAX_PACKETS * CHUNK_SIZE,
            });
        }

        let data = Bytes::copy_from_slice(contents);
        let packets = (0..n)
            .map(|k| {
                let start = (k * CHUNK_SIZE).min(data.len());
                let end = ((k + 1) * CHUNK_SIZE).min(data.len());
                Self {
                    countdown: (n - 1 - k) as u16,
                    message_type,
                    chunk: data.slice(start..end),
                }
            })
            .collect();
        Ok(packets)
    }

    /// Countdown, message type, zero padded chunk.
    pub fn encode(&self) -> [u8; FRAME_SIZE] {
        let mut out = [0u8; FRAME_SIZE];
        out[0..2].copy_from_slice(&self.countdown.to_le_bytes());
        out[2] = self.message_type.code();
        let len = self.chunk.len().min(CHUNK_SIZE);
        out[INFO_PREFIX_SIZE..INFO_PREFIX_SIZE + len].copy_from_slice(&self.chunk[..len]);
        out
    }

    /// Parse a received frame; the chunk is always the full 61 bytes.
    pub fn decode(frame: &Frame) -> Result<Self> {
        let raw = frame.raw();
        Ok(Self {
            countdown: u16::from_le_bytes([raw[0], raw[1]]),
            message_type: MessageType::try_from(raw[2])?,
            chunk: Bytes::copy_from_slice(&raw[INFO_PREFIX_SIZE..]),
        })
    }

    pub fn to_frame(&self, channel: u8) -> Result<Frame> {
        Frame::encode(channel, &self.encode())
    }

    #[inline]
    pub fn is_last(&self) -> bool {
        self.countdown == 0
    }
}
