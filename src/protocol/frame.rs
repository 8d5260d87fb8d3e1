//! Physical frame codec.
//!
//! A [`Frame`] is one fixed 64-byte transceiver buffer. Outbound payloads are
//! left-justified and zero padded. Inbound reads carry the receive envelope
//! (`#R`, length, signal strength) in their first four bytes; the frame is
//! whatever follows, zero padded back to 64 bytes when the read was cut at
//! one frame length.
//!
//! # Example
//!
//! ```
//! use obc_link::protocol::{Frame, FRAME_SIZE};
//!
//! let frame = Frame::encode(0, b"CUBE\x06").unwrap();
//! assert_eq!(frame.raw().len(), FRAME_SIZE);
//! assert_eq!(&frame.raw()[..5], b"CUBE\x06");
//! assert!(frame.raw()[5..].iter().all(|&b| b == 0));
//! ```

use super::wire_format::{ENVELOPE_PREFIX_SIZE, FRAME_SIZE, MAX_CHANNEL, RECEIVE_MARKER};
use crate::error::{LinkError, Result};

/// Which way a frame travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Tx,
    Rx,
}

/// One fixed-size transceiver frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    direction: Direction,
    channel: u8,
    raw: [u8; FRAME_SIZE],
}

impl Frame {
    /// Build an outbound frame, zero padding `payload` to 64 bytes.
    pub fn encode(channel: u8, payload: &[u8]) -> Result<Self> {
        if payload.len() > FRAME_SIZE {
            return Err(LinkError::PayloadTooLarge {
                len: payload.len(),
                max: FRAME_SIZE,
            });
        }
        if channel > MAX_CHANNEL {
            return Err(LinkError::InvalidArgument(format!("channel {}", channel)));
        }

        let mut raw = [0u8; FRAME_SIZE];
        raw[..payload.len()].copy_from_slice(payload);
        Ok(Self {
            direction: Direction::Tx,
            channel,
            raw,
        })
    }

    /// Parse a 64-byte buffer read from the link.
    ///
    /// Bytes past the first 64 are ignored.
    pub fn decode(raw: &[u8]) -> Result<Self> {
        let raw: [u8; FRAME_SIZE] = raw
            .get(..FRAME_SIZE)
            .and_then(|b| b.try_into().ok())
            .ok_or(LinkError::FrameTooShort {
                got: raw.len(),
                need: FRAME_SIZE,
            })?;
        Ok(Self {
            direction: Direction::Rx,
            channel: 0,
            raw,
        })
    }

    #[inline]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[inline]
    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// Length the transceiver is told to send; always the full frame.
    #[inline]
    pub fn payload_length(&self) -> u8 {
        FRAME_SIZE as u8
    }

    #[inline]
    pub fn raw(&self) -> &[u8; FRAME_SIZE] {
        &self.raw
    }
}

/// A frame as delivered by the transceiver in receive mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveEnvelope {
    /// Packet length reported by the transceiver.
    pub packet_length: u8,
    /// Received signal strength.
    pub signal_strength: u8,
    /// The frame the remote side transmitted.
    pub frame: Frame,
}

impl ReceiveEnvelope {
    /// Strip `#R`, packet length and signal strength, then decode the frame.
    ///
    /// Reads shorter than one frame are rejected before anything else is
    /// looked at. A 64-byte read leaves 60 frame bytes; the missing tail is
    /// zero filled.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < FRAME_SIZE {
            return Err(LinkError::FrameTooShort {
                got: data.len(),
                need: FRAME_SIZE,
            });
        }
        if data[..2] != RECEIVE_MARKER {
            return Err(LinkError::MalformedEnvelope(format!(
                "bad receive marker {:02x?}",
                &data[..2]
            )));
        }

        let packet_length = data[2];
        let signal_strength = data[3];
        if packet_length == 0 || packet_length as usize > FRAME_SIZE {
            return Err(LinkError::MalformedEnvelope(format!(
                "packet length {}",
                packet_length
            )));
        }

        let tail = &data[ENVELOPE_PREFIX_SIZE..];
        let mut raw = [0u8; FRAME_SIZE];
        let n = tail.len().min(FRAME_SIZE);
        raw[..n].copy_from_slice(&tail[..n]);
        let frame = Frame::decode(&raw)?;
        Ok(Self {
            packet_length,
            signal_strength,
            frame,
        })
    }

    /// Build the byte sequence a transceiver would deliver for `frame`.
    pub fn wrap(frame: &Frame, signal_strength: u8) -> Vec<u8> {
        let mut out = Vec::with_capacity(ENVELOPE_PREFIX_SIZE + FRAME_SIZE);
        out.extend_from_slice(&RECEIVE_MARKER);
        out.push(frame.payload_length());
        out.push(signal_strength);
        out.extend_from_slice(frame.raw());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_pads_with_zeros() {
        let frame = Frame::encode(3, b"hello").unwrap();
        assert_eq!(frame.direction(), Direction::Tx);
        assert_eq!(frame.channel(), 3);
        assert_eq!(frame.payload_length(), 64);
        assert_eq!(&frame.raw()[..5], b"hello");
        assert!(frame.raw()[5..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_encode_empty_and_full() {
        let empty = Frame::encode(0, &[]).unwrap();
        assert_eq!(empty.raw(), &[0u8; FRAME_SIZE]);

        let full = [0xAB; FRAME_SIZE];
        let frame = Frame::encode(0, &full).unwrap();
        assert_eq!(frame.raw(), &full);
    }

    #[test]
    fn test_encode_too_large() {
        let err = Frame::encode(0, &[1u8; FRAME_SIZE + 1]).unwrap_err();
        assert!(matches!(
            err,
            LinkError::PayloadTooLarge { len: 65, max: 64 }
        ));
    }

    #[test]
    fn test_encode_bad_channel() {
        assert!(Frame::encode(16, b"x").is_err());
        assert!(Frame::encode(15, b"x").is_ok());
    }

    #[test]
    fn test_decode_identity() {
        let raw: Vec<u8> = (0..64).collect();
        let frame = Frame::decode(&raw).unwrap();
        assert_eq!(frame.direction(), Direction::Rx);
        assert_eq!(&frame.raw()[..], &raw[..]);
    }

    #[test]
    fn test_decode_too_short() {
        let err = Frame::decode(&[0u8; 63]).unwrap_err();
        assert!(matches!(err, LinkError::FrameTooShort { got: 63, need: 64 }));
    }

    #[test]
    fn test_envelope_round_trip() {
        let frame = Frame::encode(0, b"CUBE\x04\x04").unwrap();
        let bytes = ReceiveEnvelope::wrap(&frame, 0x55);
        assert_eq!(&bytes[..4], b"#R\x40\x55");

        let env = ReceiveEnvelope::parse(&bytes).unwrap();
        assert_eq!(env.packet_length, 64);
        assert_eq!(env.signal_strength, 0x55);
        assert_eq!(env.frame.raw(), frame.raw());
    }

    #[test]
    fn test_envelope_short_read() {
        assert!(matches!(
            ReceiveEnvelope::parse(b"#R\x40\x10CUBE"),
            Err(LinkError::FrameTooShort { .. })
        ));
    }

    #[test]
    fn test_envelope_bad_marker() {
        let mut bytes = ReceiveEnvelope::wrap(&Frame::encode(0, b"x").unwrap(), 1);
        bytes[1] = b'X';
        assert!(matches!(
            ReceiveEnvelope::parse(&bytes),
            Err(LinkError::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn test_envelope_bad_length() {
        let mut bytes = ReceiveEnvelope::wrap(&Frame::encode(0, b"x").unwrap(), 1);
        bytes[2] = 0;
        assert!(ReceiveEnvelope::parse(&bytes).is_err());
        bytes[2] = 65;
        assert!(ReceiveEnvelope::parse(&bytes).is_err());
    }

    #[test]
    fn test_envelope_of_one_frame_length() {
        // 64 bytes read: envelope prefix plus the first 60 frame bytes
        let mut bytes = b"#R\x40\x50CUBE\x04\x04".to_vec();
        bytes.resize(FRAME_SIZE, 0);
        let env = ReceiveEnvelope::parse(&bytes).unwrap();
        assert_eq!(env.signal_strength, 0x50);
        assert_eq!(&env.frame.raw()[..6], b"CUBE\x04\x04");
        assert!(env.frame.raw()[6..].iter().all(|&b| b == 0));

        let full = ReceiveEnvelope::wrap(&Frame::encode(0, &[7u8; FRAME_SIZE]).unwrap(), 1);
        let cut = ReceiveEnvelope::parse(&full[..FRAME_SIZE]).unwrap();
        assert_eq!(&cut.frame.raw()[..60], &[7u8; 60][..]);
        assert_eq!(&cut.frame.raw()[60..], &[0u8; 4][..]);
    }

    #[test]
    fn test_envelope_one_byte_short() {
        let bytes = ReceiveEnvelope::wrap(&Frame::encode(0, b"x").unwrap(), 1);
        assert!(matches!(
            ReceiveEnvelope::parse(&bytes[..63]),
            Err(LinkError::FrameTooShort { got: 63, need: 64 })
        ));
    }
}
