//! Transceiver control sequences.
//!
//! The radio is driven with short AT-style commands written ahead of any
//! parameters or payload:
//!
//! | Command | Parameters | Payload |
//! |---|---|---|
//! | `ATR` set receive parameters | channel, packet length | - |
//! | `ATM` set operating mode | mode (1/2/3) | - |
//! | `ATT` transmit | channel, packet length | 64-byte frame |
//!
//! Each part is a separate write on the link.

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::{LinkError, Result};
use crate::protocol::{Frame, OperatingMode, FRAME_SIZE, MAX_CHANNEL};

/// Set receive parameters.
pub const CMD_RECEIVE: &[u8; 3] = b"ATR";

/// Set operating mode.
pub const CMD_MODE: &[u8; 3] = b"ATM";

/// Transmit a frame.
pub const CMD_TRANSMIT: &[u8; 3] = b"ATT";

/// One command sequence for the transceiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransceiverCommand {
    SetReceive { channel: u8, packet_length: u8 },
    SetMode(OperatingMode),
    Transmit(Frame),
}

impl TransceiverCommand {
    /// Receive parameters, validated against the radio's limits.
    pub fn set_receive(channel: u8, packet_length: u8) -> Result<Self> {
        if channel > MAX_CHANNEL {
            return Err(LinkError::InvalidArgument(format!("channel {}", channel)));
        }
        if packet_length == 0 || packet_length as usize > FRAME_SIZE {
            return Err(LinkError::InvalidArgument(format!(
                "packet length {}",
                packet_length
            )));
        }
        Ok(Self::SetReceive {
            channel,
            packet_length,
        })
    }

    /// The writes this command issues, in order.
    pub fn segments(&self) -> Vec<Bytes> {
        match self {
            Self::SetReceive {
                channel,
                packet_length,
            } => vec![
                Bytes::from_static(CMD_RECEIVE),
                Bytes::copy_from_slice(&[*channel, *packet_length]),
            ],
            Self::SetMode(mode) => vec![
                Bytes::from_static(CMD_MODE),
                Bytes::copy_from_slice(&[mode.code()]),
            ],
            Self::Transmit(frame) => vec![
                Bytes::from_static(CMD_TRANSMIT),
                Bytes::copy_from_slice(&[frame.channel(), frame.payload_length()]),
                Bytes::copy_from_slice(frame.raw()),
            ],
        }
    }

    /// Issue the command on `writer` and flush.
    pub async fn write_to<W>(&self, writer: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        for segment in self.segments() {
            writer.write_all(&segment).await?;
        }
        writer.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_receive_segments() {
        let cmd = TransceiverCommand::set_receive(0, 64).unwrap();
        let segments = cmd.segments();
        assert_eq!(segments.len(), 2);
        assert_eq!(&segments[0][..], b"ATR");
        assert_eq!(&segments[1][..], &[0, 64]);
    }

    #[test]
    fn test_set_receive_limits() {
        assert!(TransceiverCommand::set_receive(16, 64).is_err());
        assert!(TransceiverCommand::set_receive(0, 0).is_err());
        assert!(TransceiverCommand::set_receive(0, 65).is_err());
    }

    #[test]
    fn test_mode_segments() {
        let segments = TransceiverCommand::SetMode(OperatingMode::Sleep).segments();
        assert_eq!(&segments[0][..], b"ATM");
        assert_eq!(&segments[1][..], &[3]);
    }

    #[test]
    fn test_transmit_three_writes() {
        let frame = Frame::encode(5, b"GRND\x06").unwrap();
        let segments = TransceiverCommand::Transmit(frame).segments();
        assert_eq!(segments.len(), 3);
        assert_eq!(&segments[0][..], b"ATT");
        assert_eq!(&segments[1][..], &[5, 64]);
        assert_eq!(segments[2].len(), 64);
        assert_eq!(&segments[2][..5], b"GRND\x06");
    }

    #[tokio::test]
    async fn test_write_to() {
        let mut out: Vec<u8> = Vec::new();
        let frame = Frame::encode(1, b"hi").unwrap();
        TransceiverCommand::Transmit(frame)
            .write_to(&mut out)
            .await
            .unwrap();
        assert_eq!(out.len(), 3 + 2 + 64);
        assert_eq!(&out[..7], b"ATT\x01\x40hi");
    }
}
