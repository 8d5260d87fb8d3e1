//! Outbound messages as header packet plus information packets.
//!
//! A [`Transfer`] is the unit the writer task sends atomically: the header
//! frame first, then every information frame in countdown order.

use bytes::Bytes;

use crate::error::Result;
use crate::protocol::{Frame, HeaderPacket, InformationPacket, MessageType, StationId};

/// One logical message ready for transmission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub header: HeaderPacket,
    pub packets: Vec<InformationPacket>,
}

impl Transfer {
    /// A message that is only a header packet.
    pub fn header_only(header: HeaderPacket) -> Self {
        Self {
            header,
            packets: Vec::new(),
        }
    }

    /// A header packet followed by `contents` split into chunks.
    pub fn chunked(header: HeaderPacket, contents: &[u8]) -> Result<Self> {
        let packets = InformationPacket::split(header.message_type, contents)?;
        Ok(Self { header, packets })
    }

    /// Header with an empty body and no chunks.
    pub fn signal(target: StationId, message_type: MessageType) -> Self {
        Self::header_only(HeaderPacket::empty(target, message_type))
    }

    /// Keep only a window of the information packets and renumber them.
    ///
    /// Skips `skip` leading packets and keeps at most `limit` (all if
    /// `None`). Countdowns are rewritten so the last kept packet carries 0.
    /// An empty window still ends with one empty countdown-0 packet.
    pub fn window(mut self, skip: usize, limit: Option<usize>) -> Self {
        let start = skip.min(self.packets.len());
        let end = match limit {
            Some(limit) => start.saturating_add(limit).min(self.packets.len()),
            None => self.packets.len(),
        };
        let mut kept: Vec<InformationPacket> = self.packets.drain(start..end).collect();
        if kept.is_empty() {
            kept.push(InformationPacket {
                countdown: 0,
                message_type: self.header.message_type,
                chunk: Bytes::new(),
            });
        }
        let n = kept.len();
        for (k, packet) in kept.iter_mut().enumerate() {
            packet.countdown = (n - 1 - k) as u16;
        }
        self.packets = kept;
        self
    }

    pub fn message_type(&self) -> MessageType {
        self.header.message_type
    }

    /// Number of frames on the air, header included.
    pub fn frame_count(&self) -> usize {
        1 + self.packets.len()
    }

    /// Encode every frame in transmission order.
    pub fn frames(&self, channel: u8) -> Result<Vec<Frame>> {
        let mut frames = Vec::with_capacity(self.frame_count());
        frames.push(self.header.to_frame(channel)?);
        for packet in &self.packets {
            frames.push(packet.to_frame(channel)?);
        }
        Ok(frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GROUND: StationId = StationId::new(*b"GRND");

    #[test]
    fn test_header_only() {
        let transfer = Transfer::signal(GROUND, MessageType::Pong);
        assert_eq!(transfer.frame_count(), 1);
        let frames = transfer.frames(0).unwrap();
        assert_eq!(&frames[0].raw()[..5], b"GRND\x06");
    }

    #[test]
    fn test_chunked_frames_in_order() {
        let header = HeaderPacket::empty(GROUND, MessageType::Wod);
        let transfer = Transfer::chunked(header, &[1u8; 260]).unwrap();
        assert_eq!(transfer.frame_count(), 6);

        let frames = transfer.frames(2).unwrap();
        assert!(frames.iter().all(|f| f.channel() == 2));
        let countdowns: Vec<u16> = frames[1..]
            .iter()
            .map(|f| u16::from_le_bytes([f.raw()[0], f.raw()[1]]))
            .collect();
        assert_eq!(countdowns, vec![4, 3, 2, 1, 0]);
    }

    #[test]
    fn test_window_renumbers() {
        let header = HeaderPacket::empty(GROUND, MessageType::ScienceImage);
        let payload: Vec<u8> = (0..=255u8).cycle().take(61 * 6).collect();
        let transfer = Transfer::chunked(header, &payload).unwrap().window(2, Some(3));

        assert_eq!(transfer.packets.len(), 3);
        let countdowns: Vec<u16> = transfer.packets.iter().map(|p| p.countdown).collect();
        assert_eq!(countdowns, vec![2, 1, 0]);
        assert_eq!(&transfer.packets[0].chunk[..], &payload[122..183]);
    }

    #[test]
    fn test_window_bounds() {
        let header = HeaderPacket::empty(GROUND, MessageType::ScienceImage);
        let base = Transfer::chunked(header, &[0u8; 61 * 4]).unwrap();

        assert_eq!(base.clone().window(0, None).packets.len(), 4);
        assert_eq!(base.clone().window(3, Some(10)).packets.len(), 1);
        assert_eq!(base.clone().window(1, Some(0)).packets.len(), 1);

        let past_end = base.window(9, None);
        assert_eq!(past_end.packets.len(), 1);
        assert_eq!(past_end.packets[0].countdown, 0);
        assert_eq!(past_end.packets[0].message_type, MessageType::ScienceImage);
        assert!(past_end.packets[0].chunk.is_empty());
    }
}
