//! Reassembly of chunked transfers.
//!
//! Implements a small state machine fed one physical read at a time:
//! - `Receiving`: accumulating chunks in arrival order
//! - `Complete`: countdown 0, the sentinel, the length cap, or a short read
//!
//! Chunks are concatenated strictly in the order they arrive. Countdown
//! values are never used to reorder; they only tell the receiver when to
//! stop. A read shorter than one frame ends the transfer with whatever has
//! arrived, and the payload codec decides whether that is enough. Every
//! transfer also has a read cap; running out of reads yields
//! `IncompleteTransfer`.
//!
//! # Example
//!
//! ```
//! use obc_link::protocol::{InformationPacket, MessageType};
//!
//! let payload = vec![42u8; 200];
//! let packets = InformationPacket::split(MessageType::Wod, &payload).unwrap();
//! let bytes = InformationPacket::reassemble(packets).unwrap();
//! assert_eq!(&bytes[..], &payload[..]);
//! ```

use bytes::{Bytes, BytesMut};

use super::frame::ReceiveEnvelope;
use super::packet::{InformationPacket, MAX_PACKETS};
use super::wire_format::{CHUNK_SIZE, FRAME_SIZE, TRANSFER_SENTINEL};
use crate::error::{LinkError, Result};

/// Read cap for telemetry-class transfers.
pub const WOD_READ_CAP: usize = 10;

/// Extra reads allowed on top of the packets an image needs.
const IMAGE_SLACK_READS: usize = 2;

/// What kind of payload a transfer carries; decides its read cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    /// WOD and other small fixed records.
    Telemetry,
    /// Image pixels; stops once `expected_len` bytes are in.
    Image { expected_len: usize },
}

impl TransferKind {
    /// Maximum number of physical reads for this transfer.
    pub fn read_cap(&self) -> usize {
        match *self {
            TransferKind::Telemetry => WOD_READ_CAP,
            TransferKind::Image { expected_len } => {
                (expected_len.div_ceil(CHUNK_SIZE) + IMAGE_SLACK_READS).min(MAX_PACKETS)
            }
        }
    }

    fn length_cap(&self) -> Option<usize> {
        match *self {
            TransferKind::Telemetry => None,
            TransferKind::Image { expected_len } => Some(expected_len),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Receiving,
    Complete,
}

/// Accumulates the information packets of one announced message.
#[derive(Debug)]
pub struct Reassembler {
    kind: TransferKind,
    buffer: BytesMut,
    state: State,
    received: usize,
    reads: usize,
    cut_short: bool,
}

impl Reassembler {
    pub fn new(kind: TransferKind) -> Self {
        let capacity = kind.length_cap().unwrap_or(WOD_READ_CAP * CHUNK_SIZE);
        Self {
            kind,
            buffer: BytesMut::with_capacity(capacity.min(MAX_PACKETS * CHUNK_SIZE)),
            state: State::Receiving,
            received: 0,
            reads: 0,
            cut_short: false,
        }
    }

    /// Feed one physical read from the link (receive envelope included).
    ///
    /// Returns `Ok(Some(bytes))` once the transfer is complete, `Ok(None)`
    /// while more reads are needed.
    pub fn push_read(&mut self, data: &[u8]) -> Result<Option<Bytes>> {
        if self.state == State::Complete {
            return Ok(Some(self.buffer.clone().freeze()));
        }
        self.reads += 1;

        if data.len() < FRAME_SIZE {
            tracing::debug!(
                "Short read ({} bytes) after {} packets, ending transfer",
                data.len(),
                self.received
            );
            self.cut_short = true;
            return Ok(Some(self.finish()));
        }

        match ReceiveEnvelope::parse(data) {
            Ok(env) if env.frame.raw().starts_with(&TRANSFER_SENTINEL) => {
                tracing::debug!("Transfer sentinel after {} packets", self.received);
                return Ok(Some(self.finish()));
            }
            Ok(env) => match InformationPacket::decode(&env.frame) {
                Ok(packet) => {
                    if let Some(bytes) = self.push_packet(&packet) {
                        return Ok(Some(bytes));
                    }
                }
                Err(e) => tracing::debug!("Skipping undecodable information frame: {}", e),
            },
            Err(e) => tracing::debug!("Skipping malformed read during transfer: {}", e),
        }

        if self.reads >= self.kind.read_cap() {
            return Err(self.incomplete());
        }
        Ok(None)
    }

    /// Append one decoded packet. Returns the payload once complete.
    pub fn push_packet(&mut self, packet: &InformationPacket) -> Option<Bytes> {
        if self.state == State::Complete {
            return Some(self.buffer.clone().freeze());
        }

        self.buffer.extend_from_slice(&packet.chunk);
        self.received += 1;

        let length_reached = self
            .kind
            .length_cap()
            .is_some_and(|cap| self.buffer.len() >= cap);
        if packet.is_last() || length_reached {
            return Some(self.finish());
        }
        None
    }

    fn finish(&mut self) -> Bytes {
        self.state = State::Complete;
        if let Some(cap) = self.kind.length_cap() {
            self.buffer.truncate(cap);
        }
        self.buffer.clone().freeze()
    }

    fn incomplete(&self) -> LinkError {
        LinkError::IncompleteTransfer {
            received: self.received,
            reads: self.reads,
        }
    }

    /// Number of physical reads consumed so far.
    pub fn reads(&self) -> usize {
        self.reads
    }

    /// Number of information packets accepted so far.
    pub fn received(&self) -> usize {
        self.received
    }

    pub fn is_complete(&self) -> bool {
        self.state == State::Complete
    }

    /// Whether a short read ended the transfer before its last packet.
    pub fn cut_short(&self) -> bool {
        self.cut_short
    }
}

impl InformationPacket {
    /// Concatenate chunks in arrival order up to and including countdown 0.
    ///
    /// Fails with `IncompleteTransfer` if the sequence ends first.
    pub fn reassemble<I>(packets: I) -> Result<Bytes>
    where
        I: IntoIterator<Item = InformationPacket>,
    {
        let mut out = BytesMut::new();
        let mut received = 0;
        for packet in packets {
            out.extend_from_slice(&packet.chunk);
            received += 1;
            if packet.is_last() {
                return Ok(out.freeze());
            }
        }
        Err(LinkError::IncompleteTransfer {
            received,
            reads: received,
        })
    }
}
