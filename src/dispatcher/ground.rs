//! Ground-station side: turns downlinked reads into decoded messages.
//!
//! The ground station listens to everything on its channel, so there is no
//! address filter here. Header packets that announce a chunked payload
//! (WOD, images) switch the decoder into a receiving state until the
//! reassembler completes or gives up.

use bytes::Bytes;

use crate::codec::{ImageHeader, ImageTransfer, ThermoCurrentReading, WodRecord};
use crate::error::{LinkError, Result};
use crate::protocol::{
    HeaderPacket, MessageType, ReceiveEnvelope, Reassembler, TransferKind, CHUNK_SIZE,
};

/// A message decoded from the satellite.
#[derive(Debug, Clone, PartialEq)]
pub enum Downlink {
    Wod(WodRecord),
    /// Whole image, starting at the first pixel.
    Image(ImageTransfer),
    /// Part of an image from a resumed or limited request.
    ImagePart {
        header: ImageHeader,
        /// Pixel offset of `data` within the image.
        offset: usize,
        data: Bytes,
    },
    ThermoAndCurrent(ThermoCurrentReading),
    /// Mission clock value.
    Time(u32),
    Pong,
    /// Text the satellite sent after a failed command.
    Debug(String),
}

enum Pending {
    Wod,
    Image { header: ImageHeader, offset: usize },
}

enum State {
    Idle,
    Receiving {
        pending: Pending,
        reassembler: Reassembler,
    },
}

/// Decodes downlinked reads, one physical read at a time.
pub struct GroundDecoder {
    state: State,
}

impl Default for GroundDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl GroundDecoder {
    pub fn new() -> Self {
        Self { state: State::Idle }
    }

    /// Whether a chunked transfer is in progress.
    pub fn is_receiving(&self) -> bool {
        matches!(self.state, State::Receiving { .. })
    }

    /// Feed one read.
    ///
    /// Returns `Ok(None)` for empty or unusable reads and while a transfer
    /// is still arriving. An error ends the transfer in progress; the
    /// decoder is idle again afterwards.
    pub fn push_read(&mut self, data: &[u8]) -> Result<Option<Downlink>> {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::Idle => self.start(data),
            State::Receiving {
                pending,
                mut reassembler,
            } => match reassembler.push_read(data)? {
                Some(bytes) => finish(pending, &bytes, reassembler.cut_short()).map(Some),
                None => {
                    self.state = State::Receiving {
                        pending,
                        reassembler,
                    };
                    Ok(None)
                }
            },
        }
    }

    fn start(&mut self, data: &[u8]) -> Result<Option<Downlink>> {
        if data.is_empty() {
            return Ok(None);
        }
        let header = match ReceiveEnvelope::parse(data)
            .and_then(|envelope| HeaderPacket::decode(&envelope.frame))
        {
            Ok(header) => header,
            Err(e) if e.is_discard() => {
                tracing::debug!("Ignoring downlink read: {}", e);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let body = &header.body;
        let message = match header.message_type {
            MessageType::Pong => Downlink::Pong,
            MessageType::Time => Downlink::Time(read_u32(body)?),
            MessageType::ScienceThermoAndCurrent => {
                Downlink::ThermoAndCurrent(ThermoCurrentReading::decode(body)?)
            }
            MessageType::Debug => Downlink::Debug(debug_text(body)),
            MessageType::Wod => {
                self.receive(Pending::Wod, TransferKind::Telemetry);
                return Ok(None);
            }
            MessageType::ScienceImage => {
                let image = ImageHeader::decode(body)?;
                let offset = image.start_packet.max(0) as usize * CHUNK_SIZE;
                let expected_len = image.pixel_count()?.saturating_sub(offset);
                tracing::debug!(
                    "Image {}x{} announced, {} bytes from offset {}",
                    image.width,
                    image.height,
                    expected_len,
                    offset
                );
                self.receive(
                    Pending::Image {
                        header: image,
                        offset,
                    },
                    TransferKind::Image { expected_len },
                );
                return Ok(None);
            }
            MessageType::GroundStationCommand => {
                tracing::debug!("Ignoring command frame for {}", header.target);
                return Ok(None);
            }
        };
        Ok(Some(message))
    }

    fn receive(&mut self, pending: Pending, kind: TransferKind) {
        self.state = State::Receiving {
            pending,
            reassembler: Reassembler::new(kind),
        };
    }
}

/// Hand the reassembled bytes to the codec of the announced message.
///
/// A transfer ended by a short read must still hold the whole payload it
/// announced; a windowed image ended by its last packet may be partial.
fn finish(pending: Pending, bytes: &[u8], cut_short: bool) -> Result<Downlink> {
    match pending {
        Pending::Wod => Ok(Downlink::Wod(WodRecord::decode(bytes)?)),
        Pending::Image { header, offset } => {
            let total = header.pixel_count()?;
            if offset == 0 && (cut_short || bytes.len() >= total) {
                return Ok(Downlink::Image(ImageTransfer::from_parts(header, bytes)?));
            }
            let expected = total.saturating_sub(offset);
            if cut_short && bytes.len() < expected {
                return Err(LinkError::ImageSizeMismatch {
                    expected,
                    got: bytes.len(),
                });
            }
            Ok(Downlink::ImagePart {
                header,
                offset,
                data: Bytes::copy_from_slice(bytes),
            })
        }
    }
}

fn read_u32(body: &[u8]) -> Result<u32> {
    body.get(..4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_le_bytes)
        .ok_or(LinkError::FrameTooShort {
            got: body.len(),
            need: 4,
        })
}

/// Debug text up to the first NUL of the padded body.
fn debug_text(body: &[u8]) -> String {
    let end = body.iter().position(|&b| b == 0).unwrap_or(body.len());
    String::from_utf8_lossy(&body[..end]).into_owned()
}
