//! Greyscale science images.
//!
//! An image travels as an [`ImageHeader`] in the header packet body followed
//! by the raw 8-bit pixels, row-major, chunked into information packets.
//! The last chunk is zero padded on the wire, so the receiver truncates the
//! reassembled stream to `width * height`.
//!
//! Header body layout (11 bytes, little endian):
//! ```text
//! ┌────────┬───────┬────────┬─────────────┬──────────────┐
//! │ camera │ width │ height │ captured_at │ start_packet │
//! │ u8     │ i16   │ i16    │ u32         │ i16          │
//! └────────┴───────┴────────┴─────────────┴──────────────┘
//! ```
//!
//! Stored fixtures on the satellite use a different layout: two u32
//! (width, height) followed by the pixels.

use std::path::Path;

use bytes::Bytes;

use crate::error::{LinkError, Result};
use crate::protocol::Camera;

/// Encoded [`ImageHeader`] size.
pub const IMAGE_HEADER_SIZE: usize = 11;

/// Stored fixture header size.
pub const FIXTURE_HEADER_SIZE: usize = 8;

/// Metadata announced ahead of an image's pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHeader {
    pub camera: Camera,
    pub width: i16,
    pub height: i16,
    /// Mission seconds.
    pub captured_at: u32,
    /// Number of leading packets skipped when resuming.
    pub start_packet: i16,
}

impl ImageHeader {
    pub fn encode(&self) -> [u8; IMAGE_HEADER_SIZE] {
        let mut out = [0u8; IMAGE_HEADER_SIZE];
        out[0] = self.camera.code();
        out[1..3].copy_from_slice(&self.width.to_le_bytes());
        out[3..5].copy_from_slice(&self.height.to_le_bytes());
        out[5..9].copy_from_slice(&self.captured_at.to_le_bytes());
        out[9..11].copy_from_slice(&self.start_packet.to_le_bytes());
        out
    }

    pub fn decode(body: &[u8]) -> Result<Self> {
        if body.len() < IMAGE_HEADER_SIZE {
            return Err(LinkError::FrameTooShort {
                got: body.len(),
                need: IMAGE_HEADER_SIZE,
            });
        }
        Ok(Self {
            camera: Camera::try_from(body[0])?,
            width: i16::from_le_bytes([body[1], body[2]]),
            height: i16::from_le_bytes([body[3], body[4]]),
            captured_at: u32::from_le_bytes([body[5], body[6], body[7], body[8]]),
            start_packet: i16::from_le_bytes([body[9], body[10]]),
        })
    }

    /// Number of pixels the header announces.
    pub fn pixel_count(&self) -> Result<usize> {
        pixel_count(self.width, self.height)
    }
}

/// `width * height`, rejecting negative dimensions.
pub fn pixel_count(width: i16, height: i16) -> Result<usize> {
    if width < 0 || height < 0 {
        return Err(LinkError::InvalidArgument(format!(
            "image dimensions {}x{}",
            width, height
        )));
    }
    Ok(width as usize * height as usize)
}

/// Truncate a reassembled stream to exactly `width * height` pixels.
pub fn decode_pixels(bytes: &[u8], width: i16, height: i16) -> Result<Bytes> {
    let expected = pixel_count(width, height)?;
    if bytes.len() < expected {
        return Err(LinkError::ImageSizeMismatch {
            expected,
            got: bytes.len(),
        });
    }
    Ok(Bytes::copy_from_slice(&bytes[..expected]))
}

/// A received greyscale image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageTransfer {
    pub camera: Camera,
    pub width: i16,
    pub height: i16,
    pub captured_at: u32,
    pub start_packet: i16,
    /// Row-major 8-bit pixels, exactly `width * height` long.
    pub pixels: Bytes,
}

impl ImageTransfer {
    /// Combine a header with the reassembled pixel stream.
    pub fn from_parts(header: ImageHeader, stream: &[u8]) -> Result<Self> {
        let pixels = decode_pixels(stream, header.width, header.height)?;
        Ok(Self {
            camera: header.camera,
            width: header.width,
            height: header.height,
            captured_at: header.captured_at,
            start_packet: header.start_packet,
            pixels,
        })
    }

    pub fn header(&self) -> ImageHeader {
        ImageHeader {
            camera: self.camera,
            width: self.width,
            height: self.height,
            captured_at: self.captured_at,
            start_packet: self.start_packet,
        }
    }

    /// Pixels of row `y`, if it exists.
    pub fn row(&self, y: usize) -> Option<&[u8]> {
        let w = self.width.max(0) as usize;
        if y >= self.height.max(0) as usize {
            return None;
        }
        self.pixels.get(y * w..(y + 1) * w)
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.width.max(0) as usize {
            return None;
        }
        self.row(y).map(|row| row[x])
    }
}

/// A greyscale image stored on the satellite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFixture {
    pub width: u32,
    pub height: u32,
    pub pixels: Bytes,
}

impl ImageFixture {
    /// Parse the stored layout: u32 width, u32 height, pixels.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < FIXTURE_HEADER_SIZE {
            return Err(LinkError::ImageSizeMismatch {
                expected: FIXTURE_HEADER_SIZE,
                got: data.len(),
            });
        }
        let width = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        let height = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
        let expected = width as usize * height as usize;
        let pixels = &data[FIXTURE_HEADER_SIZE..];
        if pixels.len() < expected {
            return Err(LinkError::ImageSizeMismatch {
                expected,
                got: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels: Bytes::copy_from_slice(&pixels[..expected]),
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(FIXTURE_HEADER_SIZE + self.pixels.len());
        out.extend_from_slice(&self.width.to_le_bytes());
        out.extend_from_slice(&self.height.to_le_bytes());
        out.extend_from_slice(&self.pixels);
        out
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(&data)
    }

    /// Header for downlinking this image; dimensions must fit an i16.
    pub fn header(&self, camera: Camera, captured_at: u32, start_packet: i16) -> Result<ImageHeader> {
        let dim = |v: u32| {
            i16::try_from(v)
                .map_err(|_| LinkError::InvalidArgument(format!("image dimension {}", v)))
        };
        Ok(ImageHeader {
            camera,
            width: dim(self.width)?,
            height: dim(self.height)?,
            captured_at,
            start_packet,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{InformationPacket, MessageType, CHUNK_SIZE};

    #[test]
    fn test_header_layout() {
        let header = ImageHeader {
            camera: Camera::Right,
            width: 100,
            height: 80,
            captured_at: 769_345_217,
            start_packet: 3,
        };
        let bytes = header.encode();
        assert_eq!(bytes[0], 1);
        assert_eq!(&bytes[1..3], &100i16.to_le_bytes());
        assert_eq!(&bytes[3..5], &80i16.to_le_bytes());
        assert_eq!(&bytes[5..9], &769_345_217u32.to_le_bytes());
        assert_eq!(&bytes[9..11], &3i16.to_le_bytes());
        assert_eq!(ImageHeader::decode(&bytes).unwrap(), header);
        assert_eq!(header.pixel_count().unwrap(), 8000);
    }

    #[test]
    fn test_header_decode_short() {
        assert!(ImageHeader::decode(&[0u8; 10]).is_err());
    }

    #[test]
    fn test_decode_pixels_truncates_padding() {
        // 10x10 image: 2 chunks, the second only 39/61 full
        let pixels: Vec<u8> = (0..100).map(|i| i as u8).collect();
        let packets = InformationPacket::split(MessageType::ScienceImage, &pixels).unwrap();
        let mut stream = Vec::new();
        for p in &packets {
            stream.extend_from_slice(&p.encode()[3..]);
        }
        assert_eq!(stream.len(), 2 * CHUNK_SIZE);

        let decoded = decode_pixels(&stream, 10, 10).unwrap();
        assert_eq!(decoded.len(), 100);
        assert_eq!(&decoded[..], &pixels[..]);
    }

    #[test]
    fn test_decode_pixels_too_few() {
        assert!(matches!(
            decode_pixels(&[0u8; 99], 10, 10),
            Err(LinkError::ImageSizeMismatch {
                expected: 100,
                got: 99
            })
        ));
    }

    #[test]
    fn test_decode_pixels_negative_dimension() {
        assert!(matches!(
            decode_pixels(&[0u8; 10], -1, 10),
            Err(LinkError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_transfer_rows() {
        let header = ImageHeader {
            camera: Camera::Left,
            width: 3,
            height: 2,
            captured_at: 0,
            start_packet: 0,
        };
        let image = ImageTransfer::from_parts(header, &[1, 2, 3, 4, 5, 6, 0, 0]).unwrap();
        assert_eq!(image.row(0), Some(&[1u8, 2, 3][..]));
        assert_eq!(image.row(1), Some(&[4u8, 5, 6][..]));
        assert_eq!(image.row(2), None);
        assert_eq!(image.pixel(2, 1), Some(6));
        assert_eq!(image.pixel(3, 0), None);
        assert_eq!(image.header(), header);
    }

    #[test]
    fn test_fixture_round_trip() {
        let fixture = ImageFixture {
            width: 4,
            height: 2,
            pixels: Bytes::from_static(&[9, 8, 7, 6, 5, 4, 3, 2]),
        };
        let bytes = fixture.to_bytes();
        assert_eq!(&bytes[..8], &[4, 0, 0, 0, 2, 0, 0, 0]);
        assert_eq!(ImageFixture::from_bytes(&bytes).unwrap(), fixture);
    }

    #[test]
    fn test_fixture_short() {
        let mut bytes = vec![4, 0, 0, 0, 2, 0, 0, 0];
        bytes.extend_from_slice(&[1, 2, 3]);
        assert!(matches!(
            ImageFixture::from_bytes(&bytes),
            Err(LinkError::ImageSizeMismatch { expected: 8, got: 3 })
        ));
        assert!(ImageFixture::from_bytes(&[1, 2]).is_err());
    }

    #[test]
    fn test_fixture_header_dimension_limit() {
        let fixture = ImageFixture {
            width: 40_000,
            height: 1,
            pixels: Bytes::new(),
        };
        assert!(fixture.header(Camera::Left, 0, 0).is_err());
    }
}
