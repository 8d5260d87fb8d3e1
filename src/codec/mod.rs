//! Codec module - fixed-layout payloads carried over the link.
//!
//! - [`WodRecord`] - Whole-Orbit-Data telemetry (260 bytes)
//! - [`ImageTransfer`] / [`ImageHeader`] - greyscale science images
//! - [`ThermoCurrentReading`] - payload temperature and current
//!
//! # Example
//!
//! ```
//! use obc_link::codec::{WodRecord, WOD_RECORD_SIZE};
//!
//! let bytes = [0u8; WOD_RECORD_SIZE];
//! let record = WodRecord::decode(&bytes).unwrap();
//! assert_eq!(record.samples.len(), 32);
//! assert_eq!(record.encode(), bytes);
//! ```

mod image;
mod science;
mod wod;

pub use image::{
    decode_pixels, pixel_count, ImageFixture, ImageHeader, ImageTransfer, FIXTURE_HEADER_SIZE,
    IMAGE_HEADER_SIZE,
};
pub use science::{ThermoCurrentReading, THERMO_CURRENT_SIZE};
pub use wod::{
    TelemetryRow, WodRecord, WodSample, INVALID_MODE, WOD_RECORD_SIZE, WOD_SAMPLES,
    WOD_SAMPLE_PERIOD, WOD_SAMPLE_SIZE,
};
