//! Link configuration.
//!
//! Every field has a default matching the flight OBC, so a config file only
//! needs to list what differs:
//!
//! ```
//! use obc_link::config::LinkConfig;
//!
//! let config = LinkConfig::from_json_str(r#"{ "port": "/dev/ttyUSB0", "channel": 3 }"#).unwrap();
//! assert_eq!(config.port, "/dev/ttyUSB0");
//! assert_eq!(config.channel, 3);
//! assert_eq!(config.baud_rate, 19200);
//! assert_eq!(config.station_id.to_string(), "CUBE");
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{LinkError, Result};
use crate::protocol::{StationId, FRAME_SIZE, MAX_CHANNEL};
use crate::writer::WriterConfig;

/// Default UART device.
pub const DEFAULT_PORT: &str = "/dev/ttyS4";

/// Default baud rate.
pub const DEFAULT_BAUD_RATE: u32 = 19200;

/// Default per-read timeout.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Quiet gap that ends one burst of pending bytes.
pub const DEFAULT_INTER_BYTE_GAP: Duration = Duration::from_millis(20);

/// Default satellite station identifier.
pub const DEFAULT_STATION_ID: StationId = StationId::new(*b"CUBE");

/// Default payload storage directory on the satellite.
pub const DEFAULT_STORAGE_DIR: &str = "storage";

/// Default ground station identifier.
pub const DEFAULT_GROUND_STATION_ID: StationId = StationId::new(*b"GRND");

/// Settings for one end of the link.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Serial device path.
    pub port: String,
    pub baud_rate: u32,
    /// Upper bound on one physical read, in milliseconds.
    pub read_timeout_ms: u64,
    /// Quiet gap that ends a burst, in milliseconds.
    pub inter_byte_gap_ms: u64,
    /// Transceiver channel (0-15).
    pub channel: u8,
    /// Transceiver packet length (1-64).
    pub packet_length: u8,
    /// This satellite's address.
    pub station_id: StationId,
    /// Address replies are sent to.
    pub ground_station_id: StationId,
    /// Directory holding stored telemetry and images.
    pub storage_dir: PathBuf,
    /// Writer task settings.
    pub writer: WriterSettings,
}

/// Serializable part of [`WriterConfig`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WriterSettings {
    pub channel_capacity: usize,
    pub inter_packet_delay_ms: u64,
}

impl Default for WriterSettings {
    fn default() -> Self {
        let defaults = WriterConfig::default();
        Self {
            channel_capacity: defaults.channel_capacity,
            inter_packet_delay_ms: defaults.inter_packet_delay.as_millis() as u64,
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: DEFAULT_READ_TIMEOUT.as_millis() as u64,
            inter_byte_gap_ms: DEFAULT_INTER_BYTE_GAP.as_millis() as u64,
            channel: 0,
            packet_length: FRAME_SIZE as u8,
            station_id: DEFAULT_STATION_ID,
            ground_station_id: DEFAULT_GROUND_STATION_ID,
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            writer: WriterSettings::default(),
        }
    }
}

impl LinkConfig {
    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Check values against the transceiver's limits.
    pub fn validate(&self) -> Result<()> {
        if self.channel > MAX_CHANNEL {
            return Err(LinkError::InvalidArgument(format!(
                "channel {} exceeds {}",
                self.channel, MAX_CHANNEL
            )));
        }
        if self.packet_length == 0 || self.packet_length as usize > FRAME_SIZE {
            return Err(LinkError::InvalidArgument(format!(
                "packet length {} outside 1-{}",
                self.packet_length, FRAME_SIZE
            )));
        }
        if self.read_timeout_ms == 0 {
            return Err(LinkError::InvalidArgument(
                "read timeout must be non-zero".to_string(),
            ));
        }
        if self.inter_byte_gap_ms == 0 {
            return Err(LinkError::InvalidArgument(
                "inter-byte gap must be non-zero".to_string(),
            ));
        }
        if self.writer.channel_capacity == 0 {
            return Err(LinkError::InvalidArgument(
                "writer channel capacity must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    #[inline]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    #[inline]
    pub fn inter_byte_gap(&self) -> Duration {
        Duration::from_millis(self.inter_byte_gap_ms)
    }

    pub fn writer_config(&self) -> WriterConfig {
        WriterConfig {
            channel: self.channel,
            channel_capacity: self.writer.channel_capacity,
            inter_packet_delay: Duration::from_millis(self.writer.inter_packet_delay_ms),
        }
    }
}
