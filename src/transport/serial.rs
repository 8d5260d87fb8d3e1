//! Serial port to the transceiver.
//!
//! # Example
//!
//! ```ignore
//! use obc_link::config::LinkConfig;
//! use obc_link::transport::open_serial;
//!
//! let config = LinkConfig::default();
//! let port = open_serial(&config)?;
//! ```

use tokio_serial::{SerialPortBuilderExt, SerialStream};

use crate::config::LinkConfig;
use crate::error::{LinkError, Result};

/// Async serial stream to the transceiver.
pub type SerialLink = SerialStream;

/// Open the UART named in `config`.
///
/// Fails with `LinkUnavailable` if the device cannot be opened; callers must
/// not fall back to running without a link. Must be called from within a
/// tokio runtime.
pub fn open_serial(config: &LinkConfig) -> Result<SerialLink> {
    tokio_serial::new(config.port.as_str(), config.baud_rate)
        .timeout(config.read_timeout())
        .open_native_async()
        .map_err(|e| LinkError::LinkUnavailable(format!("{}: {}", config.port, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_device_is_unavailable() {
        let config = LinkConfig {
            port: "/dev/obc-link-does-not-exist".to_string(),
            ..LinkConfig::default()
        };
        let err = open_serial(&config).unwrap_err();
        assert!(matches!(err, LinkError::LinkUnavailable(_)));
        assert!(err.to_string().contains("/dev/obc-link-does-not-exist"));
    }
}
