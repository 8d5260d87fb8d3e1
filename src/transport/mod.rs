//! Transport module - the physical link to the transceiver.
//!
//! Provides:
//! - opening the UART ([`open_serial`])
//! - bounded burst reads from any `AsyncRead` ([`LinkReader`])

mod reader;
mod serial;

pub use reader::{LinkReader, MAX_BURST};
pub use serial::{open_serial, SerialLink};
