//! Dispatcher module - what each end of the link does with a read.
//!
//! Provides:
//! - [`Command`] - ground-station commands and their argument encoding
//! - [`Dispatcher`] - satellite side; validates frames and runs commands
//! - [`GroundDecoder`] - ground side; decodes replies into [`Downlink`]s
//! - [`SatelliteServices`] - data sources and actions behind the commands
//!
//! # Example
//!
//! ```ignore
//! use obc_link::dispatcher::{Dispatcher, FsPayloadStore};
//!
//! let mut dispatcher = Dispatcher::new(station_id, ground_id, FsPayloadStore::new("/var/obc"));
//! for item in dispatcher.handle_read(&read).into_replies() {
//!     writer.send(item).await?;
//! }
//! ```

mod command;
mod ground;
mod satellite;
mod services;

pub use command::Command;
pub use ground::{Downlink, GroundDecoder};
pub use satellite::{Dispatcher, Outcome, Stage};
pub use services::{
    FsPayloadStore, MissionClock, SatelliteServices, LEFT_IMAGE_FILE, RIGHT_IMAGE_FILE,
    SCIENCE_FILE, WOD_FILE,
};
