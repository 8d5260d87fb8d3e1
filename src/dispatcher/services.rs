//! Collaborators the satellite dispatcher acts through.
//!
//! The dispatcher only knows how to answer commands; where telemetry and
//! images come from, and what the payload hardware does, sits behind
//! [`SatelliteServices`]. [`FsPayloadStore`] is the file-backed
//! implementation used on the flight computer.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::codec::{ImageFixture, ThermoCurrentReading, WodRecord};
use crate::error::Result;
use crate::protocol::Camera;

/// Latest WOD record.
pub const WOD_FILE: &str = "wod.bin";
/// Stored image from the left camera.
pub const LEFT_IMAGE_FILE: &str = "left.bin";
/// Stored image from the right camera.
pub const RIGHT_IMAGE_FILE: &str = "right.bin";
/// Latest payload temperature and current reading.
pub const SCIENCE_FILE: &str = "science.bin";

/// Actions and data sources behind the ground-station commands.
///
/// Every method may fail; the dispatcher reports the failure to the ground
/// station and keeps running.
pub trait SatelliteServices: Send + 'static {
    /// Most recent 32-minute WOD record.
    fn latest_wod(&mut self) -> Result<WodRecord>;

    /// Most recent image taken by `camera`.
    fn load_image(&mut self, camera: Camera) -> Result<ImageFixture>;

    fn thermo_and_current(&mut self) -> Result<ThermoCurrentReading>;

    /// Erase stored telemetry.
    fn clear_storage(&mut self) -> Result<()>;

    fn activate_strike(&mut self) -> Result<()>;

    fn perform_measurement(&mut self) -> Result<()>;

    /// Called after the mission clock was set from the ground.
    fn time_set(&mut self, _timestamp: u32) {}
}

impl<S: SatelliteServices + ?Sized> SatelliteServices for Box<S> {
    fn latest_wod(&mut self) -> Result<WodRecord> {
        (**self).latest_wod()
    }

    fn load_image(&mut self, camera: Camera) -> Result<ImageFixture> {
        (**self).load_image(camera)
    }

    fn thermo_and_current(&mut self) -> Result<ThermoCurrentReading> {
        (**self).thermo_and_current()
    }

    fn clear_storage(&mut self) -> Result<()> {
        (**self).clear_storage()
    }

    fn activate_strike(&mut self) -> Result<()> {
        (**self).activate_strike()
    }

    fn perform_measurement(&mut self) -> Result<()> {
        (**self).perform_measurement()
    }

    fn time_set(&mut self, timestamp: u32) {
        (**self).time_set(timestamp)
    }
}

/// Mission clock in seconds since 2000-01-01.
///
/// Starts at 0 and is only changed by `SetTime`. Clones share the value.
#[derive(Debug, Clone, Default)]
pub struct MissionClock {
    seconds: Arc<AtomicU32>,
}

impl MissionClock {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self) -> u32 {
        self.seconds.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set(&self, seconds: u32) {
        self.seconds.store(seconds, Ordering::Release);
    }
}

/// Services backed by files in one storage directory.
#[derive(Debug, Clone)]
pub struct FsPayloadStore {
    root: PathBuf,
}

impl FsPayloadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl SatelliteServices for FsPayloadStore {
    fn latest_wod(&mut self) -> Result<WodRecord> {
        let data = std::fs::read(self.path(WOD_FILE))?;
        WodRecord::decode(&data)
    }

    fn load_image(&mut self, camera: Camera) -> Result<ImageFixture> {
        let name = match camera {
            Camera::Left => LEFT_IMAGE_FILE,
            Camera::Right => RIGHT_IMAGE_FILE,
        };
        ImageFixture::load(self.path(name))
    }

    fn thermo_and_current(&mut self) -> Result<ThermoCurrentReading> {
        let data = std::fs::read(self.path(SCIENCE_FILE))?;
        ThermoCurrentReading::decode(&data)
    }

    fn clear_storage(&mut self) -> Result<()> {
        match std::fs::remove_file(self.path(WOD_FILE)) {
            Ok(()) => {
                tracing::info!("Cleared stored telemetry in {}", self.root.display());
                Ok(())
            }
            // Nothing stored is already clear
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn activate_strike(&mut self) -> Result<()> {
        tracing::info!("Payload striking mechanism activated");
        Ok(())
    }

    fn perform_measurement(&mut self) -> Result<()> {
        tracing::info!("Science measurement started");
        Ok(())
    }

    fn time_set(&mut self, timestamp: u32) {
        tracing::info!(
            "Mission clock set to {} (unix {})",
            timestamp,
            crate::epoch::to_unix(timestamp)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::WodSample;
    use crate::error::LinkError;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("obc-link-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_clock_shared_between_clones() {
        let clock = MissionClock::new();
        assert_eq!(clock.get(), 0);
        let other = clock.clone();
        other.set(769_345_217);
        assert_eq!(clock.get(), 769_345_217);
    }

    #[test]
    fn test_store_reads_wod() {
        let dir = scratch_dir("wod");
        let record = WodRecord {
            epoch_timestamp: 1000,
            samples: [WodSample {
                mode: 1,
                bat_voltage: 200,
                ..WodSample::default()
            }; 32],
        };
        std::fs::write(dir.join(WOD_FILE), record.encode()).unwrap();

        let mut store = FsPayloadStore::new(&dir);
        assert_eq!(store.latest_wod().unwrap(), record);

        store.clear_storage().unwrap();
        assert!(!dir.join(WOD_FILE).exists());
        // Clearing twice is fine
        store.clear_storage().unwrap();
        assert!(matches!(store.latest_wod(), Err(LinkError::Io(_))));
    }

    #[test]
    fn test_store_reads_images_per_camera() {
        let dir = scratch_dir("images");
        let left = ImageFixture {
            width: 2,
            height: 2,
            pixels: vec![1, 2, 3, 4].into(),
        };
        std::fs::write(dir.join(LEFT_IMAGE_FILE), left.to_bytes()).unwrap();

        let mut store = FsPayloadStore::new(&dir);
        assert_eq!(store.load_image(Camera::Left).unwrap(), left);
        assert!(store.load_image(Camera::Right).is_err());
    }

    #[test]
    fn test_store_reads_science() {
        let dir = scratch_dir("science");
        let reading = ThermoCurrentReading {
            temperature_centi_c: -1250,
            current_10ua: 300,
        };
        std::fs::write(dir.join(SCIENCE_FILE), reading.encode()).unwrap();

        let mut store = FsPayloadStore::new(&dir);
        assert_eq!(store.thermo_and_current().unwrap(), reading);
        assert!(store.activate_strike().is_ok());
        assert!(store.perform_measurement().is_ok());
    }
}
