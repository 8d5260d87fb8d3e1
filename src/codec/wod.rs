//! Whole-Orbit-Data telemetry record.
//!
//! Layout (260 bytes):
//! ```text
//! ┌───────────┬──────────────────────────────────────────────┐
//! │ timestamp │ 32 samples × 8 bytes                         │
//! │ u32 LE    │ mode, vbat, ibat, i3v3, i5v, tcomm, teps, tbat│
//! └───────────┴──────────────────────────────────────────────┘
//! ```
//! Sample `i` was taken `60 * i` seconds after the timestamp.

use serde::Serialize;

use crate::error::{LinkError, Result};

/// Samples per record.
pub const WOD_SAMPLES: usize = 32;

/// Bytes per sample.
pub const WOD_SAMPLE_SIZE: usize = 8;

/// Encoded record size.
pub const WOD_RECORD_SIZE: usize = 4 + WOD_SAMPLES * WOD_SAMPLE_SIZE;

/// Seconds between consecutive samples.
pub const WOD_SAMPLE_PERIOD: u32 = 60;

/// Mode value reported for anything other than 0 or 1.
pub const INVALID_MODE: i8 = -1;

/// One telemetry sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WodSample {
    /// 0 or 1, or -1 if the stored byte was out of range.
    pub mode: i8,
    pub bat_voltage: u8,
    pub bat_current: u8,
    pub bus_3v_current: u8,
    pub bus_5v_current: u8,
    pub temp_comm: u8,
    pub temp_eps: u8,
    pub temp_battery: u8,
}

impl WodSample {
    fn decode(b: &[u8]) -> Self {
        let mode = match b[0] {
            0 => 0,
            1 => 1,
            _ => INVALID_MODE,
        };
        Self {
            mode,
            bat_voltage: b[1],
            bat_current: b[2],
            bus_3v_current: b[3],
            bus_5v_current: b[4],
            temp_comm: b[5],
            temp_eps: b[6],
            temp_battery: b[7],
        }
    }

    fn encode(&self) -> [u8; WOD_SAMPLE_SIZE] {
        [
            self.mode as u8,
            self.bat_voltage,
            self.bat_current,
            self.bus_3v_current,
            self.bus_5v_current,
            self.temp_comm,
            self.temp_eps,
            self.temp_battery,
        ]
    }
}

/// One row of the telemetry persistence format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TelemetryRow {
    /// Mission seconds.
    pub time: u32,
    pub mode: i8,
    pub bat_voltage: u8,
    pub bat_current: u8,
    pub bus_3v_current: u8,
    pub bus_5v_current: u8,
    pub temp_comm: u8,
    pub temp_eps: u8,
    pub temp_battery: u8,
}

/// 32 minutes of housekeeping telemetry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WodRecord {
    /// Mission seconds of the first sample.
    pub epoch_timestamp: u32,
    pub samples: [WodSample; WOD_SAMPLES],
}

impl WodRecord {
    /// Decode the first 260 bytes of `bytes`; trailing chunk padding is ignored.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < WOD_RECORD_SIZE {
            return Err(LinkError::TruncatedWOD(bytes.len()));
        }

        let epoch_timestamp = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let mut samples = [WodSample::default(); WOD_SAMPLES];
        for (sample, raw) in samples
            .iter_mut()
            .zip(bytes[4..WOD_RECORD_SIZE].chunks_exact(WOD_SAMPLE_SIZE))
        {
            *sample = WodSample::decode(raw);
        }

        Ok(Self {
            epoch_timestamp,
            samples,
        })
    }

    pub fn encode(&self) -> [u8; WOD_RECORD_SIZE] {
        let mut out = [0u8; WOD_RECORD_SIZE];
        out[..4].copy_from_slice(&self.epoch_timestamp.to_le_bytes());
        for (i, sample) in self.samples.iter().enumerate() {
            let start = 4 + i * WOD_SAMPLE_SIZE;
            out[start..start + WOD_SAMPLE_SIZE].copy_from_slice(&sample.encode());
        }
        out
    }

    /// Mission time of sample `index`.
    #[inline]
    pub fn sample_time(&self, index: usize) -> u32 {
        self.epoch_timestamp
            .wrapping_add(WOD_SAMPLE_PERIOD.wrapping_mul(index as u32))
    }

    /// Rows for the telemetry persistence format, oldest first.
    pub fn rows(&self) -> impl Iterator<Item = TelemetryRow> + '_ {
        self.samples.iter().enumerate().map(|(i, s)| TelemetryRow {
            time: self.sample_time(i),
            mode: s.mode,
            bat_voltage: s.bat_voltage,
            bat_current: s.bat_current,
            bus_3v_current: s.bus_3v_current,
            bus_5v_current: s.bus_5v_current,
            temp_comm: s.temp_comm,
            temp_eps: s.temp_eps,
            temp_battery: s.temp_battery,
        })
    }
}
