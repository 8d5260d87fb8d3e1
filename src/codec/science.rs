//! Payload temperature and current reading.
//!
//! Sent as the body of a `ScienceThermoAndCurrent` header packet:
//! i16 temperature in centi-degrees Celsius, then u16 current in 10 µA
//! steps, both little endian.

use crate::error::{LinkError, Result};

/// Encoded reading size.
pub const THERMO_CURRENT_SIZE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThermoCurrentReading {
    /// Hundredths of a degree Celsius.
    pub temperature_centi_c: i16,
    /// Tens of microamps.
    pub current_10ua: u16,
}

impl ThermoCurrentReading {
    pub fn encode(&self) -> [u8; THERMO_CURRENT_SIZE] {
        let t = self.temperature_centi_c.to_le_bytes();
        let c = self.current_10ua.to_le_bytes();
        [t[0], t[1], c[0], c[1]]
    }

    pub fn decode(body: &[u8]) -> Result<Self> {
        if body.len() < THERMO_CURRENT_SIZE {
            return Err(LinkError::FrameTooShort {
                got: body.len(),
                need: THERMO_CURRENT_SIZE,
            });
        }
        Ok(Self {
            temperature_centi_c: i16::from_le_bytes([body[0], body[1]]),
            current_10ua: u16::from_le_bytes([body[2], body[3]]),
        })
    }

    pub fn temperature_celsius(&self) -> f32 {
        self.temperature_centi_c as f32 / 100.0
    }

    pub fn current_amps(&self) -> f32 {
        self.current_10ua as f32 * 1e-5
    }
}
