//! Ground-station commands.
//!
//! A command rides in the body of a `GroundStationCommand` header packet:
//! one code byte followed by little-endian arguments.
//!
//! | Command | Arguments |
//! |---|---|
//! | `RequestScienceImage` | camera u8, resume_packet i16, packets_to_send i16, timestamp u32 |
//! | `SetTime` | timestamp u32 |
//! | `SetOperatingMode` | mode u8 |
//! | everything else | none |

use crate::error::{LinkError, Result};
use crate::protocol::{Camera, CommandCode, HeaderPacket, MessageType, OperatingMode, StationId};
use crate::transfer::Transfer;

/// A decoded ground-station command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    RequestWod,
    RequestScienceImage {
        camera: Camera,
        resume_packet: i16,
        packets_to_send: i16,
        timestamp: u32,
    },
    RequestScienceThermoAndCurrent,
    SendPing,
    RequestTime,
    SetTime {
        timestamp: u32,
    },
    SetOperatingMode {
        mode: OperatingMode,
    },
    ClearStorageData,
    ActivatePayloadStrikingMechanism,
    PerformScienceMeasurement,
}

impl Command {
    pub fn code(&self) -> CommandCode {
        match self {
            Command::RequestWod => CommandCode::RequestWod,
            Command::RequestScienceImage { .. } => CommandCode::RequestScienceImage,
            Command::RequestScienceThermoAndCurrent => CommandCode::RequestScienceThermoAndCurrent,
            Command::SendPing => CommandCode::SendPing,
            Command::RequestTime => CommandCode::RequestTime,
            Command::SetTime { .. } => CommandCode::SetTime,
            Command::SetOperatingMode { .. } => CommandCode::SetOperatingMode,
            Command::ClearStorageData => CommandCode::ClearStorageData,
            Command::ActivatePayloadStrikingMechanism => {
                CommandCode::ActivatePayloadStrikingMechanism
            }
            Command::PerformScienceMeasurement => CommandCode::PerformScienceMeasurement,
        }
    }

    /// Decode a command from a header packet body (code byte first).
    pub fn decode(body: &[u8]) -> Result<Self> {
        let mut args = Args::new(body);
        let code = CommandCode::try_from(args.u8()?)?;

        Ok(match code {
            CommandCode::RequestWod => Command::RequestWod,
            CommandCode::RequestScienceImage => Command::RequestScienceImage {
                camera: Camera::try_from(args.u8()?)?,
                resume_packet: args.i16()?,
                packets_to_send: args.i16()?,
                timestamp: args.u32()?,
            },
            CommandCode::RequestScienceThermoAndCurrent => Command::RequestScienceThermoAndCurrent,
            CommandCode::SendPing => Command::SendPing,
            CommandCode::RequestTime => Command::RequestTime,
            CommandCode::SetTime => Command::SetTime {
                timestamp: args.u32()?,
            },
            CommandCode::SetOperatingMode => Command::SetOperatingMode {
                mode: OperatingMode::try_from(args.u8()?)?,
            },
            CommandCode::ClearStorageData => Command::ClearStorageData,
            CommandCode::ActivatePayloadStrikingMechanism => {
                Command::ActivatePayloadStrikingMechanism
            }
            CommandCode::PerformScienceMeasurement => Command::PerformScienceMeasurement,
        })
    }

    /// Code byte followed by the arguments.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![self.code().code()];
        match *self {
            Command::RequestScienceImage {
                camera,
                resume_packet,
                packets_to_send,
                timestamp,
            } => {
                out.push(camera.code());
                out.extend_from_slice(&resume_packet.to_le_bytes());
                out.extend_from_slice(&packets_to_send.to_le_bytes());
                out.extend_from_slice(&timestamp.to_le_bytes());
            }
            Command::SetTime { timestamp } => out.extend_from_slice(&timestamp.to_le_bytes()),
            Command::SetOperatingMode { mode } => out.push(mode.code()),
            _ => {}
        }
        out
    }

    /// Header packet addressed to `target` carrying this command.
    pub fn to_header(&self, target: StationId) -> HeaderPacket {
        // Longest encoding is 10 bytes, well under the header body limit
        HeaderPacket {
            target,
            message_type: MessageType::GroundStationCommand,
            body: self.encode().into(),
        }
    }

    pub fn to_transfer(&self, target: StationId) -> Transfer {
        Transfer::header_only(self.to_header(target))
    }
}

/// Little-endian argument cursor.
struct Args<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Args<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes: [u8; N] = self
            .buf
            .get(self.pos..self.pos + N)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| {
                LinkError::InvalidArgument(format!(
                    "command body ends at {} bytes, need {} more at offset {}",
                    self.buf.len(),
                    N,
                    self.pos
                ))
            })?;
        self.pos += N;
        Ok(bytes)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take::<1>()?[0])
    }

    fn i16(&mut self) -> Result<i16> {
        Ok(i16::from_le_bytes(self.take()?))
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take()?))
    }
}
