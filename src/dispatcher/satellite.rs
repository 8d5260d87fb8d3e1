//! Satellite-side command dispatcher.
//!
//! Each physical read moves the dispatcher through
//!
//! ```text
//! Idle ─► FrameReceived ─► Validated ─► Dispatched ─► Idle
//! ```
//!
//! A frame is `FrameReceived` once the receive envelope parses, `Validated`
//! once its address matches this station and it carries a known
//! ground-station command, and `Dispatched` once the command has run.
//! Anything that fails before `Dispatched` is discarded with a log line and
//! leaves no other trace. Replies are returned to the caller as
//! [`Outbound`] items for the writer task.

use crate::codec::ImageHeader;
use crate::error::{LinkError, Result};
use crate::protocol::{
    HeaderPacket, MessageType, OperatingMode, ReceiveEnvelope, StationId, HEADER_BODY_MAX,
};
use crate::transceiver::TransceiverCommand;
use crate::transfer::Transfer;
use crate::writer::Outbound;

use super::command::Command;
use super::services::{MissionClock, SatelliteServices};

/// How far a frame got through validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    FrameReceived,
    Validated,
    Dispatched,
}

/// Result of feeding one read to the dispatcher.
#[derive(Debug)]
pub enum Outcome {
    /// The read was empty.
    Idle,
    /// The frame was dropped after reaching `stage`.
    Discarded { stage: Stage, reason: LinkError },
    /// The command ran; `replies` are ready to send in order.
    Handled {
        command: Command,
        replies: Vec<Outbound>,
    },
    /// The command's action failed; `replies` carry a debug report.
    Failed {
        command: Command,
        error: LinkError,
        replies: Vec<Outbound>,
    },
}

impl Outcome {
    pub fn replies(&self) -> &[Outbound] {
        match self {
            Outcome::Handled { replies, .. } | Outcome::Failed { replies, .. } => replies,
            _ => &[],
        }
    }

    pub fn into_replies(self) -> Vec<Outbound> {
        match self {
            Outcome::Handled { replies, .. } | Outcome::Failed { replies, .. } => replies,
            _ => Vec::new(),
        }
    }

    pub fn is_discarded(&self) -> bool {
        matches!(self, Outcome::Discarded { .. })
    }
}

/// Validates inbound frames and runs ground-station commands.
pub struct Dispatcher {
    station_id: StationId,
    ground_station_id: StationId,
    clock: MissionClock,
    mode: OperatingMode,
    stage: Stage,
    services: Box<dyn SatelliteServices>,
}

impl Dispatcher {
    pub fn new(
        station_id: StationId,
        ground_station_id: StationId,
        services: impl SatelliteServices,
    ) -> Self {
        Self {
            station_id,
            ground_station_id,
            clock: MissionClock::new(),
            mode: OperatingMode::default(),
            stage: Stage::Idle,
            services: Box::new(services),
        }
    }

    /// Share an existing mission clock instead of a fresh one.
    pub fn with_clock(mut self, clock: MissionClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn clock(&self) -> &MissionClock {
        &self.clock
    }

    /// Last operating mode commanded from the ground.
    pub fn operating_mode(&self) -> OperatingMode {
        self.mode
    }

    /// Stage reached by the most recent read.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Process one physical read from the link.
    pub fn handle_read(&mut self, data: &[u8]) -> Outcome {
        self.stage = Stage::Idle;
        if data.is_empty() {
            return Outcome::Idle;
        }

        let command = match self.validate(data) {
            Ok(command) => command,
            Err(reason) => {
                match reason {
                    LinkError::AddressMismatch { .. }
                    | LinkError::UnrecognizedMessageType(_)
                    | LinkError::UnrecognizedCommand(_) => {
                        tracing::warn!("Discarding frame at {:?}: {}", self.stage, reason)
                    }
                    _ => tracing::debug!("Discarding frame at {:?}: {}", self.stage, reason),
                }
                return Outcome::Discarded {
                    stage: self.stage,
                    reason,
                };
            }
        };

        tracing::info!("Received {:?}", command);
        let outcome = match self.execute(command) {
            Ok(replies) => Outcome::Handled { command, replies },
            Err(error) => {
                tracing::error!("{:?} failed: {}", command, error);
                let replies = vec![Outbound::Transfer(self.debug_report(command, &error))];
                Outcome::Failed {
                    command,
                    error,
                    replies,
                }
            }
        };
        self.stage = Stage::Dispatched;
        outcome
    }

    fn validate(&mut self, data: &[u8]) -> Result<Command> {
        let envelope = ReceiveEnvelope::parse(data)?;
        self.stage = Stage::FrameReceived;

        // Address is checked before anything else in the frame is trusted
        let raw = envelope.frame.raw();
        let target = StationId::new([raw[0], raw[1], raw[2], raw[3]]);
        if target != self.station_id {
            return Err(LinkError::AddressMismatch {
                expected: self.station_id.to_string(),
                found: target.to_string(),
            });
        }

        let header = HeaderPacket::decode(&envelope.frame)?;
        if header.message_type != MessageType::GroundStationCommand {
            return Err(LinkError::UnexpectedMessage(header.message_type));
        }
        let command = Command::decode(&header.body)?;
        self.stage = Stage::Validated;
        Ok(command)
    }

    fn execute(&mut self, command: Command) -> Result<Vec<Outbound>> {
        let ground = self.ground_station_id;
        let transfer = match command {
            Command::SendPing => Transfer::signal(ground, MessageType::Pong),
            Command::RequestWod => {
                let record = self.services.latest_wod()?;
                Transfer::chunked(
                    HeaderPacket::empty(ground, MessageType::Wod),
                    &record.encode(),
                )?
            }
            Command::RequestScienceImage {
                camera,
                resume_packet,
                packets_to_send,
                timestamp,
            } => {
                let image = self.services.load_image(camera)?;
                let start = resume_packet.max(0);
                let header = image.header(camera, timestamp, start)?;
                let limit = (packets_to_send > 0).then_some(packets_to_send as usize);
                tracing::debug!(
                    "Image {}x{} from packet {} (limit {:?})",
                    header.width,
                    header.height,
                    start,
                    limit
                );
                Transfer::chunked(image_header(ground, &header)?, &image.pixels)?
                    .window(start as usize, limit)
            }
            Command::RequestScienceThermoAndCurrent => {
                let reading = self.services.thermo_and_current()?;
                Transfer::header_only(HeaderPacket::new(
                    ground,
                    MessageType::ScienceThermoAndCurrent,
                    reading.encode().to_vec(),
                )?)
            }
            Command::RequestTime => Transfer::header_only(HeaderPacket::new(
                ground,
                MessageType::Time,
                self.clock.get().to_le_bytes().to_vec(),
            )?),
            Command::SetTime { timestamp } => {
                self.clock.set(timestamp);
                self.services.time_set(timestamp);
                return Ok(Vec::new());
            }
            Command::SetOperatingMode { mode } => {
                self.mode = mode;
                return Ok(vec![Outbound::Control(TransceiverCommand::SetMode(mode))]);
            }
            Command::ClearStorageData => {
                self.services.clear_storage()?;
                return Ok(Vec::new());
            }
            Command::ActivatePayloadStrikingMechanism => {
                self.services.activate_strike()?;
                return Ok(Vec::new());
            }
            Command::PerformScienceMeasurement => {
                self.services.perform_measurement()?;
                return Ok(Vec::new());
            }
        };
        Ok(vec![Outbound::Transfer(transfer)])
    }

    fn debug_report(&self, command: Command, error: &LinkError) -> Transfer {
        let mut text = format!("cmd {}: {}", command.code().code(), error);
        truncate_to_boundary(&mut text, HEADER_BODY_MAX);
        let body = text.into_bytes();
        let header = HeaderPacket {
            target: self.ground_station_id,
            message_type: MessageType::Debug,
            body: body.into(),
        };
        Transfer::header_only(header)
    }
}

fn image_header(ground: StationId, header: &ImageHeader) -> Result<HeaderPacket> {
    HeaderPacket::new(ground, MessageType::ScienceImage, header.encode().to_vec())
}

fn truncate_to_boundary(text: &mut String, max: usize) {
    if text.len() <= max {
        return;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{ImageFixture, ThermoCurrentReading, WodRecord, WodSample, WOD_RECORD_SIZE};
    use crate::protocol::{Camera, Frame, InformationPacket, CHUNK_SIZE, FRAME_SIZE};

    const CUBE: StationId = StationId::new(*b"CUBE");
    const GRND: StationId = StationId::new(*b"GRND");

    #[derive(Default)]
    struct FakeServices {
        image: Option<ImageFixture>,
        fail_strike: bool,
    }

    impl SatelliteServices for FakeServices {
        fn latest_wod(&mut self) -> Result<WodRecord> {
            Ok(WodRecord {
                epoch_timestamp: 766_772_417,
                samples: [WodSample {
                    mode: 1,
                    bat_voltage: 180,
                    ..WodSample::default()
                }; 32],
            })
        }

        fn load_image(&mut self, _camera: Camera) -> Result<ImageFixture> {
            self.image
                .clone()
                .ok_or_else(|| LinkError::Io(std::io::ErrorKind::NotFound.into()))
        }

        fn thermo_and_current(&mut self) -> Result<ThermoCurrentReading> {
            Ok(ThermoCurrentReading {
                temperature_centi_c: 2150,
                current_10ua: 42,
            })
        }

        fn clear_storage(&mut self) -> Result<()> {
            Ok(())
        }

        fn activate_strike(&mut self) -> Result<()> {
            if self.fail_strike {
                return Err(LinkError::InvalidArgument("strike interlock".to_string()));
            }
            Ok(())
        }

        fn perform_measurement(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn dispatcher(services: FakeServices) -> Dispatcher {
        Dispatcher::new(CUBE, GRND, services)
    }

    fn uplink(target: StationId, command: Command) -> Vec<u8> {
        let frame = command.to_header(target).to_frame(0).unwrap();
        ReceiveEnvelope::wrap(&frame, 90)
    }

    fn single_transfer(outcome: &Outcome) -> &Transfer {
        match outcome.replies() {
            [Outbound::Transfer(t)] => t,
            other => panic!("expected one transfer, got {:?}", other),
        }
    }

    #[test]
    fn test_ping_gets_pong() {
        let mut d = dispatcher(FakeServices::default());
        let outcome = d.handle_read(&uplink(CUBE, Command::SendPing));

        let reply = single_transfer(&outcome);
        assert_eq!(reply.header.target, GRND);
        assert_eq!(reply.message_type(), MessageType::Pong);
        assert!(reply.packets.is_empty());
        assert_eq!(d.stage(), Stage::Dispatched);
    }

    #[test]
    fn test_empty_read_is_idle() {
        let mut d = dispatcher(FakeServices::default());
        assert!(matches!(d.handle_read(&[]), Outcome::Idle));
        assert_eq!(d.stage(), Stage::Idle);
    }

    #[test]
    fn test_wod_request_reply() {
        let mut d = dispatcher(FakeServices::default());
        let outcome = d.handle_read(&uplink(CUBE, Command::RequestWod));

        let reply = single_transfer(&outcome);
        assert_eq!(reply.message_type(), MessageType::Wod);
        assert_eq!(reply.packets.len(), 5);
        let countdowns: Vec<u16> = reply.packets.iter().map(|p| p.countdown).collect();
        assert_eq!(countdowns, vec![4, 3, 2, 1, 0]);

        let bytes = InformationPacket::reassemble(reply.packets.clone()).unwrap();
        assert_eq!(bytes.len(), WOD_RECORD_SIZE);
        let record = WodRecord::decode(&bytes).unwrap();
        assert_eq!(record.epoch_timestamp, 766_772_417);
    }

    #[test]
    fn test_foreign_address_discarded_for_every_type() {
        let mut d = dispatcher(FakeServices::default());
        for code in 0u8..=255 {
            let mut payload = b"XXXX".to_vec();
            payload.push(code);
            payload.push(4);
            let frame = Frame::encode(0, &payload).unwrap();
            let outcome = d.handle_read(&ReceiveEnvelope::wrap(&frame, 10));
            match outcome {
                Outcome::Discarded {
                    stage: Stage::FrameReceived,
                    reason: LinkError::AddressMismatch { .. },
                } => {}
                other => panic!("type {} not discarded: {:?}", code, other),
            }
        }
        assert_eq!(d.clock().get(), 0);
    }

    #[test]
    fn test_time_request_before_set_is_zero() {
        let mut d = dispatcher(FakeServices::default());
        let outcome = d.handle_read(&uplink(CUBE, Command::RequestTime));
        let reply = single_transfer(&outcome);
        assert_eq!(reply.message_type(), MessageType::Time);
        assert_eq!(&reply.header.body[..], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_set_time_then_request() {
        let mut d = dispatcher(FakeServices::default());
        let outcome = d.handle_read(&uplink(
            CUBE,
            Command::SetTime {
                timestamp: 0x01020304,
            },
        ));
        assert!(outcome.replies().is_empty());
        assert!(matches!(outcome, Outcome::Handled { .. }));

        let outcome = d.handle_read(&uplink(CUBE, Command::RequestTime));
        let reply = single_transfer(&outcome);
        assert_eq!(&reply.header.body[..], &[4, 3, 2, 1]);
    }

    #[test]
    fn test_unknown_command_discarded() {
        let mut d = dispatcher(FakeServices::default());
        let frame = Frame::encode(0, b"CUBE\x04\x63").unwrap();
        let outcome = d.handle_read(&ReceiveEnvelope::wrap(&frame, 10));
        assert!(matches!(
            outcome,
            Outcome::Discarded {
                reason: LinkError::UnrecognizedCommand(0x63),
                ..
            }
        ));
    }

    #[test]
    fn test_non_command_message_discarded() {
        let mut d = dispatcher(FakeServices::default());
        let frame = Frame::encode(0, b"CUBE\x06").unwrap();
        let outcome = d.handle_read(&ReceiveEnvelope::wrap(&frame, 10));
        assert!(matches!(
            outcome,
            Outcome::Discarded {
                reason: LinkError::UnexpectedMessage(MessageType::Pong),
                ..
            }
        ));
    }

    #[test]
    fn test_short_read_discarded() {
        let mut d = dispatcher(FakeServices::default());
        let outcome = d.handle_read(&[b'#'; 12]);
        assert!(matches!(
            outcome,
            Outcome::Discarded {
                stage: Stage::Idle,
                reason: LinkError::FrameTooShort { .. },
            }
        ));
    }

    #[test]
    fn test_read_of_one_frame_length_dispatched() {
        let mut d = dispatcher(FakeServices::default());
        let mut read = b"#R\x40\x50CUBE\x04\x04".to_vec();
        read.resize(FRAME_SIZE, 0);

        let outcome = d.handle_read(&read);
        assert!(matches!(
            outcome,
            Outcome::Handled {
                command: Command::SendPing,
                ..
            }
        ));
        assert_eq!(single_transfer(&outcome).message_type(), MessageType::Pong);
    }

    #[test]
    fn test_set_operating_mode() {
        let mut d = dispatcher(FakeServices::default());
        let outcome = d.handle_read(&uplink(
            CUBE,
            Command::SetOperatingMode {
                mode: OperatingMode::Sleep,
            },
        ));
        assert_eq!(
            outcome.replies(),
            &[Outbound::Control(TransceiverCommand::SetMode(
                OperatingMode::Sleep
            ))]
        );
        assert_eq!(d.operating_mode(), OperatingMode::Sleep);
    }

    #[test]
    fn test_thermo_and_current_reply() {
        let mut d = dispatcher(FakeServices::default());
        let outcome = d.handle_read(&uplink(CUBE, Command::RequestScienceThermoAndCurrent));
        let reply = single_transfer(&outcome);
        let reading = ThermoCurrentReading::decode(&reply.header.body).unwrap();
        assert_eq!(reading.temperature_centi_c, 2150);
    }

    #[test]
    fn test_image_request_with_resume_window() {
        let pixels: Vec<u8> = (0..CHUNK_SIZE * 5).map(|i| (i % 251) as u8).collect();
        let services = FakeServices {
            image: Some(ImageFixture {
                width: CHUNK_SIZE as u32,
                height: 5,
                pixels: pixels.clone().into(),
            }),
            ..FakeServices::default()
        };
        let mut d = dispatcher(services);
        let outcome = d.handle_read(&uplink(
            CUBE,
            Command::RequestScienceImage {
                camera: Camera::Left,
                resume_packet: 2,
                packets_to_send: 2,
                timestamp: 77,
            },
        ));

        let reply = single_transfer(&outcome);
        let header = ImageHeader::decode(&reply.header.body).unwrap();
        assert_eq!(header.start_packet, 2);
        assert_eq!(header.captured_at, 77);
        assert_eq!(reply.packets.len(), 2);
        assert_eq!(reply.packets[0].countdown, 1);
        assert_eq!(&reply.packets[0].chunk[..], &pixels[2 * CHUNK_SIZE..3 * CHUNK_SIZE]);
    }

    #[test]
    fn test_image_resume_past_end_still_terminates() {
        let services = FakeServices {
            image: Some(ImageFixture {
                width: CHUNK_SIZE as u32,
                height: 2,
                pixels: vec![1u8; CHUNK_SIZE * 2].into(),
            }),
            ..FakeServices::default()
        };
        let mut d = dispatcher(services);
        let outcome = d.handle_read(&uplink(
            CUBE,
            Command::RequestScienceImage {
                camera: Camera::Left,
                resume_packet: 5,
                packets_to_send: 0,
                timestamp: 0,
            },
        ));

        let reply = single_transfer(&outcome);
        assert_eq!(reply.message_type(), MessageType::ScienceImage);
        assert_eq!(reply.packets.len(), 1);
        assert_eq!(reply.packets[0].countdown, 0);
        assert!(reply.packets[0].chunk.is_empty());
    }

    #[test]
    fn test_failed_action_reports_debug() {
        let mut d = dispatcher(FakeServices {
            fail_strike: true,
            ..FakeServices::default()
        });
        let outcome = d.handle_read(&uplink(CUBE, Command::ActivatePayloadStrikingMechanism));
        assert!(matches!(outcome, Outcome::Failed { .. }));

        let reply = single_transfer(&outcome);
        assert_eq!(reply.message_type(), MessageType::Debug);
        let text = std::str::from_utf8(&reply.header.body).unwrap();
        assert!(text.contains("strike interlock"));
        assert!(reply.header.body.len() <= HEADER_BODY_MAX);
    }

    #[test]
    fn test_missing_image_reports_debug() {
        let mut d = dispatcher(FakeServices::default());
        let outcome = d.handle_read(&uplink(
            CUBE,
            Command::RequestScienceImage {
                camera: Camera::Right,
                resume_packet: 0,
                packets_to_send: 0,
                timestamp: 0,
            },
        ));
        let reply = single_transfer(&outcome);
        assert_eq!(reply.message_type(), MessageType::Debug);
    }

    #[test]
    fn test_truncate_to_boundary() {
        let mut s = "ab\u{00e9}cd".to_string();
        truncate_to_boundary(&mut s, 3);
        assert_eq!(s, "ab");
    }
}
