//! Satellite and ground-station runtimes.
//!
//! Both ends share the same shape: the link is split, the write half goes to
//! the writer task, and the read half is polled with bounded reads.
//!
//! The [`SatelliteNode`] lifecycle:
//! 1. Open the UART (or take any async byte stream)
//! 2. Spawn the writer task
//! 3. Put the transceiver into receive mode
//! 4. Read, dispatch, queue replies, until shut down or the link closes
//!
//! # Example
//!
//! ```ignore
//! use obc_link::{LinkConfig, SatelliteNode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = LinkConfig::from_json_file("obc-link.json")?;
//!     let node = SatelliteNode::builder().config(config).start().await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     node.shutdown().await?;
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, ReadHalf};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::LinkConfig;
use crate::dispatcher::{
    Command, Dispatcher, Downlink, FsPayloadStore, GroundDecoder, MissionClock, SatelliteServices,
};
use crate::epoch;
use crate::error::{LinkError, Result};
use crate::protocol::{OperatingMode, StationId};
use crate::transceiver::TransceiverCommand;
use crate::transport::{open_serial, LinkReader, SerialLink};
use crate::writer::{spawn_writer_task, WriterHandle};

/// Builder for a [`SatelliteNode`].
pub struct SatelliteBuilder {
    config: LinkConfig,
    services: Option<Box<dyn SatelliteServices>>,
    clock: MissionClock,
}

impl SatelliteBuilder {
    pub fn new() -> Self {
        Self {
            config: LinkConfig::default(),
            services: None,
            clock: MissionClock::new(),
        }
    }

    pub fn config(mut self, config: LinkConfig) -> Self {
        self.config = config;
        self
    }

    /// Data sources and actions behind the commands.
    ///
    /// Default: [`FsPayloadStore`] on the configured storage directory.
    pub fn services(mut self, services: impl SatelliteServices) -> Self {
        self.services = Some(Box::new(services));
        self
    }

    /// Use files under `dir` as the payload store.
    pub fn storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.storage_dir = dir.into();
        self.services = None;
        self
    }

    /// Share a mission clock with the caller.
    pub fn clock(mut self, clock: MissionClock) -> Self {
        self.clock = clock;
        self
    }

    /// Open the configured UART and start.
    pub async fn start(self) -> Result<SatelliteNode> {
        self.config.validate()?;
        let link = open_serial(&self.config)?;
        tracing::info!(
            "Opened {} at {} baud",
            self.config.port,
            self.config.baud_rate
        );
        self.start_with_link(link).await
    }

    /// Start on an already open byte stream.
    pub async fn start_with_link<L>(self, link: L) -> Result<SatelliteNode>
    where
        L: AsyncRead + AsyncWrite + Send + 'static,
    {
        let config = self.config;
        config.validate()?;

        let (read_half, write_half) = tokio::io::split(link);
        let (writer, writer_task) = spawn_writer_task(write_half, config.writer_config());

        writer
            .send_control(TransceiverCommand::set_receive(
                config.channel,
                config.packet_length,
            )?)
            .await?;
        writer
            .send_control(TransceiverCommand::SetMode(OperatingMode::Receive))
            .await?;

        let services = match self.services {
            Some(services) => services,
            None => Box::new(FsPayloadStore::new(config.storage_dir.clone())),
        };
        let dispatcher = Dispatcher::new(config.station_id, config.ground_station_id, services)
            .with_clock(self.clock.clone());
        let reader = LinkReader::with_gap(read_half, config.inter_byte_gap());

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let reader_task = tokio::spawn(satellite_loop(
            reader,
            dispatcher,
            writer.clone(),
            config.read_timeout(),
            shutdown_rx,
        ));

        tracing::info!("Satellite {} listening on channel {}", config.station_id, config.channel);
        Ok(SatelliteNode {
            station_id: config.station_id,
            writer,
            clock: self.clock,
            shutdown_tx,
            reader_task,
            writer_task,
        })
    }
}

impl Default for SatelliteBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running satellite end of the link.
pub struct SatelliteNode {
    station_id: StationId,
    writer: WriterHandle,
    clock: MissionClock,
    shutdown_tx: watch::Sender<bool>,
    reader_task: JoinHandle<Result<()>>,
    writer_task: JoinHandle<Result<()>>,
}

impl SatelliteNode {
    pub fn builder() -> SatelliteBuilder {
        SatelliteBuilder::new()
    }

    pub fn station_id(&self) -> StationId {
        self.station_id
    }

    pub fn clock(&self) -> &MissionClock {
        &self.clock
    }

    /// Queue for transmitting outside the command loop.
    pub fn writer(&self) -> &WriterHandle {
        &self.writer
    }

    /// Whether the read loop is still running.
    pub fn is_running(&self) -> bool {
        !self.reader_task.is_finished()
    }

    /// Stop after the current read, then flush queued replies.
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.shutdown_tx.send(true);
        self.finish().await
    }

    /// Wait until the link closes on its own.
    pub async fn wait_for_shutdown(self) -> Result<()> {
        self.finish().await
    }

    async fn finish(self) -> Result<()> {
        let read_result = join(self.reader_task).await;
        drop(self.writer);
        let write_result = join(self.writer_task).await;
        tracing::info!("Satellite {} stopped", self.station_id);
        read_result.and(write_result)
    }
}

async fn satellite_loop<R>(
    mut reader: LinkReader<R>,
    mut dispatcher: Dispatcher,
    writer: WriterHandle,
    wait: Duration,
    shutdown: watch::Receiver<bool>,
) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    loop {
        // Only checked between reads so a frame is never cut in half
        if *shutdown.borrow() {
            tracing::debug!("Shutdown requested");
            return Ok(());
        }

        let data = match reader.read_pending(wait).await {
            Ok(data) => data,
            Err(LinkError::LinkClosed) => {
                tracing::warn!("Link closed by peer");
                return Ok(());
            }
            Err(e) => {
                tracing::error!("Read loop error: {}", e);
                return Err(e);
            }
        };

        for item in dispatcher.handle_read(&data).into_replies() {
            writer.send(item).await?;
        }
    }
}

async fn join(task: JoinHandle<Result<()>>) -> Result<()> {
    task.await.map_err(|e| LinkError::Io(std::io::Error::other(e)))?
}

/// The ground-station end of the link.
pub struct GroundStation<R> {
    reader: LinkReader<R>,
    decoder: GroundDecoder,
    writer: WriterHandle,
    writer_task: JoinHandle<Result<()>>,
    satellite_id: StationId,
    read_timeout: Duration,
}

impl GroundStation<ReadHalf<SerialLink>> {
    /// Open the configured UART.
    pub async fn open(config: LinkConfig) -> Result<Self> {
        config.validate()?;
        let link = open_serial(&config)?;
        Self::with_link(link, config).await
    }
}

impl<L> GroundStation<ReadHalf<L>>
where
    L: AsyncRead + AsyncWrite + Send + 'static,
{
    /// Use an already open byte stream.
    ///
    /// Commands are addressed to `config.station_id`.
    pub async fn with_link(link: L, config: LinkConfig) -> Result<Self> {
        config.validate()?;
        let (read_half, write_half) = tokio::io::split(link);
        let (writer, writer_task) = spawn_writer_task(write_half, config.writer_config());

        writer
            .send_control(TransceiverCommand::set_receive(
                config.channel,
                config.packet_length,
            )?)
            .await?;
        writer
            .send_control(TransceiverCommand::SetMode(OperatingMode::Switching))
            .await?;

        Ok(Self {
            reader: LinkReader::with_gap(read_half, config.inter_byte_gap()),
            decoder: GroundDecoder::new(),
            writer,
            writer_task,
            satellite_id: config.station_id,
            read_timeout: config.read_timeout(),
        })
    }
}

impl<R: AsyncRead + Unpin> GroundStation<R> {
    /// Queue a command for the satellite.
    pub async fn send_command(&self, command: Command) -> Result<()> {
        tracing::info!("Sending {:?} to {}", command, self.satellite_id);
        self.writer
            .send_transfer(command.to_transfer(self.satellite_id))
            .await
    }

    /// Set the satellite clock from this machine's wall clock.
    pub async fn sync_clock(&self) -> Result<u32> {
        let now = epoch::now().ok_or_else(|| {
            LinkError::InvalidArgument("system clock outside mission epoch range".to_string())
        })?;
        self.send_command(Command::SetTime { timestamp: now }).await?;
        Ok(now)
    }

    /// Read until one message is decoded or a read comes back empty.
    ///
    /// A chunked transfer is read to the end before returning.
    pub async fn next_downlink(&mut self) -> Result<Option<Downlink>> {
        loop {
            let data = self.reader.read_pending(self.read_timeout).await?;
            match self.decoder.push_read(&data)? {
                Some(message) => return Ok(Some(message)),
                None if self.decoder.is_receiving() => continue,
                None => return Ok(None),
            }
        }
    }

    /// Keep reading until a message arrives or `within` has passed.
    pub async fn wait_downlink(&mut self, within: Duration) -> Result<Option<Downlink>> {
        let deadline = Instant::now() + within;
        while Instant::now() < deadline {
            if let Some(message) = self.next_downlink().await? {
                return Ok(Some(message));
            }
        }
        Ok(None)
    }

    /// Send a command and wait for its reply.
    pub async fn request(&mut self, command: Command, within: Duration) -> Result<Option<Downlink>> {
        self.send_command(command).await?;
        self.wait_downlink(within).await
    }

    pub fn writer(&self) -> &WriterHandle {
        &self.writer
    }

    /// Flush queued commands and stop the writer task.
    pub async fn close(self) -> Result<()> {
        drop(self.writer);
        join(self.writer_task).await
    }
}
