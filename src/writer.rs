//! Dedicated writer task for the radio link.
//!
//! The writer task is the only owner of the link's write half. Everything
//! that wants to transmit (dispatcher replies, operator commands, mode
//! changes) sends an [`Outbound`] item through an mpsc channel, so two
//! transmissions can never interleave their bytes on the wire.
//!
//! # Architecture
//!
//! ```text
//! Dispatcher ─┐
//! Operator   ─┼─► mpsc::Sender<Outbound> ─► Writer Task ─► Transceiver
//! Mode change─┘
//! ```
//!
//! A [`Transfer`] is written as one unit: header frame, then each
//! information frame, with a fixed pause between consecutive frames so the
//! remote receiver can keep up. Once a transfer has started it always runs
//! to completion.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::{LinkError, Result};
use crate::transceiver::TransceiverCommand;
use crate::transfer::Transfer;

/// Pause between consecutive frames.
pub const DEFAULT_INTER_PACKET_DELAY: Duration = Duration::from_millis(100);

/// Default channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 32;

/// Settling time after a transceiver control command.
pub const CONTROL_SETTLE_DELAY: Duration = Duration::from_millis(20);

/// An item queued for the writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Reconfigure the transceiver.
    Control(TransceiverCommand),
    /// Transmit a whole message.
    Transfer(Transfer),
}

/// Configuration for the writer task.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Transceiver channel frames are sent on.
    pub channel: u8,
    /// Channel capacity for the outbound queue.
    pub channel_capacity: usize,
    /// Pause between consecutive frames.
    pub inter_packet_delay: Duration,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            channel: 0,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            inter_packet_delay: DEFAULT_INTER_PACKET_DELAY,
        }
    }
}

/// Handle for queuing items on the writer task.
///
/// This is cheaply cloneable and can be shared between the dispatcher and
/// operator-facing code.
#[derive(Clone)]
pub struct WriterHandle {
    tx: mpsc::Sender<Outbound>,
    /// Items queued but not yet fully written.
    pending: Arc<AtomicUsize>,
}

impl WriterHandle {
    /// Queue an item, waiting for space in the channel.
    ///
    /// Fails with `LinkClosed` if the writer task has stopped.
    pub async fn send(&self, item: Outbound) -> Result<()> {
        self.pending.fetch_add(1, Ordering::AcqRel);
        self.tx.send(item).await.map_err(|_| {
            self.pending.fetch_sub(1, Ordering::Release);
            LinkError::LinkClosed
        })
    }

    /// Queue a transfer.
    pub async fn send_transfer(&self, transfer: Transfer) -> Result<()> {
        self.send(Outbound::Transfer(transfer)).await
    }

    /// Queue a transceiver command.
    pub async fn send_control(&self, command: TransceiverCommand) -> Result<()> {
        self.send(Outbound::Control(command)).await
    }

    /// Items queued or in flight.
    #[inline]
    pub fn pending_count(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Whether the writer task has stopped.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Spawn the writer task and return a handle for queuing items.
///
/// The task ends cleanly once every handle is dropped and the queue is
/// drained, or with an error if a write fails.
pub fn spawn_writer_task<W>(writer: W, config: WriterConfig) -> (WriterHandle, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
    let pending = Arc::new(AtomicUsize::new(0));

    let handle = WriterHandle {
        tx,
        pending: pending.clone(),
    };
    let task = tokio::spawn(writer_loop(rx, writer, pending, config));

    (handle, task)
}

async fn writer_loop<W>(
    mut rx: mpsc::Receiver<Outbound>,
    mut writer: W,
    pending: Arc<AtomicUsize>,
    config: WriterConfig,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut pacer = Pacer::new(config.inter_packet_delay);

    while let Some(item) = rx.recv().await {
        let result = match &item {
            Outbound::Control(command) => {
                tracing::debug!("Transceiver command {:?}", command);
                let r = command.write_to(&mut writer).await;
                tokio::time::sleep(CONTROL_SETTLE_DELAY).await;
                r
            }
            Outbound::Transfer(transfer) => {
                write_transfer(&mut writer, transfer, config.channel, &mut pacer).await
            }
        };
        pending.fetch_sub(1, Ordering::Release);

        if let Err(e) = result {
            tracing::error!("Writer stopped: {}", e);
            return Err(e);
        }
    }

    Ok(())
}

/// Write every frame of `transfer`, paced.
async fn write_transfer<W>(
    writer: &mut W,
    transfer: &Transfer,
    channel: u8,
    pacer: &mut Pacer,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let frames = transfer.frames(channel)?;
    tracing::debug!(
        "Transmitting {:?} ({} frames)",
        transfer.message_type(),
        frames.len()
    );

    for frame in frames {
        pacer.wait().await;
        TransceiverCommand::Transmit(frame).write_to(writer).await?;
        pacer.mark();
    }
    Ok(())
}

/// Keeps consecutive frames at least `delay` apart.
struct Pacer {
    delay: Duration,
    last: Option<Instant>,
}

impl Pacer {
    fn new(delay: Duration) -> Self {
        Self { delay, last: None }
    }

    async fn wait(&self) {
        if let Some(last) = self.last {
            tokio::time::sleep_until(last + self.delay).await;
        }
    }

    fn mark(&mut self) {
        self.last = Some(Instant::now());
    }
}
