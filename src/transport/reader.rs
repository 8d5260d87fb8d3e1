//! Bounded reads from the link.
//!
//! The transceiver delivers each received packet as one burst of bytes.
//! [`LinkReader::read_pending`] waits a bounded time for a burst to start,
//! then collects bytes until the line goes quiet or one full envelope has
//! arrived. It never blocks past its timeouts.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::timeout;

use crate::config::DEFAULT_INTER_BYTE_GAP;
use crate::error::{LinkError, Result};
use crate::protocol::{ENVELOPE_PREFIX_SIZE, FRAME_SIZE};

/// Largest burst returned by one read: receive envelope plus one frame.
pub const MAX_BURST: usize = ENVELOPE_PREFIX_SIZE + FRAME_SIZE;

/// Read half of the link with burst framing.
pub struct LinkReader<R> {
    inner: R,
    inter_byte_gap: Duration,
}

impl<R: AsyncRead + Unpin> LinkReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_gap(inner, DEFAULT_INTER_BYTE_GAP)
    }

    /// Use a custom quiet gap to end a burst.
    pub fn with_gap(inner: R, inter_byte_gap: Duration) -> Self {
        Self {
            inner,
            inter_byte_gap,
        }
    }

    /// Read the next burst, waiting at most `wait` for it to start.
    ///
    /// Returns an empty buffer if nothing arrived. Fails with `LinkClosed`
    /// if the link reached end of stream before any byte of a burst.
    pub async fn read_pending(&mut self, wait: Duration) -> Result<Bytes> {
        let mut out = BytesMut::with_capacity(MAX_BURST);
        let mut chunk = [0u8; MAX_BURST];

        match timeout(wait, self.inner.read(&mut chunk)).await {
            Err(_) => return Ok(Bytes::new()),
            Ok(Ok(0)) => return Err(LinkError::LinkClosed),
            Ok(Ok(n)) => out.extend_from_slice(&chunk[..n]),
            Ok(Err(e)) => return Err(LinkError::Io(e)),
        }

        while out.len() < MAX_BURST {
            let room = MAX_BURST - out.len();
            match timeout(self.inter_byte_gap, self.inner.read(&mut chunk[..room])).await {
                Err(_) | Ok(Ok(0)) => break,
                Ok(Ok(n)) => out.extend_from_slice(&chunk[..n]),
                Ok(Err(e)) => return Err(LinkError::Io(e)),
            }
        }

        Ok(out.freeze())
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}
