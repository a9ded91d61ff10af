//! The bridge channel: one browser connection's frame-to-datagram relay.
//!
//! # State machine
//!
//! ```text
//!            forward(frame) ──► exactly one send_datagram(frame)
//!              ┌──────┐
//!              ▼      │
//!  new() ──► Open ────┘ ──close()──► Closed ──forward(frame)──► no send
//! ```
//!
//! There is one transition that does work (frame in, datagram out) and it
//! has no retry, no queue, and no acknowledgement.  A failed send is counted
//! and reported to the caller as [`FrameOutcome::SendFailed`], but the channel
//! stays `Open`: one lost audio packet must never end the stream.
//!
//! The channel holds no audio state between frames.  The only thing it keeps
//! is a handful of counters for the close-time log line.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::TransportError;

/// The downstream datagram endpoint.
///
/// Infrastructure implements this over a UDP socket; tests record calls.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DatagramSink: Send + Sync {
    /// Sends `payload` as a single datagram to the fixed peer.
    async fn send_datagram(&self, payload: &[u8]) -> Result<(), TransportError>;

    /// The fixed peer address, for logging.
    fn peer(&self) -> SocketAddr;
}

/// Lifecycle state of a [`BridgeChannel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Open,
    Closed,
}

/// What happened to one inbound frame.
#[derive(Debug)]
pub enum FrameOutcome {
    /// Sent as one datagram.
    Forwarded { bytes: usize },
    /// The send failed; the frame is gone and the channel is still open.
    SendFailed(TransportError),
    /// The channel was closed; nothing was sent. Always carries
    /// [`TransportError::Closed`].
    Rejected(TransportError),
}

impl FrameOutcome {
    pub fn is_forwarded(&self) -> bool {
        matches!(self, FrameOutcome::Forwarded { .. })
    }
}

/// Per-connection counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    pub frames_in: u64,
    pub datagrams_out: u64,
    pub bytes_out: u64,
    pub send_failures: u64,
}

/// Relay for a single browser connection.
pub struct BridgeChannel {
    label: String,
    sink: Arc<dyn DatagramSink>,
    state: ChannelState,
    stats: ChannelStats,
}

impl BridgeChannel {
    /// Opens a channel that forwards to `sink`.  `label` is used in logs.
    pub fn open(label: impl Into<String>, sink: Arc<dyn DatagramSink>) -> Self {
        let label = label.into();
        debug!(channel = %label, peer = %sink.peer(), "bridge channel open");
        Self {
            label,
            sink,
            state: ChannelState::Open,
            stats: ChannelStats::default(),
        }
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn stats(&self) -> ChannelStats {
        self.stats
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Forwards one frame, unmodified and unsplit, as one datagram.
    pub async fn forward(&mut self, frame: &[u8]) -> FrameOutcome {
        if self.state == ChannelState::Closed {
            return FrameOutcome::Rejected(TransportError::Closed);
        }
        self.stats.frames_in += 1;

        match self.sink.send_datagram(frame).await {
            Ok(()) => {
                self.stats.datagrams_out += 1;
                self.stats.bytes_out += frame.len() as u64;
                FrameOutcome::Forwarded { bytes: frame.len() }
            }
            Err(e) => {
                self.stats.send_failures += 1;
                warn!(channel = %self.label, "frame dropped: {e}");
                FrameOutcome::SendFailed(e)
            }
        }
    }

    /// Closes the channel and returns its final counters.  Idempotent.
    pub fn close(&mut self) -> ChannelStats {
        if self.state == ChannelState::Open {
            self.state = ChannelState::Closed;
            debug!(channel = %self.label, "bridge channel closed");
        }
        self.stats
    }
}

impl fmt::Debug for BridgeChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeChannel")
            .field("label", &self.label)
            .field("peer", &self.sink.peer())
            .field("state", &self.state)
            .field("stats", &self.stats)
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
