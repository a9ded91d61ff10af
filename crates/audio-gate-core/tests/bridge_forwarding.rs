//! Integration tests for the bridge channel state machine.
//!
//! A recording [`DatagramSink`] stands in for the UDP socket so the tests can
//! assert on exactly which datagrams were emitted and in which order.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use audio_gate_core::{
    BridgeChannel, ChannelState, DatagramSink, FrameOutcome, TransportError,
};

// ── Test double ───────────────────────────────────────────────────────────────

#[derive(Default)]
struct RecordingSink {
    sent: Mutex<Vec<Vec<u8>>>,
    /// Indices (0-based, counted over all send attempts) that should fail.
    fail_on: Vec<usize>,
    attempts: Mutex<usize>,
}

#[async_trait]
impl DatagramSink for RecordingSink {
    async fn send_datagram(&self, payload: &[u8]) -> Result<(), TransportError> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let current = *attempts;
            *attempts += 1;
            current
        };
        if self.fail_on.contains(&attempt) {
            return Err(TransportError::Send(std::io::Error::new(
                std::io::ErrorKind::WouldBlock,
                "socket buffer full",
            )));
        }
        self.sent.lock().unwrap().push(payload.to_vec());
        Ok(())
    }

    fn peer(&self) -> SocketAddr {
        "127.0.0.1:5005".parse().unwrap()
    }
}

fn frame(index: usize, len: usize) -> Vec<u8> {
    (0..len).map(|i| ((index * 31 + i) % 251) as u8).collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

/// 50 back-to-back frames of 320 bytes become 50 datagrams with identical
/// bytes in arrival order.
#[tokio::test]
async fn test_fifty_frames_become_fifty_identical_datagrams_in_order() {
    // Arrange
    let sink = Arc::new(RecordingSink::default());
    let mut channel = BridgeChannel::open("burst", sink.clone());
    let frames: Vec<Vec<u8>> = (0..50).map(|i| frame(i, 320)).collect();

    // Act
    for f in &frames {
        let outcome = channel.forward(f).await;
        assert!(outcome.is_forwarded());
    }

    // Assert
    let sent = sink.sent.lock().unwrap();
    assert_eq!(sent.len(), 50);
    assert_eq!(*sent, frames);

    let stats = channel.stats();
    assert_eq!(stats.frames_in, 50);
    assert_eq!(stats.datagrams_out, 50);
    assert_eq!(stats.bytes_out, 50 * 320);
}

/// Frames of different sizes are never split or coalesced.
#[tokio::test]
async fn test_frame_boundaries_are_preserved() {
    let sink = Arc::new(RecordingSink::default());
    let mut channel = BridgeChannel::open("sizes", sink.clone());
    let sizes = [1usize, 128, 320, 1024, 4096];

    for (i, len) in sizes.iter().enumerate() {
        channel.forward(&frame(i, *len)).await;
    }

    let sent = sink.sent.lock().unwrap();
    let sent_sizes: Vec<usize> = sent.iter().map(Vec::len).collect();
    assert_eq!(sent_sizes, sizes);
}

/// Failed sends are dropped, not retried, and do not close the channel.
#[tokio::test]
async fn test_failed_sends_are_dropped_without_retry() {
    // Arrange: attempts 2 and 5 fail.
    let sink = Arc::new(RecordingSink {
        fail_on: vec![2, 5],
        ..Default::default()
    });
    let mut channel = BridgeChannel::open("lossy", sink.clone());

    // Act
    let mut failures = 0;
    for i in 0..8 {
        if let FrameOutcome::SendFailed(_) = channel.forward(&frame(i, 16)).await {
            failures += 1;
        }
    }

    // Assert
    assert_eq!(failures, 2);
    assert_eq!(channel.state(), ChannelState::Open);
    assert_eq!(*sink.attempts.lock().unwrap(), 8, "no retries");
    assert_eq!(sink.sent.lock().unwrap().len(), 6);
    assert_eq!(channel.stats().send_failures, 2);
}

/// After close, frames are rejected and the sink sees nothing more.
#[tokio::test]
async fn test_frames_after_close_never_reach_the_sink() {
    let sink = Arc::new(RecordingSink::default());
    let mut channel = BridgeChannel::open("closing", sink.clone());

    channel.forward(b"before").await;
    let stats = channel.close();
    let outcome = channel.forward(b"after").await;

    assert!(matches!(
        outcome,
        FrameOutcome::Rejected(TransportError::Closed)
    ));
    assert_eq!(stats.datagrams_out, 1);
    assert_eq!(*sink.sent.lock().unwrap(), vec![b"before".to_vec()]);
}
