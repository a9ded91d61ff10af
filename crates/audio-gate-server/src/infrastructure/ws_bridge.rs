//! WebSocket side of the audio bridge.
//!
//! A browser that holds a live session (user or admin) may upgrade `GET /`
//! or `GET /ws` to a WebSocket.  From then on:
//!
//! ```text
//! Binary frame ──► BridgeChannel::forward ──► one UDP datagram
//! Text frame   ──► logged and dropped
//! Ping / Pong  ──► answered by the WebSocket layer
//! Close / error ─► channel closed, stats logged
//! ```
//!
//! Authentication happens before the handshake: without a session the
//! request is answered with 401 and never upgraded.

use std::fmt::Display;
use std::sync::Arc;

use audio_gate_core::{BridgeChannel, ChannelStats, DatagramSink, Role};
use axum::extract::ws::{Message, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use futures_util::{Stream, StreamExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::qr::LOGIN_PAGE_PATH;
use crate::infrastructure::cookies::{ADMIN_COOKIE, USER_COOKIE};
use crate::infrastructure::http::{ApiError, AppState};

// ── Handlers ──────────────────────────────────────────────────────────────────

/// `GET /`: the streaming page connects here; plain page loads are sent to
/// the login page.
pub async fn root(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ws: Option<WebSocketUpgrade>,
) -> Response {
    let Some(ws) = ws else {
        return Redirect::to(LOGIN_PAGE_PATH).into_response();
    };
    match authorize(&state, &headers) {
        Ok(role) => accept(&state, role, ws),
        Err(e) => e.into_response(),
    }
}

/// `GET /ws`: explicit bridge endpoint.
pub async fn ws_endpoint(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ws: Option<WebSocketUpgrade>,
) -> Response {
    let role = match authorize(&state, &headers) {
        Ok(role) => role,
        Err(e) => return e.into_response(),
    };
    match ws {
        Some(ws) => accept(&state, role, ws),
        None => (StatusCode::BAD_REQUEST, "expected a WebSocket upgrade").into_response(),
    }
}

/// Any live session, user or admin, may open the bridge.
fn authorize(state: &AppState, headers: &HeaderMap) -> Result<Role, ApiError> {
    let user = state.cookies().read(headers, USER_COOKIE);
    let admin = state.cookies().read(headers, ADMIN_COOKIE);
    state
        .gate()
        .require_any(&[user.as_ref(), admin.as_ref()])
        .map_err(|e| {
            warn!("bridge upgrade refused: no authenticated session");
            ApiError::from(e)
        })
}

fn accept(state: &AppState, role: Role, ws: WebSocketUpgrade) -> Response {
    let label = format!("bridge-{}", &Uuid::new_v4().simple().to_string()[..8]);
    let sink = state.sink();
    info!(connection = %label, role = role.as_str(), "bridge upgrade accepted");

    ws.on_upgrade(move |socket| async move {
        run_bridge(socket, sink, label).await;
    })
}

// ── Frame loop ────────────────────────────────────────────────────────────────

/// Relays binary frames from `frames` to `sink` until the peer closes.
///
/// Returns the channel's final counters.
pub async fn run_bridge<S, E>(
    mut frames: S,
    sink: Arc<dyn DatagramSink>,
    label: String,
) -> ChannelStats
where
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let mut channel = BridgeChannel::open(label, sink);

    while let Some(frame) = frames.next().await {
        match frame {
            Ok(Message::Binary(data)) => {
                channel.forward(&data).await;
            }
            Ok(Message::Text(text)) => {
                warn!(
                    connection = channel.label(),
                    len = text.len(),
                    "ignoring text frame on audio bridge"
                );
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                debug!(connection = channel.label(), "keepalive frame");
            }
            Ok(Message::Close(reason)) => {
                debug!(connection = channel.label(), ?reason, "peer closed the bridge");
                break;
            }
            Err(e) => {
                warn!(connection = channel.label(), "bridge read error: {e}");
                break;
            }
        }
    }

    let stats = channel.close();
    info!(
        connection = channel.label(),
        frames_in = stats.frames_in,
        datagrams_out = stats.datagrams_out,
        bytes_out = stats.bytes_out,
        send_failures = stats.send_failures,
        "bridge closed"
    );
    stats
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use audio_gate_core::TransportError;
    use futures_util::stream;

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<Vec<u8>>>,
    }

    #[async_trait]
    impl DatagramSink for RecordingSink {
        async fn send_datagram(&self, payload: &[u8]) -> Result<(), TransportError> {
            self.sent.lock().unwrap().push(payload.to_vec());
            Ok(())
        }

        fn peer(&self) -> SocketAddr {
            "127.0.0.1:5005".parse().unwrap()
        }
    }

    fn ok(msg: Message) -> Result<Message, std::io::Error> {
        Ok(msg)
    }

    #[tokio::test]
    async fn test_binary_frames_are_forwarded_in_order() {
        // Arrange
        let sink = Arc::new(RecordingSink::default());
        let frames = stream::iter(vec![
            ok(Message::Binary(vec![1, 1])),
            ok(Message::Binary(vec![2, 2, 2])),
            ok(Message::Binary(vec![3])),
        ]);

        // Act
        let stats = run_bridge(frames, sink.clone(), "t".to_string()).await;

        // Assert
        assert_eq!(
            *sink.sent.lock().unwrap(),
            vec![vec![1, 1], vec![2, 2, 2], vec![3]]
        );
        assert_eq!(stats.frames_in, 3);
        assert_eq!(stats.datagrams_out, 3);
        assert_eq!(stats.bytes_out, 6);
    }

    #[tokio::test]
    async fn test_text_and_keepalive_frames_are_not_forwarded() {
        let sink = Arc::new(RecordingSink::default());
        let frames = stream::iter(vec![
            ok(Message::Text("hello".to_string())),
            ok(Message::Ping(vec![9])),
            ok(Message::Pong(vec![9])),
            ok(Message::Binary(vec![7; 320])),
        ]);

        let stats = run_bridge(frames, sink.clone(), "t".to_string()).await;

        assert_eq!(*sink.sent.lock().unwrap(), vec![vec![7u8; 320]]);
        assert_eq!(stats.frames_in, 1);
    }

    #[tokio::test]
    async fn test_close_frame_stops_forwarding() {
        let sink = Arc::new(RecordingSink::default());
        let frames = stream::iter(vec![
            ok(Message::Binary(vec![1])),
            ok(Message::Close(None)),
            ok(Message::Binary(vec![2])),
        ]);

        let stats = run_bridge(frames, sink.clone(), "t".to_string()).await;

        assert_eq!(*sink.sent.lock().unwrap(), vec![vec![1u8]]);
        assert_eq!(stats.datagrams_out, 1);
    }

    #[tokio::test]
    async fn test_read_error_ends_the_bridge() {
        let sink = Arc::new(RecordingSink::default());
        let frames = stream::iter(vec![
            ok(Message::Binary(vec![1])),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
            ok(Message::Binary(vec![2])),
        ]);

        run_bridge(frames, sink.clone(), "t".to_string()).await;

        assert_eq!(sink.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_stream_end_closes_cleanly() {
        let sink = Arc::new(RecordingSink::default());
        let frames = stream::iter(Vec::<Result<Message, std::io::Error>>::new());

        let stats = run_bridge(frames, sink.clone(), "t".to_string()).await;

        assert_eq!(stats, ChannelStats::default());
    }
}
