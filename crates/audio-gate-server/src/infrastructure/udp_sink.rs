//! UDP socket towards the embedded device.
//!
//! One unconnected socket is shared by every bridge connection.  The device
//! address is resolved once at startup; there is no per-frame DNS lookup.

use std::net::SocketAddr;

use anyhow::Context;
use async_trait::async_trait;
use audio_gate_core::{DatagramSink, TransportError};
use tokio::net::{lookup_host, UdpSocket};
use tracing::info;

/// Resolves `host:port` to the first address returned by the resolver.
///
/// # Errors
///
/// Fails if the lookup errors or yields no addresses.
pub async fn resolve_device(host: &str, port: u16) -> anyhow::Result<SocketAddr> {
    lookup_host((host, port))
        .await
        .with_context(|| format!("failed to resolve device address '{host}:{port}'"))?
        .next()
        .with_context(|| format!("device address '{host}:{port}' resolved to nothing"))
}

/// [`DatagramSink`] backed by a tokio [`UdpSocket`].
#[derive(Debug)]
pub struct UdpDatagramSink {
    socket: UdpSocket,
    peer: SocketAddr,
}

impl UdpDatagramSink {
    /// Binds an ephemeral local port in the same address family as `peer`.
    ///
    /// # Errors
    ///
    /// Returns the bind error.
    pub async fn bind(peer: SocketAddr) -> std::io::Result<Self> {
        let local: SocketAddr = if peer.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        let socket = UdpSocket::bind(local).await?;
        info!(
            "UDP sink bound on {} → device {}",
            socket.local_addr()?,
            peer
        );
        Ok(Self { socket, peer })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

#[async_trait]
impl DatagramSink for UdpDatagramSink {
    async fn send_datagram(&self, payload: &[u8]) -> Result<(), TransportError> {
        let sent = self.socket.send_to(payload, self.peer).await?;
        if sent != payload.len() {
            return Err(TransportError::ShortSend {
                sent,
                expected: payload.len(),
            });
        }
        Ok(())
    }

    fn peer(&self) -> SocketAddr {
        self.peer
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_each_payload_arrives_as_one_datagram() {
        // Arrange: a local socket plays the device.
        let device = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let sink = UdpDatagramSink::bind(device.local_addr().unwrap())
            .await
            .unwrap();

        // Act
        sink.send_datagram(&[1, 2, 3]).await.unwrap();
        sink.send_datagram(&[4u8; 320]).await.unwrap();

        // Assert
        let mut buf = [0u8; 2048];
        let (n, _) = timeout(Duration::from_secs(2), device.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&buf[..n], &[1, 2, 3]);
        let (n, _) = timeout(Duration::from_secs(2), device.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&buf[..n], &[4u8; 320][..]);
    }

    #[tokio::test]
    async fn test_peer_is_the_configured_device() {
        let peer: SocketAddr = "127.0.0.1:5005".parse().unwrap();
        let sink = UdpDatagramSink::bind(peer).await.unwrap();
        assert_eq!(sink.peer(), peer);
        assert!(sink.local_addr().unwrap().ip().is_unspecified());
    }

    #[tokio::test]
    async fn test_resolve_literal_ip() {
        let addr = resolve_device("127.0.0.1", 5005).await.unwrap();
        assert_eq!(addr, "127.0.0.1:5005".parse::<SocketAddr>().unwrap());
    }

    #[tokio::test]
    async fn test_resolve_failure_carries_context() {
        let err = resolve_device("no such host name", 5005).await.unwrap_err();
        assert!(err.to_string().contains("no such host name:5005"));
    }
}
