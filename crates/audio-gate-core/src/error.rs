//! Error taxonomy shared by every Audio Gate component.
//!
//! | Error             | Raised by                          | Reaches the caller? |
//! |-------------------|------------------------------------|---------------------|
//! | [`AuthError`]     | session gate, admin surface        | yes, generic 401    |
//! | [`EncodingError`] | login-link QR rendering            | yes, generic 500    |
//! | [`TransportError`]| datagram sends on the bridge       | no, logged only     |

use thiserror::Error;

/// Authentication or authorization failure.
///
/// Deliberately has a single variant: a wrong code, an expired code, a
/// missing session, and a session with the wrong role all look the same to
/// the caller.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("unauthorized")]
    Unauthorized,
}

/// Failure to produce the scannable login link.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodingError {
    /// The login URL could not be built from the configured or requested base.
    #[error("invalid login url: {0}")]
    InvalidUrl(String),

    /// The URL did not fit into a QR symbol.
    #[error("qr encoding failed: {0}")]
    Qr(String),

    /// The QR symbol could not be rasterised to an image.
    #[error("image encoding failed: {0}")]
    Image(String),
}

/// Failure on the downstream datagram path.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The OS rejected the datagram (unreachable network, buffer full, ...).
    #[error("datagram send failed: {0}")]
    Send(#[from] std::io::Error),

    /// Fewer bytes than the frame length were handed to the socket.
    #[error("short datagram send: {sent} of {expected} bytes")]
    ShortSend { sent: usize, expected: usize },

    /// The bridge channel was already closed when a frame arrived.
    #[error("bridge channel closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_message_is_generic() {
        assert_eq!(AuthError::Unauthorized.to_string(), "unauthorized");
    }

    #[test]
    fn test_transport_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let err: TransportError = io.into();
        assert!(matches!(err, TransportError::Send(_)));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_short_send_message_contains_counts() {
        let err = TransportError::ShortSend {
            sent: 10,
            expected: 320,
        };
        assert_eq!(err.to_string(), "short datagram send: 10 of 320 bytes");
    }

    #[test]
    fn test_closed_message() {
        assert_eq!(TransportError::Closed.to_string(), "bridge channel closed");
    }
}
