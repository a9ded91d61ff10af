//! # audio-gate-core
//!
//! Shared domain library for Audio Gate: the access rules and the relay state
//! machine that sit between a browser microphone page and a UDP audio device.
//!
//! This crate has no dependencies on sockets, HTTP frameworks, or the Tokio
//! runtime.  Everything that touches the network lives in
//! `audio-gate-server`.
//!
//! # Architecture overview (for beginners)
//!
//! Audio Gate lets a phone or laptop browser stream its microphone to a small
//! embedded device (for example an ESP32 with a speaker) that only speaks UDP.
//! Access is protected by a short 8-character code that an operator shows as
//! a QR code.  The code expires after a few minutes, so a photo of an old QR
//! code is useless.
//!
//! - **`clock`** – Where "now" comes from.  Production uses the system clock;
//!   tests use a manual clock so expiry boundaries can be hit to the
//!   millisecond.
//!
//! - **`credential`** – The single live access code, its issuance time, and
//!   the lazy "replace it if it has expired" rule.
//!
//! - **`session`** – Server-side session records keyed by an opaque id,
//!   expiring on their own fixed lifetime.
//!
//! - **`gate`** – The login/logout/status operations for the user and admin
//!   roles, built on the two stores above.
//!
//! - **`bridge`** – The per-connection `{Open, Closed}` state machine that
//!   turns each inbound frame into exactly one outbound datagram.

pub mod bridge;
pub mod clock;
pub mod credential;
pub mod error;
pub mod gate;
pub mod session;

// Re-export the most-used types at the crate root so callers can write
// `audio_gate_core::CredentialStore` instead of the full module path.
pub use bridge::{BridgeChannel, ChannelState, ChannelStats, DatagramSink, FrameOutcome};
pub use clock::{Clock, ManualClock, SystemClock};
pub use credential::{
    CredentialSnapshot, CredentialStore, DEFAULT_CREDENTIAL_WINDOW, SECRET_ALPHABET, SECRET_LEN,
};
pub use error::{AuthError, EncodingError, TransportError};
pub use gate::SessionGate;
pub use session::{Role, Session, SessionId, SessionStore, DEFAULT_SESSION_LIFETIME};
