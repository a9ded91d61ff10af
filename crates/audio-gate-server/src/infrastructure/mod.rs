//! Infrastructure layer for audio-gate-server.
//!
//! Everything that touches the network or the filesystem lives here.
//!
//! # Responsibilities
//!
//! - Routing HTTP requests and mapping errors to status codes
//! - Signing and verifying session cookies
//! - Upgrading authenticated requests to WebSocket bridge connections
//! - Sending datagrams to the device over UDP
//! - Loading the optional TOML config file
//! - Binding listeners and shutting down gracefully
//!
//! # What does NOT belong here?
//!
//! - Credential or session rules (that is `audio-gate-core`)
//! - QR rendering and the admin view (that is the application layer)
//! - Command-line parsing (that is done in `main.rs`)

pub mod config_file;
pub mod cookies;
pub mod http;
pub mod server;
pub mod udp_sink;
pub mod ws_bridge;

pub use config_file::{ConfigError, FileConfig};
pub use cookies::{SessionCookies, ADMIN_COOKIE, USER_COOKIE};
pub use http::{build_router, ApiError, AppState};
pub use server::run_server;
pub use udp_sink::{resolve_device, UdpDatagramSink};
