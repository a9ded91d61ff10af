//! Domain layer for audio-gate-server.
//!
//! Plain data: the runtime configuration and the JSON bodies exchanged with
//! the browser.  Nothing here performs I/O or reads the environment.

pub mod config;
pub mod messages;

pub use config::ServerConfig;
pub use messages::{
    AuthStatusResponse, CredentialView, ErrorResponse, LoginRequest, RegenerateResponse,
    StatusResponse,
};
