//! audio-gate-server library crate.
//!
//! This crate wires the pure rules from `audio-gate-core` to the network: a
//! small JSON API for logging in, an admin API for showing the access code as
//! a QR code, and a WebSocket endpoint whose binary frames are relayed to a
//! UDP device.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Browser (JSON + WebSocket binary frames)
//!         ↕
//! [audio-gate-server]
//!   ├── domain/           Pure types: ServerConfig, JSON request/response bodies
//!   ├── application/      Admin surface: credential view, QR rendering
//!   └── infrastructure/
//!         ├── http/       axum router and handlers
//!         ├── cookies/    signed session cookies
//!         ├── ws_bridge/  WebSocket upgrade + frame loop
//!         ├── udp_sink/   UDP socket to the device
//!         ├── config_file/ optional TOML config
//!         └── server/     bind, serve, graceful shutdown
//!         ↓
//! Embedded device (one UDP datagram per frame)
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O.
//! - `application` depends on `domain` and `audio-gate-core` only.
//! - `infrastructure` depends on all other layers plus `tokio` and `axum`.

/// Domain layer: configuration and wire types (no I/O).
pub mod domain;

/// Application layer: admin credential view and QR rendering.
pub mod application;

/// Infrastructure layer: HTTP, WebSocket, UDP and config file I/O.
pub mod infrastructure;
