//! Application layer for audio-gate-server.
//!
//! Use cases that sit between the HTTP handlers and `audio-gate-core`.  No
//! sockets or HTTP types appear here, so everything is testable with a
//! [`ManualClock`](audio_gate_core::ManualClock).

pub mod admin_service;
pub mod qr;

pub use admin_service::{format_issued_at, AdminError, AdminSurface};
pub use qr::{login_qr_data_url, login_url, render_png_data_url};
