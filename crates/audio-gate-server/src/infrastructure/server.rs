//! Server runner: resolve the device, bind the sockets, serve until shutdown.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use audio_gate_core::{CredentialSnapshot, SystemClock};
use tokio::net::TcpListener;
use tracing::info;

use crate::application::format_issued_at;
use crate::application::qr::LOGIN_PAGE_PATH;
use crate::domain::ServerConfig;
use crate::infrastructure::http::{build_router, AppState};
use crate::infrastructure::udp_sink::{resolve_device, UdpDatagramSink};

/// Runs the audio gate until `shutdown` resolves.
///
/// In-flight requests are allowed to finish once `shutdown` fires; open
/// bridge connections are dropped with the server.
///
/// # Errors
///
/// Returns an error if the device address cannot be resolved, or if either
/// the UDP socket or the TCP listener cannot be bound.
pub async fn run_server<F>(config: ServerConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let device = resolve_device(&config.device_host, config.device_port).await?;
    let sink = UdpDatagramSink::bind(device)
        .await
        .context("failed to bind UDP socket for the device")?;

    let state = Arc::new(AppState::new(
        &config,
        Arc::new(SystemClock),
        Arc::new(sink),
    ));
    let snapshot = state.gate().credentials().snapshot();
    let router = build_router(state, config.static_dir.as_deref());

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind HTTP listener on {}", config.bind_addr))?;
    let local_addr = listener.local_addr()?;
    info!("audio gate listening on http://{local_addr}");

    let base = banner_base_url(config.public_url.as_deref(), local_addr);
    StartupBanner::new(&base, &snapshot, config.credential_window).log();

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server error")?;

    Ok(())
}

const ADMIN_PAGE_PATH: &str = "/admin.html";

/// Base URL printed at startup.
///
/// The configured public URL wins.  Otherwise the listener address is used,
/// with a wildcard IP shown as `localhost`.
fn banner_base_url(public_url: Option<&str>, local_addr: SocketAddr) -> String {
    if let Some(url) = public_url {
        return url.trim_end_matches('/').to_string();
    }
    if local_addr.ip().is_unspecified() {
        format!("http://localhost:{}", local_addr.port())
    } else {
        format!("http://{local_addr}")
    }
}

/// What an operator needs right after startup.
#[derive(Debug, Clone, PartialEq, Eq)]
struct StartupBanner {
    login_url: String,
    admin_url: String,
    code: String,
    expires_at: String,
}

impl StartupBanner {
    fn new(base: &str, snapshot: &CredentialSnapshot, window: Duration) -> Self {
        Self {
            login_url: format!("{base}{LOGIN_PAGE_PATH}"),
            admin_url: format!("{base}{ADMIN_PAGE_PATH}"),
            code: snapshot.secret.clone(),
            expires_at: format_issued_at(snapshot.issued_at + window),
        }
    }

    fn log(&self) {
        info!("user login:  {}", self.login_url);
        info!("admin panel: {}", self.admin_url);
        info!("access code: {} (expires {})", self.code, self.expires_at);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
