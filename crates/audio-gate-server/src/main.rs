//! Audio Gate server entry point.
//!
//! Serves the login/admin JSON API and the WebSocket audio bridge.  Browsers
//! log in with the rotating access code, then stream microphone frames that
//! are relayed one-to-one as UDP datagrams to the embedded device.
//!
//! # Usage
//!
//! ```text
//! audio-gate-server [OPTIONS]
//!
//! Options:
//!   --port <PORT>                     HTTP/WebSocket port [default: 10000]
//!   --bind <IP>                       Listen address [default: 0.0.0.0]
//!   --device-host <HOST>              Device hostname or IP [default: 192.168.1.25]
//!   --device-port <PORT>              Device UDP port [default: 5005]
//!   --admin-password <PASSWORD>       Static admin password [default: random]
//!   --session-secret <SECRET>         Cookie-signing secret [default: random]
//!   --credential-window-secs <SECS>   Access code lifetime [default: 300]
//!   --session-lifetime-secs <SECS>    Session lifetime [default: 1800]
//!   --public-url <URL>                Base URL used in QR login links
//!   --static-dir <DIR>                Directory with the browser pages
//!   --secure-cookies <BOOL>           Mark cookies Secure [default: false]
//!   --config <FILE>                   TOML config file
//! ```
//!
//! # Precedence
//!
//! CLI flag > environment variable > config file > built-in default.
//!
//! | Variable                 | Flag                       |
//! |--------------------------|----------------------------|
//! | `PORT`                   | `--port`                   |
//! | `AUDIO_GATE_BIND`        | `--bind`                   |
//! | `DEVICE_HOST`            | `--device-host`            |
//! | `DEVICE_PORT`            | `--device-port`            |
//! | `ADMIN_PASSWORD`         | `--admin-password`         |
//! | `SESSION_SECRET`         | `--session-secret`         |
//! | `CREDENTIAL_WINDOW_SECS` | `--credential-window-secs` |
//! | `SESSION_LIFETIME_SECS`  | `--session-lifetime-secs`  |
//! | `PUBLIC_URL`             | `--public-url`             |
//! | `STATIC_DIR`             | `--static-dir`             |
//! | `SECURE_COOKIES`         | `--secure-cookies`         |
//! | `AUDIO_GATE_CONFIG`      | `--config`                 |

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{ensure, Context};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

use audio_gate_server::domain::ServerConfig;
use audio_gate_server::infrastructure::{run_server, FileConfig};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Audio Gate: browser microphone to UDP device relay behind a rotating
/// access code.
///
/// Every option is optional so that unset flags fall through to the config
/// file and then to the built-in defaults.
#[derive(Debug, Default, Parser)]
#[command(
    name = "audio-gate-server",
    about = "Relay browser audio to a UDP device behind a rotating access code",
    version
)]
struct Cli {
    /// TCP port for HTTP and WebSocket connections.
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// IP address to listen on.
    #[arg(long, env = "AUDIO_GATE_BIND")]
    bind: Option<String>,

    /// Hostname or IP address of the embedded device.
    #[arg(long, env = "DEVICE_HOST")]
    device_host: Option<String>,

    /// UDP port of the embedded device.
    #[arg(long, env = "DEVICE_PORT")]
    device_port: Option<u16>,

    /// Static admin password.  Generated and logged once when unset.
    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    admin_password: Option<String>,

    /// Secret the cookie-signing key is derived from.
    #[arg(long, env = "SESSION_SECRET", hide_env_values = true)]
    session_secret: Option<String>,

    /// Seconds an access code stays valid.
    #[arg(long, env = "CREDENTIAL_WINDOW_SECS")]
    credential_window_secs: Option<u64>,

    /// Seconds a session lasts after login.
    #[arg(long, env = "SESSION_LIFETIME_SECS")]
    session_lifetime_secs: Option<u64>,

    /// Externally visible base URL for QR login links.
    #[arg(long, env = "PUBLIC_URL")]
    public_url: Option<String>,

    /// Directory with login.html, the streaming page and the admin page.
    #[arg(long, env = "STATIC_DIR")]
    static_dir: Option<PathBuf>,

    /// Add the Secure attribute to session cookies (set behind HTTPS).
    #[arg(long, env = "SECURE_COOKIES")]
    secure_cookies: Option<bool>,

    /// Path to a TOML config file.
    #[arg(long, env = "AUDIO_GATE_CONFIG")]
    config: Option<PathBuf>,
}

impl Cli {
    /// Loads the config file (if any) and merges it under the CLI values.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be loaded or any merged
    /// value is invalid.
    fn into_server_config(self) -> anyhow::Result<ServerConfig> {
        let file = match &self.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        self.merge(file)
    }

    /// Merges CLI values over `file` over the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the bind address or public URL does not parse, or
    /// a lifetime is zero.
    fn merge(self, file: FileConfig) -> anyhow::Result<ServerConfig> {
        let defaults = ServerConfig::default();

        let bind = self
            .bind
            .or(file.bind)
            .unwrap_or_else(|| defaults.bind_addr.ip().to_string());
        let ip: IpAddr = bind
            .parse()
            .with_context(|| format!("invalid bind address: '{bind}'"))?;
        let port = self.port.or(file.port).unwrap_or(defaults.bind_addr.port());

        let admin_password = match self.admin_password.or(file.admin_password) {
            Some(password) => {
                if password.is_empty() {
                    warn!("admin password is empty; admin login is disabled");
                }
                password
            }
            None => {
                warn!(
                    "no admin password configured; generated one for this run: {}",
                    defaults.admin_password
                );
                defaults.admin_password
            }
        };

        let session_secret = self
            .session_secret
            .or(file.session_secret)
            .unwrap_or(defaults.session_secret);

        let credential_window = self
            .credential_window_secs
            .or(file.credential_window_secs)
            .map(Duration::from_secs)
            .unwrap_or(defaults.credential_window);
        ensure!(
            !credential_window.is_zero(),
            "credential window must be at least one second"
        );

        let session_lifetime = self
            .session_lifetime_secs
            .or(file.session_lifetime_secs)
            .map(Duration::from_secs)
            .unwrap_or(defaults.session_lifetime);
        ensure!(
            !session_lifetime.is_zero(),
            "session lifetime must be at least one second"
        );

        let public_url = self.public_url.or(file.public_url);
        if let Some(url) = &public_url {
            Url::parse(url).with_context(|| format!("invalid public URL: '{url}'"))?;
        }

        Ok(ServerConfig {
            bind_addr: SocketAddr::new(ip, port),
            device_host: self
                .device_host
                .or(file.device_host)
                .unwrap_or(defaults.device_host),
            device_port: self
                .device_port
                .or(file.device_port)
                .unwrap_or(defaults.device_port),
            admin_password,
            session_secret,
            credential_window,
            session_lifetime,
            public_url,
            static_dir: self.static_dir.or(file.static_dir),
            secure_cookies: self
                .secure_cookies
                .or(file.secure_cookies)
                .unwrap_or(defaults.secure_cookies),
        })
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// 1. Initialise `tracing_subscriber` (level from `RUST_LOG`, default `info`).
/// 2. Parse the CLI and merge it with the config file.
/// 3. Serve until Ctrl+C, then let in-flight requests finish.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging setup ─────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── Configuration ─────────────────────────────────────────────────────────
    let config = Cli::parse().into_server_config()?;

    info!(
        "Audio Gate starting: listen={}, device={}:{}",
        config.bind_addr, config.device_host, config.device_port
    );

    // ── Graceful shutdown ─────────────────────────────────────────────────────
    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("received Ctrl+C, shutting down"),
            Err(e) => {
                error!("failed to listen for Ctrl+C signal: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    run_server(config, shutdown).await?;

    info!("Audio Gate stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
