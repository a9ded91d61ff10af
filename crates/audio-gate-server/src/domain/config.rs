//! Server configuration types.
//!
//! [`ServerConfig`] holds every runtime setting.  `main.rs` fills it from CLI
//! flags, environment variables and an optional TOML file.  Tests build it
//! directly, usually starting from [`ServerConfig::default`].

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use audio_gate_core::{DEFAULT_CREDENTIAL_WINDOW, DEFAULT_SESSION_LIFETIME};
use rand::distributions::Alphanumeric;
use rand::{Rng, RngCore};

/// Length of a generated admin password.
const GENERATED_ADMIN_PASSWORD_LEN: usize = 16;

/// Bytes of entropy in a generated cookie-signing secret.
const GENERATED_SESSION_SECRET_BYTES: usize = 32;

/// All runtime configuration for the audio gate.
///
/// # Example
///
/// ```rust
/// use audio_gate_server::domain::ServerConfig;
///
/// let cfg = ServerConfig::default();
/// assert_eq!(cfg.bind_addr.port(), 10000);
/// assert_eq!(cfg.device_port, 5005);
/// ```
#[derive(Clone)]
pub struct ServerConfig {
    /// Address the HTTP/WebSocket listener binds to.
    pub bind_addr: SocketAddr,

    /// Hostname or IP of the embedded device.  Resolved once at startup.
    pub device_host: String,

    /// UDP port of the embedded device.
    pub device_port: u16,

    /// Static admin password.  An empty string disables admin login.
    pub admin_password: String,

    /// Secret the cookie-signing key is derived from.
    ///
    /// Changing it invalidates every cookie already handed out.
    pub session_secret: String,

    /// How long an access code stays valid after it is issued.
    pub credential_window: Duration,

    /// How long a session lasts after login.
    pub session_lifetime: Duration,

    /// Externally visible base URL used in the QR login link, e.g.
    /// `https://gate.example.org`.  When `None` the link is built from the
    /// request's `Host` header.
    pub public_url: Option<String>,

    /// Directory served for paths the API does not handle (login page,
    /// streaming page, admin page).
    pub static_dir: Option<PathBuf>,

    /// Adds the `Secure` attribute to session cookies.
    pub secure_cookies: bool,
}

impl Default for ServerConfig {
    /// | Field             | Default               |
    /// |-------------------|-----------------------|
    /// | bind_addr         | `0.0.0.0:10000`       |
    /// | device_host       | `192.168.1.25`        |
    /// | device_port       | `5005`                |
    /// | admin_password    | random, 16 chars      |
    /// | session_secret    | random, 32 bytes hex  |
    /// | credential_window | 5 minutes             |
    /// | session_lifetime  | 30 minutes            |
    /// | public_url        | none                  |
    /// | static_dir        | none                  |
    /// | secure_cookies    | `false`               |
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 10000)),
            device_host: "192.168.1.25".to_string(),
            device_port: 5005,
            admin_password: generate_admin_password(),
            session_secret: generate_session_secret(),
            credential_window: DEFAULT_CREDENTIAL_WINDOW,
            session_lifetime: DEFAULT_SESSION_LIFETIME,
            public_url: None,
            static_dir: None,
            secure_cookies: false,
        }
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind_addr", &self.bind_addr)
            .field("device_host", &self.device_host)
            .field("device_port", &self.device_port)
            .field("admin_password", &"<redacted>")
            .field("session_secret", &"<redacted>")
            .field("credential_window", &self.credential_window)
            .field("session_lifetime", &self.session_lifetime)
            .field("public_url", &self.public_url)
            .field("static_dir", &self.static_dir)
            .field("secure_cookies", &self.secure_cookies)
            .finish()
    }
}

/// Random alphanumeric admin password.
pub fn generate_admin_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_ADMIN_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

/// 32 random bytes, hex encoded.
pub fn generate_session_secret() -> String {
    let mut bytes = [0u8; GENERATED_SESSION_SECRET_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
