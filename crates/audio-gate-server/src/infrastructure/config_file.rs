//! Optional TOML configuration file.
//!
//! Every key is optional; anything left out falls through to the built-in
//! default.  CLI flags and environment variables override the file.
//!
//! ```toml
//! port = 10000
//! bind = "0.0.0.0"
//! device_host = "192.168.1.25"
//! device_port = 5005
//! admin_password = "change-me"
//! credential_window_secs = 300
//! session_lifetime_secs = 1800
//! public_url = "https://gate.example.org"
//! static_dir = "/usr/share/audio-gate/www"
//! secure_cookies = true
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur while loading the config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Contents of the TOML config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub port: Option<u16>,
    pub bind: Option<String>,
    pub device_host: Option<String>,
    pub device_port: Option<u16>,
    pub admin_password: Option<String>,
    pub session_secret: Option<String>,
    pub credential_window_secs: Option<u64>,
    pub session_lifetime_secs: Option<u64>,
    pub public_url: Option<String>,
    pub static_dir: Option<PathBuf>,
    pub secure_cookies: Option<bool>,
}

impl FileConfig {
    /// Reads and parses `path`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] if the file cannot be read, [`ConfigError::Parse`]
    /// if it is not valid TOML or contains an unknown key.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "audio-gate-config-{}.toml",
            uuid::Uuid::new_v4()
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_full_file() {
        // Arrange
        let path = temp_file(
            r#"
            port = 8080
            bind = "127.0.0.1"
            device_host = "esp32.local"
            device_port = 6000
            admin_password = "from-file"
            credential_window_secs = 120
            session_lifetime_secs = 600
            public_url = "https://gate.example.org"
            static_dir = "/srv/www"
            secure_cookies = true
            "#,
        );

        // Act
        let cfg = FileConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        // Assert
        assert_eq!(cfg.port, Some(8080));
        assert_eq!(cfg.bind.as_deref(), Some("127.0.0.1"));
        assert_eq!(cfg.device_host.as_deref(), Some("esp32.local"));
        assert_eq!(cfg.device_port, Some(6000));
        assert_eq!(cfg.admin_password.as_deref(), Some("from-file"));
        assert_eq!(cfg.credential_window_secs, Some(120));
        assert_eq!(cfg.session_lifetime_secs, Some(600));
        assert_eq!(cfg.public_url.as_deref(), Some("https://gate.example.org"));
        assert_eq!(cfg.static_dir, Some(PathBuf::from("/srv/www")));
        assert_eq!(cfg.secure_cookies, Some(true));
        assert_eq!(cfg.session_secret, None);
    }

    #[test]
    fn test_empty_file_is_all_none() {
        let path = temp_file("");
        let cfg = FileConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(cfg, FileConfig::default());
    }

    #[test]
    fn test_unknown_key_is_a_parse_error() {
        let path = temp_file("ws_port = 1\n");
        let err = FileConfig::load(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let err = FileConfig::load(Path::new("/nonexistent/audio-gate.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/audio-gate.toml"));
    }
}
