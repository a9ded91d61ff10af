//! Admin surface: the operator's view of the live access code.
//!
//! Both operations are gated on an admin-role session.  A rejected call
//! leaves the credential store exactly as it was.

use std::sync::Arc;
use std::time::SystemTime;

use audio_gate_core::{AuthError, EncodingError, SessionGate, SessionId};
use chrono::{DateTime, Local};
use thiserror::Error;
use tracing::{info, warn};

use crate::application::qr::login_qr_data_url;
use crate::domain::CredentialView;

/// Display format for the issuance time, e.g. `10/15/2026, 9:05:07 AM`.
const CREATED_AT_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

/// Why an admin request failed.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Unauthorized(#[from] AuthError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

/// Admin operations on top of the shared [`SessionGate`].
#[derive(Clone)]
pub struct AdminSurface {
    gate: Arc<SessionGate>,
}

impl AdminSurface {
    pub fn new(gate: Arc<SessionGate>) -> Self {
        Self { gate }
    }

    /// Live code, its QR login link and remaining validity.
    ///
    /// A lapsed code is rotated first, so the view never shows a code that
    /// would be refused.
    ///
    /// # Errors
    ///
    /// - [`AdminError::Unauthorized`] without an admin session.
    /// - [`AdminError::Encoding`] if `base_url` is unusable or rendering
    ///   fails.
    pub fn credential_view(
        &self,
        session: Option<&SessionId>,
        base_url: &str,
    ) -> Result<CredentialView, AdminError> {
        self.gate.require_admin(session)?;

        let snapshot = self.gate.credentials().fresh_snapshot();
        let qr_code = login_qr_data_url(base_url, &snapshot.secret).map_err(|e| {
            warn!("failed to render login QR code: {e}");
            e
        })?;

        Ok(CredentialView {
            password: snapshot.secret,
            qr_code,
            expires_in: snapshot.remaining.as_secs(),
            created_at: format_issued_at(snapshot.issued_at),
        })
    }

    /// Issues a new code immediately and returns it.
    ///
    /// # Errors
    ///
    /// [`AuthError::Unauthorized`] without an admin session.
    pub fn regenerate(&self, session: Option<&SessionId>) -> Result<String, AuthError> {
        self.gate.require_admin(session)?;
        let secret = self.gate.credentials().issue();
        info!("access code regenerated by admin");
        Ok(secret)
    }
}

/// Formats `at` in the server's local time zone.
pub fn format_issued_at(at: SystemTime) -> String {
    DateTime::<Local>::from(at)
        .format(CREATED_AT_FORMAT)
        .to_string()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
