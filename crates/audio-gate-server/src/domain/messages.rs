//! JSON request and response bodies for the HTTP API.
//!
//! Field names on the wire are camelCase because the browser pages read them
//! directly (`qrCode`, `expiresIn`, `createdAt`).

use serde::{Deserialize, Serialize};

/// Body of `POST /api/login` and `POST /api/admin/login`.
///
/// A missing `password` field is treated as an empty string, which never
/// matches anything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub password: String,
}

/// `{success, message?}` returned by the login and logout endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn ok_with(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// Body of the `auth-status` endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthStatusResponse {
    pub authenticated: bool,
}

/// What the admin page shows: the live code, its QR code and how long it
/// has left.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialView {
    /// The live access code.
    pub password: String,
    /// `data:image/png;base64,...` QR code of the login link.
    pub qr_code: String,
    /// Whole seconds of validity left.
    pub expires_in: u64,
    /// Local issuance time, formatted for display.
    pub created_at: String,
}

/// Body of `POST /api/admin/regenerate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegenerateResponse {
    pub success: bool,
    pub password: String,
}

/// Body of 5xx responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
