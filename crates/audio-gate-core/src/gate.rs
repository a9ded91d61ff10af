//! The session gate: turns a correct access code (or the admin password)
//! into a session, and answers "is this caller allowed?" afterwards.
//!
//! # Two roles, two secrets
//!
//! ```text
//! user  login ── access code (rotates, 5 min) ──► Role::User  session
//! admin login ── static admin password        ──► Role::Admin session
//! ```
//!
//! Every failure is the same [`AuthError::Unauthorized`], whether the code
//! was wrong, lapsed, or the session has the wrong role.  Callers cannot probe
//! where the expiry boundary lies.

use std::fmt;
use std::sync::Arc;

use subtle::ConstantTimeEq;
use tracing::{info, warn};

use crate::credential::CredentialStore;
use crate::error::AuthError;
use crate::session::{Role, SessionId, SessionStore};

pub struct SessionGate {
    credentials: Arc<CredentialStore>,
    sessions: SessionStore,
    admin_password: String,
}

impl SessionGate {
    pub fn new(
        credentials: Arc<CredentialStore>,
        sessions: SessionStore,
        admin_password: impl Into<String>,
    ) -> Self {
        Self {
            credentials,
            sessions,
            admin_password: admin_password.into(),
        }
    }

    /// Validates an access code and opens a user session.
    ///
    /// # Errors
    ///
    /// [`AuthError::Unauthorized`] if the code does not match the live code
    /// or the live code has lapsed.
    pub fn login(&self, supplied_secret: &str) -> Result<SessionId, AuthError> {
        if !self.credentials.verify(supplied_secret) {
            warn!("user login rejected");
            return Err(AuthError::Unauthorized);
        }
        let id = self.sessions.create(Role::User);
        info!(session = %id, "user logged in");
        Ok(id)
    }

    /// Whether `id` names a live, authenticated user session.
    pub fn status(&self, id: Option<&SessionId>) -> bool {
        self.has_role(id, Role::User)
    }

    /// Destroys a user session.  Idempotent; unknown ids are ignored.
    pub fn logout(&self, id: Option<&SessionId>) {
        self.destroy_with_role(id, Role::User);
    }

    /// Validates the static admin password and opens an admin session.
    ///
    /// # Errors
    ///
    /// [`AuthError::Unauthorized`] on mismatch.
    pub fn admin_login(&self, supplied_password: &str) -> Result<SessionId, AuthError> {
        let matches: bool = supplied_password
            .as_bytes()
            .ct_eq(self.admin_password.as_bytes())
            .into();
        if !matches || self.admin_password.is_empty() {
            warn!("admin login rejected");
            return Err(AuthError::Unauthorized);
        }
        let id = self.sessions.create(Role::Admin);
        info!(session = %id, "admin logged in");
        Ok(id)
    }

    /// Whether `id` names a live, authenticated admin session.
    pub fn admin_status(&self, id: Option<&SessionId>) -> bool {
        self.has_role(id, Role::Admin)
    }

    /// Destroys an admin session.  Idempotent.
    pub fn admin_logout(&self, id: Option<&SessionId>) {
        self.destroy_with_role(id, Role::Admin);
    }

    /// Succeeds only for a live admin session.
    ///
    /// # Errors
    ///
    /// [`AuthError::Unauthorized`] for a missing, expired or user-role session.
    pub fn require_admin(&self, id: Option<&SessionId>) -> Result<(), AuthError> {
        if self.admin_status(id) {
            Ok(())
        } else {
            Err(AuthError::Unauthorized)
        }
    }

    /// Succeeds for any live authenticated session, user or admin.
    ///
    /// Gates the audio bridge.
    pub fn require_any(&self, ids: &[Option<&SessionId>]) -> Result<Role, AuthError> {
        ids.iter()
            .flatten()
            .find_map(|id| {
                self.sessions
                    .get(id)
                    .filter(|s| s.authenticated)
                    .map(|s| s.role)
            })
            .ok_or(AuthError::Unauthorized)
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    fn has_role(&self, id: Option<&SessionId>, role: Role) -> bool {
        id.and_then(|id| self.sessions.get(id))
            .map(|s| s.authenticated && s.role == role)
            .unwrap_or(false)
    }

    // Only destroys a record of the matching role so a user-logout request
    // carrying an admin id cannot end the admin's session.
    fn destroy_with_role(&self, id: Option<&SessionId>, role: Role) {
        let Some(id) = id else { return };
        if self.sessions.get(id).map(|s| s.role) == Some(role) {
            self.sessions.destroy(id);
            info!(session = %id, role = role.as_str(), "logged out");
        }
    }
}

impl fmt::Debug for SessionGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionGate")
            .field("credentials", &self.credentials)
            .field("sessions", &self.sessions)
            .field("admin_password", &"<redacted>")
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
