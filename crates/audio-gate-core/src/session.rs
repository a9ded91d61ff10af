//! Server-side session records.
//!
//! A session is what a browser holds after a successful login.  The browser
//! only ever sees the opaque [`SessionId`] (inside a signed cookie); the
//! record itself stays in the [`SessionStore`].
//!
//! Sessions expire on their own fixed lifetime, counted from the moment of
//! login and independent of the access code's window.  Expiry is checked
//! lazily: an expired record is removed the next time it is looked up, and
//! every new login sweeps out whatever else has expired.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

use tracing::debug;
use uuid::Uuid;

use crate::clock::{elapsed_since, Clock};

/// Default session lifetime.
pub const DEFAULT_SESSION_LIFETIME: Duration = Duration::from_secs(30 * 60);

/// Opaque session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generates a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// What a session is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// May open the audio bridge.
    User,
    /// May read and regenerate the access code.
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

/// One authenticated browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub authenticated: bool,
    pub established_at: SystemTime,
    pub role: Role,
}

/// Mapping from session id to session record, with lazy expiry.
pub struct SessionStore {
    sessions: Mutex<HashMap<SessionId, Session>>,
    lifetime: Duration,
    clock: Arc<dyn Clock>,
}

impl SessionStore {
    pub fn new(lifetime: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            lifetime,
            clock,
        }
    }

    /// Establishes a new authenticated session and returns its id.
    ///
    /// Expired records are swept out first.
    pub fn create(&self, role: Role) -> SessionId {
        let now = self.clock.now();
        let mut sessions = self.lock();
        self.sweep_locked(&mut sessions, now);

        let id = SessionId::new();
        sessions.insert(
            id,
            Session {
                authenticated: true,
                established_at: now,
                role,
            },
        );
        debug!(session = %id, role = role.as_str(), "session established");
        id
    }

    /// Looks a session up, removing it if it has outlived its lifetime.
    pub fn get(&self, id: &SessionId) -> Option<Session> {
        let now = self.clock.now();
        let mut sessions = self.lock();
        let expired = match sessions.get(id) {
            Some(session) => self.is_expired(session, now),
            None => return None,
        };
        if expired {
            sessions.remove(id);
            debug!(session = %id, "session expired");
            return None;
        }
        sessions.get(id).cloned()
    }

    /// Removes a session.  Returns `true` if it existed.  Idempotent.
    pub fn destroy(&self, id: &SessionId) -> bool {
        let removed = self.lock().remove(id).is_some();
        if removed {
            debug!(session = %id, "session destroyed");
        }
        removed
    }

    /// Removes every expired session and returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut sessions = self.lock();
        self.sweep_locked(&mut sessions, now)
    }

    /// Number of stored records, including not-yet-swept expired ones.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    fn is_expired(&self, session: &Session, now: SystemTime) -> bool {
        elapsed_since(now, session.established_at) >= self.lifetime
    }

    fn sweep_locked(&self, sessions: &mut HashMap<SessionId, Session>, now: SystemTime) -> usize {
        let before = sessions.len();
        sessions.retain(|_, s| !self.is_expired(s, now));
        before - sessions.len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SessionId, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("sessions", &self.len())
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
