//! The credential store: one live access code with a hard time-to-live.
//!
//! # Lifecycle
//!
//! ```text
//! new() ──issue──► live ──(window elapses)──► lapsed ──next ensure_fresh()──► live (new code)
//!                   ▲                                                           │
//!                   └──────────────── issue() (admin regenerate) ◄──────────────┘
//! ```
//!
//! There is no background timer.  A lapsed code is only replaced the next
//! time anyone asks for it (`ensure_fresh`, `verify`, `fresh_snapshot`), so
//! from a caller's point of view the TTL is still hard: nobody can ever
//! observe a lapsed code as valid.
//!
//! # Concurrency
//!
//! The live credential sits behind a single `Mutex`.  Every operation that
//! both checks and replaces the code does so while holding the lock, so two
//! requests racing past the expiry boundary cannot each install their own
//! code: the second one sees the first one's fresh code and leaves it alone.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

use rand::Rng;
use subtle::ConstantTimeEq;
use tracing::{debug, info};

use crate::clock::{elapsed_since, Clock};

/// Number of characters in an access code.
pub const SECRET_LEN: usize = 8;

/// Characters an access code is drawn from: easy to read aloud and type on a
/// phone keyboard.
pub const SECRET_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// How long a freshly issued code is accepted.
pub const DEFAULT_CREDENTIAL_WINDOW: Duration = Duration::from_secs(5 * 60);

#[derive(Clone)]
struct Credential {
    secret: String,
    issued_at: SystemTime,
}

/// A consistent view of the live credential, read under one lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialSnapshot {
    /// The access code.
    pub secret: String,
    /// When the code was issued.
    pub issued_at: SystemTime,
    /// Time left before the code lapses.  Zero once lapsed.
    pub remaining: Duration,
}

/// Holds the single live access code.
///
/// Share it across request handlers with an `Arc<CredentialStore>`; all
/// methods take `&self`.
pub struct CredentialStore {
    current: Mutex<Credential>,
    window: Duration,
    clock: Arc<dyn Clock>,
}

impl CredentialStore {
    /// Creates a store and issues the first code immediately.
    pub fn new(window: Duration, clock: Arc<dyn Clock>) -> Self {
        let first = Credential {
            secret: generate_secret(),
            issued_at: clock.now(),
        };
        info!(window_secs = window.as_secs(), "initial access code issued");
        Self {
            current: Mutex::new(first),
            window,
            clock,
        }
    }

    /// Issues a new code unconditionally and returns it.
    ///
    /// The previous code stops working immediately, including any QR code
    /// or link that embedded it.
    pub fn issue(&self) -> String {
        let mut current = self.lock();
        let now = self.clock.now();
        replace(&mut current, now)
    }

    /// Returns `true` iff the live code is still inside its window.
    pub fn is_valid(&self) -> bool {
        let current = self.lock();
        self.valid_at(&current, self.clock.now())
    }

    /// Replaces the live code if it has lapsed.
    ///
    /// Returns `true` when a new code was issued.  Calling this repeatedly
    /// inside the window never changes the code.
    pub fn ensure_fresh(&self) -> bool {
        let mut current = self.lock();
        let now = self.clock.now();
        if self.valid_at(&current, now) {
            return false;
        }
        replace(&mut current, now);
        true
    }

    /// Checks a code supplied by a browser.
    ///
    /// Refreshes a lapsed code first, then compares in constant time and
    /// re-checks validity at the same instant.  All of this happens under one
    /// lock so a concurrent regenerate cannot slip in between.
    pub fn verify(&self, supplied: &str) -> bool {
        let mut current = self.lock();
        let now = self.clock.now();
        if !self.valid_at(&current, now) {
            replace(&mut current, now);
        }
        let matches: bool = supplied
            .as_bytes()
            .ct_eq(current.secret.as_bytes())
            .into();
        matches && self.valid_at(&current, now)
    }

    /// The live code, whether or not it has lapsed.
    pub fn current_secret(&self) -> String {
        self.lock().secret.clone()
    }

    /// When the live code was issued.
    pub fn issued_at(&self) -> SystemTime {
        self.lock().issued_at
    }

    /// Time left before the live code lapses.  Zero once lapsed.
    pub fn remaining_validity(&self) -> Duration {
        let current = self.lock();
        self.remaining_at(&current, self.clock.now())
    }

    /// The configured validity window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Reads the live credential without refreshing it.
    pub fn snapshot(&self) -> CredentialSnapshot {
        let current = self.lock();
        let now = self.clock.now();
        CredentialSnapshot {
            secret: current.secret.clone(),
            issued_at: current.issued_at,
            remaining: self.remaining_at(&current, now),
        }
    }

    /// Refreshes a lapsed code, then reads it.  Used for display.
    pub fn fresh_snapshot(&self) -> CredentialSnapshot {
        let mut current = self.lock();
        let now = self.clock.now();
        if !self.valid_at(&current, now) {
            replace(&mut current, now);
        }
        CredentialSnapshot {
            secret: current.secret.clone(),
            issued_at: current.issued_at,
            remaining: self.remaining_at(&current, now),
        }
    }

    fn valid_at(&self, credential: &Credential, now: SystemTime) -> bool {
        elapsed_since(now, credential.issued_at) < self.window
    }

    fn remaining_at(&self, credential: &Credential, now: SystemTime) -> Duration {
        self.window
            .saturating_sub(elapsed_since(now, credential.issued_at))
    }

    // A poisoned lock only means another thread panicked mid-read; the
    // credential itself is always left in a consistent state.
    fn lock(&self) -> MutexGuard<'_, Credential> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("secret", &"<redacted>")
            .field("window", &self.window)
            .finish()
    }
}

/// Installs a new code that differs from the current one.
fn replace(current: &mut Credential, now: SystemTime) -> String {
    let mut next = generate_secret();
    while next == current.secret {
        next = generate_secret();
    }
    current.secret = next;
    current.issued_at = now;
    info!("access code rotated");
    debug!(secret = %current.secret, "new access code");
    current.secret.clone()
}

/// Generates a random access code of [`SECRET_LEN`] characters from
/// [`SECRET_ALPHABET`].
///
/// Uses the thread-local CSPRNG (ChaCha seeded from the OS).
pub fn generate_secret() -> String {
    let mut rng = rand::thread_rng();
    (0..SECRET_LEN)
        .map(|_| SECRET_ALPHABET[rng.gen_range(0..SECRET_ALPHABET.len())] as char)
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn make_store() -> (CredentialStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let store = CredentialStore::new(DEFAULT_CREDENTIAL_WINDOW, clock.clone());
        (store, clock)
    }

    #[test]
    fn test_generate_secret_has_fixed_length_and_alphabet() {
        for _ in 0..100 {
            let secret = generate_secret();
            assert_eq!(secret.len(), SECRET_LEN);
            assert!(secret.bytes().all(|b| SECRET_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_new_store_is_valid() {
        let (store, _clock) = make_store();
        assert!(store.is_valid());
        assert_eq!(store.remaining_validity(), DEFAULT_CREDENTIAL_WINDOW);
    }

    #[test]
    fn test_valid_one_millisecond_before_window_ends() {
        let (store, clock) = make_store();
        clock.advance(DEFAULT_CREDENTIAL_WINDOW - Duration::from_millis(1));
        assert!(store.is_valid());
        assert_eq!(store.remaining_validity(), Duration::from_millis(1));
    }

    #[test]
    fn test_invalid_one_millisecond_after_window_ends() {
        let (store, clock) = make_store();
        clock.advance(DEFAULT_CREDENTIAL_WINDOW + Duration::from_millis(1));
        assert!(!store.is_valid());
        assert_eq!(store.remaining_validity(), Duration::ZERO);
    }

    #[test]
    fn test_invalid_exactly_at_window_end() {
        let (store, clock) = make_store();
        clock.advance(DEFAULT_CREDENTIAL_WINDOW);
        assert!(!store.is_valid());
    }

    #[test]
    fn test_is_valid_does_not_rotate() {
        let (store, clock) = make_store();
        let before = store.current_secret();
        clock.advance(DEFAULT_CREDENTIAL_WINDOW * 2);
        assert!(!store.is_valid());
        assert_eq!(store.current_secret(), before);
    }

    #[test]
    fn test_ensure_fresh_is_idempotent_inside_window() {
        let (store, clock) = make_store();
        let original = store.current_secret();
        for _ in 0..10 {
            clock.advance(Duration::from_secs(20));
            assert!(!store.ensure_fresh());
            assert_eq!(store.current_secret(), original);
        }
    }

    #[test]
    fn test_ensure_fresh_rotates_lapsed_code() {
        let (store, clock) = make_store();
        let original = store.current_secret();
        clock.advance(DEFAULT_CREDENTIAL_WINDOW);

        assert!(store.ensure_fresh());
        assert_ne!(store.current_secret(), original);
        assert!(store.is_valid());
        assert_eq!(store.issued_at(), clock.now());
    }

    #[test]
    fn test_issue_replaces_code_inside_window() {
        let (store, clock) = make_store();
        let original = store.current_secret();
        clock.advance(Duration::from_secs(60));

        let issued = store.issue();
        assert_ne!(issued, original);
        assert_eq!(store.current_secret(), issued);
        assert_eq!(store.remaining_validity(), DEFAULT_CREDENTIAL_WINDOW);
    }

    #[test]
    fn test_verify_accepts_current_code() {
        let (store, _clock) = make_store();
        let secret = store.current_secret();
        assert!(store.verify(&secret));
    }

    #[test]
    fn test_verify_rejects_wrong_code() {
        let (store, _clock) = make_store();
        assert!(!store.verify("WRONG123"));
        assert!(!store.verify(""));
    }

    #[test]
    fn test_verify_rejects_lapsed_code_and_rotates() {
        let (store, clock) = make_store();
        let secret = store.current_secret();
        clock.advance(DEFAULT_CREDENTIAL_WINDOW + Duration::from_secs(1));

        assert!(!store.verify(&secret));
        assert_ne!(store.current_secret(), secret);
    }

    #[test]
    fn test_verify_is_case_sensitive() {
        let (store, _clock) = make_store();
        let secret = store.current_secret();
        let lower = secret.to_ascii_lowercase();
        if lower != secret {
            assert!(!store.verify(&lower));
        }
    }

    #[test]
    fn test_fresh_snapshot_rotates_lapsed_code() {
        let (store, clock) = make_store();
        let original = store.current_secret();
        clock.advance(DEFAULT_CREDENTIAL_WINDOW + Duration::from_secs(5));

        let snap = store.fresh_snapshot();
        assert_ne!(snap.secret, original);
        assert_eq!(snap.remaining, DEFAULT_CREDENTIAL_WINDOW);
        assert_eq!(snap.issued_at, clock.now());
    }

    #[test]
    fn test_snapshot_does_not_rotate() {
        let (store, clock) = make_store();
        let original = store.current_secret();
        clock.advance(DEFAULT_CREDENTIAL_WINDOW + Duration::from_secs(5));

        let snap = store.snapshot();
        assert_eq!(snap.secret, original);
        assert_eq!(snap.remaining, Duration::ZERO);
    }

    #[test]
    fn test_clock_stepping_backwards_keeps_code_valid() {
        let (store, clock) = make_store();
        clock.advance(Duration::from_secs(100));
        store.issue();
        clock.rewind(Duration::from_secs(50));
        assert!(store.is_valid());
        assert_eq!(store.remaining_validity(), DEFAULT_CREDENTIAL_WINDOW);
    }

    #[test]
    fn test_debug_output_redacts_secret() {
        let (store, _clock) = make_store();
        let secret = store.current_secret();
        let debug = format!("{store:?}");
        assert!(!debug.contains(&secret));
        assert!(debug.contains("<redacted>"));
    }
}
