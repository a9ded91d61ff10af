//! Signed session cookies.
//!
//! Each cookie carries a [`SessionId`] and an HMAC tag computed with a key
//! derived from the configured session secret.  A cookie whose tag does not
//! verify is treated exactly like a missing cookie.

use std::time::Duration;

use audio_gate_core::SessionId;
use axum::http::{header, HeaderMap};
use cookie::{Cookie, CookieJar, Key, SameSite};
use sha2::{Digest, Sha512};
use tracing::debug;

/// Cookie holding a user (access-code) session.
pub const USER_COOKIE: &str = "audio_gate_session";

/// Cookie holding an admin session.
pub const ADMIN_COOKIE: &str = "audio_gate_admin";

/// Issues, reads and clears signed session cookies.
#[derive(Clone)]
pub struct SessionCookies {
    key: Key,
    max_age: Duration,
    secure: bool,
}

impl SessionCookies {
    /// `secret` may be any length; the 64-byte signing key is its SHA-512.
    pub fn new(secret: &str, max_age: Duration, secure: bool) -> Self {
        let digest = Sha512::digest(secret.as_bytes());
        Self {
            key: Key::from(digest.as_slice()),
            max_age,
            secure,
        }
    }

    /// The signed cookie for `id`, ready to be sent.
    pub fn signed_cookie(&self, name: &'static str, id: SessionId) -> Cookie<'static> {
        let cookie = Cookie::build((name, id.to_string()))
            .http_only(true)
            .same_site(SameSite::Lax)
            .path("/")
            .secure(self.secure)
            .max_age(cookie::time::Duration::seconds(self.max_age_secs()))
            .build();

        let mut jar = CookieJar::new();
        jar.signed_mut(&self.key).add(cookie);
        jar.get(name).cloned().unwrap_or_else(|| Cookie::new(name, ""))
    }

    /// `Set-Cookie` header value that stores `id` under `name`.
    pub fn issue(&self, name: &'static str, id: SessionId) -> String {
        self.signed_cookie(name, id).to_string()
    }

    /// `Set-Cookie` header value that deletes `name` in the browser.
    pub fn clear(&self, name: &'static str) -> String {
        Cookie::build((name, ""))
            .http_only(true)
            .same_site(SameSite::Lax)
            .path("/")
            .secure(self.secure)
            .max_age(cookie::time::Duration::ZERO)
            .build()
            .to_string()
    }

    /// Session id from the verified cookie `name`, if any.
    ///
    /// Unsigned, tampered or malformed cookies yield `None`.
    pub fn read(&self, headers: &HeaderMap, name: &str) -> Option<SessionId> {
        let mut jar = CookieJar::new();
        for value in headers.get_all(header::COOKIE) {
            let Ok(raw) = value.to_str() else {
                continue;
            };
            for parsed in Cookie::split_parse(raw).flatten() {
                jar.add_original(parsed.into_owned());
            }
        }

        let Some(verified) = jar.signed(&self.key).get(name) else {
            if jar.get(name).is_some() {
                debug!(cookie = name, "discarding cookie with bad signature");
            }
            return None;
        };
        verified.value().parse().ok()
    }

    fn max_age_secs(&self) -> i64 {
        i64::try_from(self.max_age.as_secs()).unwrap_or(i64::MAX)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
