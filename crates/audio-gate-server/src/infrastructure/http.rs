//! HTTP API: router, shared state and handlers.
//!
//! # Routes
//!
//! | Method | Path                     | Gate   |
//! |--------|--------------------------|--------|
//! | GET    | `/` (WebSocket or page)  | any*   |
//! | GET    | `/ws`                    | any    |
//! | POST   | `/api/login`             | none   |
//! | GET    | `/api/auth-status`       | none   |
//! | POST   | `/api/logout`            | none   |
//! | POST   | `/api/admin/login`       | none   |
//! | GET    | `/api/admin/auth-status` | none   |
//! | POST   | `/api/admin/logout`      | none   |
//! | GET    | `/api/admin/password`    | admin  |
//! | POST   | `/api/admin/regenerate`  | admin  |
//! | GET    | `/health`                | none   |
//!
//! \* only the WebSocket upgrade on `/` requires a session.

use std::path::Path;
use std::sync::Arc;

use audio_gate_core::{
    AuthError, Clock, CredentialStore, DatagramSink, EncodingError, SessionGate, SessionStore,
};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use thiserror::Error;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::application::{AdminError, AdminSurface};
use crate::domain::{
    AuthStatusResponse, CredentialView, ErrorResponse, LoginRequest, RegenerateResponse,
    ServerConfig, StatusResponse,
};
use crate::infrastructure::cookies::{SessionCookies, ADMIN_COOKIE, USER_COOKIE};
use crate::infrastructure::ws_bridge;

/// Header a TLS-terminating proxy uses to report the original scheme.
const FORWARDED_PROTO: &str = "x-forwarded-proto";

// ── Shared state ──────────────────────────────────────────────────────────────

/// Everything a handler needs, shared behind an `Arc`.
pub struct AppState {
    gate: Arc<SessionGate>,
    admin: AdminSurface,
    cookies: SessionCookies,
    sink: Arc<dyn DatagramSink>,
    public_url: Option<String>,
}

impl AppState {
    /// Builds the credential store, session store and gate from `config`.
    ///
    /// The first access code is issued here.
    pub fn new(config: &ServerConfig, clock: Arc<dyn Clock>, sink: Arc<dyn DatagramSink>) -> Self {
        let credentials = Arc::new(CredentialStore::new(config.credential_window, clock.clone()));
        let sessions = SessionStore::new(config.session_lifetime, clock);
        let gate = Arc::new(SessionGate::new(
            credentials,
            sessions,
            config.admin_password.clone(),
        ));

        Self {
            admin: AdminSurface::new(gate.clone()),
            gate,
            cookies: SessionCookies::new(
                &config.session_secret,
                config.session_lifetime,
                config.secure_cookies,
            ),
            sink,
            public_url: config.public_url.clone(),
        }
    }

    pub fn gate(&self) -> &Arc<SessionGate> {
        &self.gate
    }

    pub fn admin(&self) -> &AdminSurface {
        &self.admin
    }

    pub fn cookies(&self) -> &SessionCookies {
        &self.cookies
    }

    pub fn sink(&self) -> Arc<dyn DatagramSink> {
        Arc::clone(&self.sink)
    }

    /// Base URL for links handed to other devices.
    ///
    /// The configured public URL wins; otherwise the request's `Host` header
    /// and `X-Forwarded-Proto` (default `http`) are used.  A request without
    /// a `Host` header yields `http://`, which the QR renderer rejects.
    pub fn base_url(&self, headers: &HeaderMap) -> String {
        if let Some(url) = &self.public_url {
            return url.clone();
        }
        let host = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        let proto = headers
            .get(FORWARDED_PROTO)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or("http");
        format!("{proto}://{host}")
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Handler failures and their HTTP mapping.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Wrong or lapsed access code on `POST /api/login`.
    #[error("invalid or expired password")]
    InvalidAccessCode,

    /// Wrong admin password on `POST /api/admin/login`.
    #[error("invalid admin password")]
    InvalidAdminPassword,

    /// Missing session or wrong role.
    #[error(transparent)]
    Unauthorized(#[from] AuthError),

    /// QR link could not be produced.
    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

impl From<AdminError> for ApiError {
    fn from(err: AdminError) -> Self {
        match err {
            AdminError::Unauthorized(e) => Self::Unauthorized(e),
            AdminError::Encoding(e) => Self::Encoding(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::InvalidAccessCode => (
                StatusCode::UNAUTHORIZED,
                Json(StatusResponse::failed("Invalid or expired password")),
            )
                .into_response(),
            Self::InvalidAdminPassword => (
                StatusCode::UNAUTHORIZED,
                Json(StatusResponse::failed("Invalid admin password")),
            )
                .into_response(),
            Self::Unauthorized(_) => (
                StatusCode::UNAUTHORIZED,
                Json(StatusResponse::failed("Unauthorized")),
            )
                .into_response(),
            Self::Encoding(e) => {
                error!("QR generation failed: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: "Failed to generate QR code".to_string(),
                    }),
                )
                    .into_response()
            }
        }
    }
}

// ── Router ────────────────────────────────────────────────────────────────────

/// Builds the application router.
///
/// With `static_dir` set, any path not matched by a route is served from that
/// directory (login, streaming and admin pages).
pub fn build_router(state: Arc<AppState>, static_dir: Option<&Path>) -> Router {
    let router = Router::new()
        .route("/", get(ws_bridge::root))
        .route("/ws", get(ws_bridge::ws_endpoint))
        .route("/health", get(health))
        .route("/api/login", post(login))
        .route("/api/auth-status", get(auth_status))
        .route("/api/logout", post(logout))
        .route("/api/admin/login", post(admin_login))
        .route("/api/admin/auth-status", get(admin_auth_status))
        .route("/api/admin/logout", post(admin_logout))
        .route("/api/admin/password", get(admin_password))
        .route("/api/admin/regenerate", post(admin_regenerate))
        .with_state(state);

    let router = match static_dir {
        Some(dir) => {
            info!("serving static files from {}", dir.display());
            router.fallback_service(ServeDir::new(dir))
        }
        None => router,
    };

    router.layer(TraceLayer::new_for_http())
}

// ── Handlers ──────────────────────────────────────────────────────────────────

async fn health() -> &'static str {
    "ok"
}

/// Password from a login body.
///
/// A body that is not a JSON object with a string `password` (wrong content
/// type, malformed JSON, non-string value) reads as an empty password, which
/// never matches.
fn supplied_password(body: Result<Json<LoginRequest>, JsonRejection>) -> String {
    match body {
        Ok(Json(req)) => req.password,
        Err(rejection) => {
            debug!("unreadable login body: {rejection}");
            String::new()
        }
    }
}

async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let id = state
        .gate
        .login(&supplied_password(body))
        .map_err(|_| ApiError::InvalidAccessCode)?;

    // A browser logging in again replaces its previous session.
    let previous = state.cookies.read(&headers, USER_COOKIE);
    state.gate.logout(previous.as_ref());

    Ok((
        [(header::SET_COOKIE, state.cookies.issue(USER_COOKIE, id))],
        Json(StatusResponse::ok_with("Authentication successful")),
    )
        .into_response())
}

async fn auth_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Json<AuthStatusResponse> {
    let id = state.cookies.read(&headers, USER_COOKIE);
    Json(AuthStatusResponse {
        authenticated: state.gate.status(id.as_ref()),
    })
}

async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let id = state.cookies.read(&headers, USER_COOKIE);
    state.gate.logout(id.as_ref());
    (
        [(header::SET_COOKIE, state.cookies.clear(USER_COOKIE))],
        Json(StatusResponse::ok()),
    )
        .into_response()
}

async fn admin_login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let id = state
        .gate
        .admin_login(&supplied_password(body))
        .map_err(|_| ApiError::InvalidAdminPassword)?;

    let previous = state.cookies.read(&headers, ADMIN_COOKIE);
    state.gate.admin_logout(previous.as_ref());

    Ok((
        [(header::SET_COOKIE, state.cookies.issue(ADMIN_COOKIE, id))],
        Json(StatusResponse::ok_with("Admin authentication successful")),
    )
        .into_response())
}

async fn admin_auth_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Json<AuthStatusResponse> {
    let id = state.cookies.read(&headers, ADMIN_COOKIE);
    Json(AuthStatusResponse {
        authenticated: state.gate.admin_status(id.as_ref()),
    })
}

async fn admin_logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let id = state.cookies.read(&headers, ADMIN_COOKIE);
    state.gate.admin_logout(id.as_ref());
    (
        [(header::SET_COOKIE, state.cookies.clear(ADMIN_COOKIE))],
        Json(StatusResponse::ok()),
    )
        .into_response()
}

async fn admin_password(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<CredentialView>, ApiError> {
    let id = state.cookies.read(&headers, ADMIN_COOKIE);
    let base = state.base_url(&headers);
    let view = state.admin.credential_view(id.as_ref(), &base)?;
    Ok(Json(view))
}

async fn admin_regenerate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<RegenerateResponse>, ApiError> {
    let id = state.cookies.read(&headers, ADMIN_COOKIE);
    let password = state.admin.regenerate(id.as_ref())?;
    Ok(Json(RegenerateResponse {
        success: true,
        password,
    }))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    use async_trait::async_trait;
    use audio_gate_core::{ManualClock, TransportError};
    use axum::http::HeaderValue;

    struct NullSink;

    #[async_trait]
    impl DatagramSink for NullSink {
        async fn send_datagram(&self, _payload: &[u8]) -> Result<(), TransportError> {
            Ok(())
        }

        fn peer(&self) -> SocketAddr {
            "127.0.0.1:5005".parse().unwrap()
        }
    }

    fn state(public_url: Option<&str>) -> AppState {
        let config = ServerConfig {
            public_url: public_url.map(str::to_string),
            ..ServerConfig::default()
        };
        AppState::new(&config, Arc::new(ManualClock::new()), Arc::new(NullSink))
    }

    #[test]
    fn test_base_url_prefers_public_url() {
        let state = state(Some("https://gate.example.org"));
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("10.0.0.2:10000"));

        assert_eq!(state.base_url(&headers), "https://gate.example.org");
    }

    #[test]
    fn test_base_url_from_host_header_defaults_to_http() {
        let state = state(None);
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("10.0.0.2:10000"));

        assert_eq!(state.base_url(&headers), "http://10.0.0.2:10000");
    }

    #[test]
    fn test_base_url_honours_forwarded_proto() {
        let state = state(None);
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("gate.example.org"));
        headers.insert(FORWARDED_PROTO, HeaderValue::from_static("https, http"));

        assert_eq!(state.base_url(&headers), "https://gate.example.org");
    }

    #[test]
    fn test_unauthorized_maps_to_401() {
        let response = ApiError::from(AuthError::Unauthorized).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_encoding_error_maps_to_500() {
        let response =
            ApiError::from(EncodingError::Qr("data too long".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_admin_error_conversion_keeps_the_kind() {
        let err = ApiError::from(AdminError::Encoding(EncodingError::InvalidUrl("x".into())));
        assert!(matches!(err, ApiError::Encoding(EncodingError::InvalidUrl(_))));
    }
}
