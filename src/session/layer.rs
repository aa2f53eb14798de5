//! Axum glue: shared state, the session middleware, and extractors.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderValue},
    middleware::Next,
    response::Response,
};

use crate::config::Config;
use crate::error::AppError;
use crate::session::{
    binder,
    cookie::{CookieCodec, SESSION_COOKIE},
    Session,
};
use crate::siwe::{SiweMessage, VerificationEngine};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub engine: Arc<VerificationEngine>,
    pub sessions: Arc<CookieCodec>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let engine = VerificationEngine::new(
            config.expected_domain.clone(),
            config.expected_uri.clone(),
        );
        let sessions = CookieCodec::new(&config.session_secret);
        Self {
            config: Arc::new(config),
            engine: Arc::new(engine),
            sessions: Arc::new(sessions),
        }
    }
}

/// Decode the session cookie into a [`Session`], expose it to handlers via
/// request extensions, and set a fresh cookie when the session changed.
///
/// A missing, unsigned, or tampered cookie starts an empty session rather
/// than failing the request.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let data = session_token(&request)
        .and_then(|token| state.sessions.decode(token))
        .unwrap_or_default();
    let session = Session::from_data(data);
    request.extensions_mut().insert(session.clone());

    let mut response = next.run(request).await;

    if session.is_dirty() {
        match state.sessions.encode(&session.snapshot()) {
            Ok(token) => {
                let cookie = format!(
                    "{SESSION_COOKIE}={token}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
                    state.config.session_ttl_secs
                );
                match HeaderValue::from_str(&cookie) {
                    Ok(value) => {
                        response.headers_mut().insert(header::SET_COOKIE, value);
                    }
                    Err(e) => tracing::error!(error = %e, "Failed to build session cookie header"),
                }
            }
            Err(e) => tracing::error!(error = %e, "Failed to encode session cookie"),
        }
    }

    response
}

fn session_token(request: &Request) -> Option<&str> {
    let cookies = request.headers().get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').map(str::trim).find_map(|cookie| {
        cookie
            .strip_prefix(SESSION_COOKIE)
            .and_then(|rest| rest.strip_prefix('='))
    })
}

impl FromRequestParts<AppState> for Session {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session middleware not installed".to_string()))
    }
}

/// Extractor yielding the bound sign-in identity.
///
/// Returns 401 Unauthorized when the session has no authenticated identity.
pub struct Authenticated(pub SiweMessage);

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state).await?;
        binder::identity(&session)
            .map(Authenticated)
            .ok_or(AppError::Unauthorized)
    }
}
