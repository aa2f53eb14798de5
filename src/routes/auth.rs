//! Auth API endpoints.

use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::error::AppError;
use crate::models::VerifyRequest;
use crate::session::binder;
use crate::session::layer::{AppState, Authenticated};
use crate::session::Session;
use crate::siwe;

/// GET /nonce — issue a fresh challenge nonce
///
/// The nonce is returned as plain text and stored as the session's pending
/// challenge, replacing any earlier one.
pub async fn nonce(session: Session) -> impl IntoResponse {
    let nonce = siwe::generate_nonce();
    binder::store_nonce(&session, &nonce);
    nonce
}

/// POST /verify — verify a signed message against the pending challenge
pub async fn verify(
    State(state): State<AppState>,
    session: Session,
    body: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = body.map_err(|_| AppError::MissingMessage)?;
    if req.message.is_empty() {
        return Err(AppError::MissingMessage);
    }

    let message = state
        .engine
        .verify(&req.message, &req.signature, &session)
        .map_err(|e| {
            tracing::warn!(action = "auth_failed", error = %e, "Sign-in rejected");
            AppError::from(e)
        })?;

    tracing::info!(
        action = "auth_success",
        address = %message.address,
        domain = %message.domain,
        chain_id = message.chain_id,
        "Sign-in verified"
    );

    Ok(Json(json!({})))
}

/// GET /personal_information — report the authenticated address
pub async fn personal_information(Authenticated(identity): Authenticated) -> String {
    format!(
        "You are authenticated and your address is: {}",
        identity.address
    )
}
