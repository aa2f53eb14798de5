//! Error types and Axum response conversions.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::siwe::SiweError;

/// Application error surfaced at the HTTP boundary.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Siwe(#[from] SiweError),

    #[error("missing sign-in message")]
    MissingMessage,

    #[error("not signed in")]
    Unauthorized,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// 440 Login Time-out: non-standard, but the status clients key on to
/// distinguish "request a fresh challenge and re-sign" from other 4xx
/// rejections.
fn login_timeout() -> StatusCode {
    StatusCode::from_u16(440).unwrap_or(StatusCode::UNAUTHORIZED)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Siwe(err) => siwe_response(err),
            AppError::MissingMessage => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Expected prepareMessage object as body.".to_string(),
            ),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "You have to sign in first.".to_string(),
            ),
            AppError::Internal(detail) => {
                tracing::error!(error = %detail, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Unknown error: {detail}"),
                )
            }
        };

        let body = Json(json!({
            "message": message
        }));

        (status, body).into_response()
    }
}

fn siwe_response(err: &SiweError) -> (StatusCode, String) {
    match err {
        SiweError::Expired => (login_timeout(), "Message expired.".to_string()),
        SiweError::NotYetValid => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "Message not yet valid.".to_string(),
        ),
        SiweError::InvalidNonce => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "Invalid nonce.".to_string(),
        ),
        SiweError::InvalidSignature(_) | SiweError::AddressMismatch { .. } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "Invalid signature".to_string(),
        ),
        SiweError::Internal(detail) => {
            tracing::error!(error = %detail, "Verification fault");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Unknown error: {detail}"),
            )
        }
        // Parse and structural failures carry their detail to the client.
        other => (StatusCode::UNPROCESSABLE_ENTITY, other.to_string()),
    }
}
