//! API route handlers.

pub mod auth;

use crate::session::layer::AppState;
use axum::{routing::get, routing::post, Router};

/// Build the API router with all endpoints.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/nonce", get(auth::nonce))
        .route("/verify", post(auth::verify))
        .route("/personal_information", get(auth::personal_information))
}
