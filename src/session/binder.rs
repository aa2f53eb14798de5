//! Nonce and identity accessors over a session store.
//!
//! Session key layout:
//! - `nonce` — pending challenge nonce (string)
//! - `siwe` — authenticated sign-in fields (object)
//!
//! Pure pass-through; validation lives in the verification engine.

use serde_json::Value;

use super::SessionStore;
use crate::siwe::{SiweError, SiweMessage};

pub const NONCE_KEY: &str = "nonce";
pub const IDENTITY_KEY: &str = "siwe";

pub fn store_nonce<S: SessionStore>(session: &S, nonce: &str) {
    session.set(NONCE_KEY, Value::String(nonce.to_string()));
}

pub fn nonce<S: SessionStore>(session: &S) -> Option<String> {
    match session.get(NONCE_KEY)? {
        Value::String(nonce) => Some(nonce),
        _ => None,
    }
}

/// Persist the authenticated field set and consume the pending nonce.
///
/// The nonce is single-use: once an identity is bound, the challenge that
/// produced it is gone and a replayed message fails the nonce check.
pub fn store_identity<S: SessionStore>(
    session: &S,
    message: &SiweMessage,
) -> Result<(), SiweError> {
    let fields = serde_json::to_value(message)
        .map_err(|e| SiweError::Internal(format!("serialize identity: {e}")))?;
    session.set(IDENTITY_KEY, fields);
    session.clear(NONCE_KEY);
    Ok(())
}

pub fn identity<S: SessionStore>(session: &S) -> Option<SiweMessage> {
    serde_json::from_value(session.get(IDENTITY_KEY)?).ok()
}
