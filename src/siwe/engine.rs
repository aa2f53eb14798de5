//! The verification state machine.
//!
//! Ordered pass over one `{message, signature}` pair:
//! parse, then origin checks, then signature recovery, then the session
//! nonce, then the validity window, and finally the session bind. The
//! first failed step wins and nothing is persisted for it.

use chrono::Utc;

use super::{verify, SiweError, SiweMessage};
use crate::session::{binder, SessionStore};

/// Verifies signed sign-in messages against a session's pending challenge.
pub struct VerificationEngine {
    expected_domain: Option<String>,
    expected_uri: Option<String>,
}

impl VerificationEngine {
    /// `expected_domain` / `expected_uri`, when set, pin the origin a
    /// message may claim.
    pub fn new(expected_domain: Option<String>, expected_uri: Option<String>) -> Self {
        Self {
            expected_domain,
            expected_uri,
        }
    }

    /// Run the full verification pass. On success the authenticated field
    /// set has been bound into the session and the pending nonce consumed.
    pub fn verify<S: SessionStore>(
        &self,
        raw: &str,
        signature: &str,
        session: &S,
    ) -> Result<SiweMessage, SiweError> {
        let message: SiweMessage = raw.parse()?;

        if let Some(expected) = &self.expected_domain {
            if message.domain != *expected {
                return Err(SiweError::DomainMismatch {
                    field: "domain",
                    expected: expected.clone(),
                    actual: message.domain.clone(),
                });
            }
        }
        if let Some(expected) = &self.expected_uri {
            if message.uri != *expected {
                return Err(SiweError::DomainMismatch {
                    field: "URI",
                    expected: expected.clone(),
                    actual: message.uri.clone(),
                });
            }
        }

        // The signature covers the canonical text, which the round-trip
        // law guarantees equals the input for anything parse accepted.
        let signature = verify::decode_signature(signature)?;
        let canonical = message.to_string();
        verify::verify_signature(canonical.as_bytes(), &signature, &message.address)?;

        match binder::nonce(session) {
            Some(expected) if expected == message.nonce => {}
            Some(_) => {
                tracing::debug!(action = "nonce_mismatch", "message nonce does not match session");
                return Err(SiweError::InvalidNonce);
            }
            None => {
                tracing::debug!(action = "nonce_missing", "no pending challenge for session");
                return Err(SiweError::InvalidNonce);
            }
        }

        let now = Utc::now();
        if let Some(nbf) = &message.not_before {
            if now < nbf.datetime() {
                return Err(SiweError::NotYetValid);
            }
        }
        if let Some(exp) = &message.expiration_time {
            if now >= exp.datetime() {
                return Err(SiweError::Expired);
            }
        }

        binder::store_identity(session, &message)?;
        Ok(message)
    }
}
