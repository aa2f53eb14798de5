//! Signed session cookie codec.
//!
//! Session state travels client-side as `base64url(json) "." base64url(tag)`
//! where the tag is HMAC-SHA256 over the payload half. A token that fails
//! authentication decodes to nothing and the request starts with an empty
//! session.

use std::collections::BTreeMap;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

/// Cookie carrying the signed session token.
pub const SESSION_COOKIE: &str = "session";

/// Encodes and authenticates session tokens with a server-held secret.
pub struct CookieCodec {
    key: Zeroizing<Vec<u8>>,
}

impl CookieCodec {
    pub fn new(secret: &str) -> Self {
        Self {
            key: Zeroizing::new(secret.as_bytes().to_vec()),
        }
    }

    pub fn encode(&self, data: &BTreeMap<String, Value>) -> Result<String, serde_json::Error> {
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(data)?);
        let tag = URL_SAFE_NO_PAD.encode(self.mac(payload.as_bytes()).finalize().into_bytes());
        Ok(format!("{payload}.{tag}"))
    }

    /// Decode and authenticate a token.
    ///
    /// Any defect (shape, signature, payload) yields `None` rather than an
    /// error: an unauthenticated token is simply not a session.
    pub fn decode(&self, token: &str) -> Option<BTreeMap<String, Value>> {
        let (payload, tag) = token.rsplit_once('.')?;
        let tag = URL_SAFE_NO_PAD.decode(tag).ok()?;
        // verify_slice is constant-time.
        self.mac(payload.as_bytes()).verify_slice(&tag).ok()?;
        let json = Zeroizing::new(URL_SAFE_NO_PAD.decode(payload).ok()?);
        serde_json::from_slice(&json).ok()
    }

    fn mac(&self, data: &[u8]) -> HmacSha256 {
        let mut mac =
            HmacSha256::new_from_slice(&self.key).expect("HMAC-SHA256 accepts any key length");
        mac.update(data);
        mac
    }
}
