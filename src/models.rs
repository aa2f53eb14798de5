//! Request models for the API.

use serde::Deserialize;

/// Body of `POST /verify`: the plaintext sign-in message exactly as the
/// wallet prepared it, and the hex signature it produced.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub message: String,
    pub signature: String,
}
