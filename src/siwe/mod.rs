//! Sign-In with Ethereum (EIP-4361) core.
//!
//! Nonce generation, the message model with its canonical text form,
//! EIP-191 signature recovery, and the verification state machine that
//! ties them together.

pub mod address;
pub mod engine;
pub mod message;
pub mod nonce;
pub mod verify;

pub use address::Address;
pub use engine::VerificationEngine;
pub use message::{SiweMessage, TimeStamp, VERSION};
pub use nonce::generate_nonce;

use thiserror::Error;

/// Everything that can go wrong between raw request text and a bound
/// identity. The HTTP layer maps these onto status codes and bodies.
#[derive(Debug, Error)]
pub enum SiweError {
    #[error("sign-in message is empty")]
    EmptyMessage,

    #[error("invalid sign-in message header")]
    InvalidHeader,

    #[error("malformed message: {0}")]
    Malformed(&'static str),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid field {field}: {reason}")]
    InvalidFieldFormat { field: &'static str, reason: String },

    #[error("unsupported version: expected 1, got {0}")]
    UnsupportedVersion(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("{field} mismatch: expected {expected}, got {actual}")]
    DomainMismatch {
        field: &'static str,
        expected: String,
        actual: String,
    },

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("signer mismatch: message address {message_address}, recovered {recovered_address}")]
    AddressMismatch {
        message_address: String,
        recovered_address: String,
    },

    #[error("nonce does not match the pending challenge")]
    InvalidNonce,

    #[error("message expired")]
    Expired,

    #[error("message is not yet valid")]
    NotYetValid,

    #[error("internal fault: {0}")]
    Internal(String),
}

pub(crate) fn keccak256(data: &[u8]) -> [u8; 32] {
    use tiny_keccak::{Hasher, Keccak};
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(data);
    hasher.finalize(&mut output);
    output
}
