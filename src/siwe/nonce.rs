//! Challenge nonce generation.

use rand::{distr::Alphanumeric, Rng};

/// 17 characters over the 62-symbol alphabet is ~101 bits of entropy.
pub const NONCE_LENGTH: usize = 17;

/// Generate a fresh challenge nonce from the thread-local CSPRNG.
///
/// Persistence is the caller's job; this only returns the value.
pub fn generate_nonce() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(NONCE_LENGTH)
        .map(char::from)
        .collect()
}
