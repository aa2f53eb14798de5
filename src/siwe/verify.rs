//! EIP-191 `personal_sign` signature recovery and verification.
//!
//! The wallet signs keccak256("\x19Ethereum Signed Message:\n" + len +
//! message). Recovering the public key from the 65-byte (r || s || v)
//! signature and hashing it yields the signer address, which must equal
//! the address claimed inside the message.

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

use super::{keccak256, Address, SiweError};

const EIP191_PREFIX: &str = "\x19Ethereum Signed Message:\n";

/// Keccak-256 digest of the EIP-191 prefixed message bytes.
pub fn eip191_hash(message: &[u8]) -> [u8; 32] {
    let length = message.len().to_string();
    let mut prefixed = Vec::with_capacity(EIP191_PREFIX.len() + length.len() + message.len());
    prefixed.extend_from_slice(EIP191_PREFIX.as_bytes());
    prefixed.extend_from_slice(length.as_bytes());
    prefixed.extend_from_slice(message);
    keccak256(&prefixed)
}

/// Decode a 65-byte hex signature, with or without the `0x` prefix.
pub fn decode_signature(signature: &str) -> Result<[u8; 65], SiweError> {
    let hex_sig = signature.strip_prefix("0x").unwrap_or(signature);
    let bytes = hex::decode(hex_sig).map_err(|e| SiweError::InvalidSignature(e.to_string()))?;
    if bytes.len() != 65 {
        return Err(SiweError::InvalidSignature(format!(
            "expected 65 bytes, got {}",
            bytes.len()
        )));
    }
    let mut out = [0u8; 65];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// Ethereum address of a secp256k1 public key: the last 20 bytes of
/// keccak256 over the uncompressed point without its 0x04 tag.
pub fn address_of(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let digest = keccak256(&point.as_bytes()[1..]);
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&digest[12..]);
    Address::from_bytes(bytes)
}

/// Recover the signer address from `(message_bytes, signature)`.
pub fn recover_address(message: &[u8], signature: &[u8; 65]) -> Result<Address, SiweError> {
    let (rs, v_byte) = signature.split_at(64);
    let v = match v_byte[0] {
        0 | 27 => 0u8,
        1 | 28 => 1u8,
        v => {
            return Err(SiweError::InvalidSignature(format!(
                "invalid recovery id: {v}"
            )))
        }
    };

    let signature =
        Signature::from_slice(rs).map_err(|e| SiweError::InvalidSignature(e.to_string()))?;
    let recovery_id = RecoveryId::new(v != 0, false);

    let digest = eip191_hash(message);
    let verifying_key = VerifyingKey::recover_from_prehash(&digest, &signature, recovery_id)
        .map_err(|e| SiweError::InvalidSignature(format!("recovery failed: {e}")))?;

    Ok(address_of(&verifying_key))
}

/// Check a signature against the claimed address.
///
/// Malformed signatures, failed recovery, and a recovered-address mismatch
/// are all the same outcome to the caller; nothing in here panics on
/// attacker-controlled input.
pub fn verify_signature(
    message: &[u8],
    signature: &[u8; 65],
    claimed: &Address,
) -> Result<(), SiweError> {
    let recovered = recover_address(message, signature)?;
    if recovered != *claimed {
        return Err(SiweError::AddressMismatch {
            message_address: claimed.to_checksum(),
            recovered_address: recovered.to_checksum(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::SigningKey;

    fn test_signer() -> (SigningKey, Address) {
        let key = SigningKey::from_slice(&[0x42u8; 32]).expect("valid secret");
        let address = address_of(key.verifying_key());
        (key, address)
    }

    fn sign(key: &SigningKey, message: &[u8]) -> [u8; 65] {
        let digest = eip191_hash(message);
        let (signature, recovery_id) = key.sign_prehash_recoverable(&digest).expect("signing");
        let mut bytes = [0u8; 65];
        bytes[..64].copy_from_slice(&signature.to_bytes());
        bytes[64] = recovery_id.to_byte() + 27;
        bytes
    }

    #[test]
    fn recovers_the_signer() {
        let (key, address) = test_signer();
        let message = b"sign-in round trip";
        let signature = sign(&key, message);
        assert_eq!(recover_address(message, &signature).unwrap(), address);
        assert!(verify_signature(message, &signature, &address).is_ok());
    }

    #[test]
    fn accepts_zero_based_recovery_byte() {
        let (key, address) = test_signer();
        let message = b"v can be 0/1 or 27/28";
        let mut signature = sign(&key, message);
        signature[64] -= 27;
        assert!(verify_signature(message, &signature, &address).is_ok());
    }

    #[test]
    fn tampered_message_changes_the_recovered_address() {
        let (key, address) = test_signer();
        let signature = sign(&key, b"original text");
        let result = verify_signature(b"original texT", &signature, &address);
        assert!(matches!(
            result,
            Err(SiweError::AddressMismatch { .. }) | Err(SiweError::InvalidSignature(_))
        ));
    }

    #[test]
    fn tampered_signature_fails() {
        let (key, address) = test_signer();
        let message = b"bit flips are fatal";
        let mut signature = sign(&key, message);
        signature[10] ^= 0x01;
        let result = verify_signature(message, &signature, &address);
        assert!(matches!(
            result,
            Err(SiweError::AddressMismatch { .. }) | Err(SiweError::InvalidSignature(_))
        ));
    }

    #[test]
    fn rejects_invalid_recovery_id() {
        let (key, address) = test_signer();
        let message = b"bad v";
        let mut signature = sign(&key, message);
        signature[64] = 99;
        assert!(matches!(
            verify_signature(message, &signature, &address),
            Err(SiweError::InvalidSignature(_))
        ));
    }

    #[test]
    fn rejects_wrong_length_hex() {
        assert!(matches!(
            decode_signature("0xdeadbeef"),
            Err(SiweError::InvalidSignature(_))
        ));
    }

    #[test]
    fn rejects_non_hex_signature() {
        assert!(matches!(
            decode_signature("not hex at all"),
            Err(SiweError::InvalidSignature(_))
        ));
    }

    #[test]
    fn decodes_with_and_without_prefix() {
        let raw = [0x11u8; 65];
        let plain = hex::encode(raw);
        let prefixed = format!("0x{plain}");
        assert_eq!(decode_signature(&plain).unwrap(), raw);
        assert_eq!(decode_signature(&prefixed).unwrap(), raw);
    }

    #[test]
    fn eip191_digest_is_length_sensitive() {
        // "x" repeated 9 times vs 10 times exercises the decimal length in
        // the prefix.
        assert_ne!(eip191_hash(b"xxxxxxxxx"), eip191_hash(b"xxxxxxxxxx"));
    }
}
