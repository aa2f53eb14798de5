//! Ethereum address parsing and EIP-55 checksum rendering.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{keccak256, SiweError};

/// 20-byte Ethereum account address.
///
/// Parsing is strict: the text form must be `0x` + 40 hex characters and
/// must match its own EIP-55 checksum, so the canonical rendering
/// reproduces the parsed input byte for byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Address([u8; 20]);

impl Address {
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// EIP-55 mixed-case form: a hex digit is uppercased when the
    /// corresponding nibble of keccak256(lowercase hex) is >= 8.
    pub fn to_checksum(&self) -> String {
        let lower = hex::encode(self.0);
        let digest = keccak256(lower.as_bytes());
        let mut out = String::with_capacity(42);
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let nibble = (digest[i / 2] >> (if i % 2 == 0 { 4 } else { 0 })) & 0x0f;
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl FromStr for Address {
    type Err = SiweError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex_part = s
            .strip_prefix("0x")
            .ok_or_else(|| SiweError::InvalidAddress(format!("missing 0x prefix: {s}")))?;
        if hex_part.len() != 40 {
            return Err(SiweError::InvalidAddress(format!(
                "expected 40 hex characters, got {}",
                hex_part.len()
            )));
        }

        let mut bytes = [0u8; 20];
        hex::decode_to_slice(hex_part, &mut bytes)
            .map_err(|e| SiweError::InvalidAddress(e.to_string()))?;

        let address = Self(bytes);
        if s != address.to_checksum() {
            return Err(SiweError::InvalidAddress(format!(
                "not in EIP-55 checksum form: {s}"
            )));
        }
        Ok(address)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_checksum())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test vectors from the EIP-55 specification.
    const CHECKSUMMED: &[&str] = &[
        "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
        "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
        "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
        "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
        "0x52908400098527886E0F7030069857D2E4169EE7",
    ];

    #[test]
    fn parses_and_reproduces_checksummed_addresses() {
        for addr in CHECKSUMMED {
            let parsed: Address = addr.parse().expect("valid checksum address");
            assert_eq!(parsed.to_checksum(), *addr);
            assert_eq!(parsed.to_string(), *addr);
        }
    }

    #[test]
    fn rejects_wrong_checksum_case() {
        let lowercased = CHECKSUMMED[0].to_ascii_lowercase();
        let result = lowercased.parse::<Address>();
        assert!(matches!(result, Err(SiweError::InvalidAddress(_))));
    }

    #[test]
    fn rejects_missing_prefix() {
        let result = "5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed".parse::<Address>();
        assert!(matches!(result, Err(SiweError::InvalidAddress(_))));
    }

    #[test]
    fn rejects_wrong_length() {
        let result = "0x5aAeb6".parse::<Address>();
        assert!(matches!(result, Err(SiweError::InvalidAddress(_))));
    }

    #[test]
    fn rejects_non_hex() {
        let result = "0xzz908400098527886E0F7030069857D2E4169EE7".parse::<Address>();
        assert!(matches!(result, Err(SiweError::InvalidAddress(_))));
    }

    #[test]
    fn serde_round_trip() {
        let address: Address = CHECKSUMMED[1].parse().unwrap();
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, format!("\"{}\"", CHECKSUMMED[1]));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, address);
    }
}
