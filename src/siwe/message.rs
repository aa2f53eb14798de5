//! EIP-4361 message model: typed fields, strict parsing, canonical text.
//!
//! The signature a wallet produces covers the exact bytes of the plaintext
//! template, so `parse` and the `Display` serializer must be exact
//! inverses of each other: any value `parse` accepts re-renders to the
//! input byte for byte.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{Address, SiweError};

/// The only EIP-4361 version in existence.
pub const VERSION: &str = "1";

const PREAMBLE: &str = " wants you to sign in with your Ethereum account:";
const URI_TAG: &str = "URI: ";
const VERSION_TAG: &str = "Version: ";
const CHAIN_TAG: &str = "Chain ID: ";
const NONCE_TAG: &str = "Nonce: ";
const ISSUED_AT_TAG: &str = "Issued At: ";
const EXPIRATION_TAG: &str = "Expiration Time: ";
const NOT_BEFORE_TAG: &str = "Not Before: ";
const REQUEST_ID_TAG: &str = "Request ID: ";
const RESOURCES_TAG: &str = "Resources:";
const RESOURCE_ITEM_PREFIX: &str = "- ";

/// Minimum nonce length accepted on parse, per the EIP-4361 grammar.
const MIN_NONCE_LENGTH: usize = 8;

/// RFC 3339 timestamp that remembers its source text.
///
/// Re-rendering must reproduce the signed bytes, so the original spelling
/// (offset form, subsecond digits) is preserved rather than normalized.
/// Equality follows the text; ordering comparisons use [`datetime`].
///
/// [`datetime`]: TimeStamp::datetime
#[derive(Debug, Clone)]
pub struct TimeStamp {
    raw: String,
    time: DateTime<Utc>,
}

impl TimeStamp {
    pub fn from_datetime(time: DateTime<Utc>) -> Self {
        Self {
            raw: time.to_rfc3339_opts(SecondsFormat::Millis, true),
            time,
        }
    }

    pub fn datetime(&self) -> DateTime<Utc> {
        self.time
    }
}

impl FromStr for TimeStamp {
    type Err = SiweError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let time = DateTime::parse_from_rfc3339(s)
            .map_err(|e| SiweError::InvalidFieldFormat {
                field: "timestamp",
                reason: e.to_string(),
            })?
            .with_timezone(&Utc);
        Ok(Self {
            raw: s.to_string(),
            time,
        })
    }
}

impl fmt::Display for TimeStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for TimeStamp {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for TimeStamp {}

impl Serialize for TimeStamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for TimeStamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// One parsed sign-in message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiweMessage {
    pub domain: String,
    pub address: Address,
    pub statement: Option<String>,
    pub uri: String,
    pub version: String,
    pub chain_id: u64,
    pub nonce: String,
    pub issued_at: TimeStamp,
    pub expiration_time: Option<TimeStamp>,
    pub not_before: Option<TimeStamp>,
    pub request_id: Option<String>,
    #[serde(default)]
    pub resources: Vec<String>,
}

fn tagged<'a>(
    line: Option<&'a str>,
    tag: &str,
    field: &'static str,
) -> Result<&'a str, SiweError> {
    line.ok_or(SiweError::MissingField(field))?
        .strip_prefix(tag)
        .ok_or(SiweError::MissingField(field))
}

impl FromStr for SiweMessage {
    type Err = SiweError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(SiweError::EmptyMessage);
        }
        let mut lines = s.split('\n');

        let domain = lines
            .next()
            .ok_or(SiweError::EmptyMessage)?
            .strip_suffix(PREAMBLE)
            .ok_or(SiweError::InvalidHeader)?;
        if domain.is_empty() {
            return Err(SiweError::InvalidHeader);
        }

        let address: Address = lines
            .next()
            .ok_or(SiweError::MissingField("address"))?
            .parse()?;

        if lines.next() != Some("") {
            return Err(SiweError::Malformed("expected blank line after address"));
        }

        let statement = match lines.next() {
            Some("") => None,
            Some(line) => {
                if lines.next() != Some("") {
                    return Err(SiweError::Malformed("expected blank line after statement"));
                }
                Some(line.to_string())
            }
            None => return Err(SiweError::MissingField("URI")),
        };

        let uri = tagged(lines.next(), URI_TAG, "URI")?.to_string();

        let version = tagged(lines.next(), VERSION_TAG, "Version")?.to_string();
        if version != VERSION {
            return Err(SiweError::UnsupportedVersion(version));
        }

        let chain_line = tagged(lines.next(), CHAIN_TAG, "Chain ID")?;
        let chain_id: u64 = chain_line.parse().map_err(|_| SiweError::InvalidFieldFormat {
            field: "Chain ID",
            reason: format!("not a positive integer: {chain_line}"),
        })?;
        if chain_id == 0 {
            return Err(SiweError::InvalidFieldFormat {
                field: "Chain ID",
                reason: "must be positive".to_string(),
            });
        }

        let nonce = tagged(lines.next(), NONCE_TAG, "Nonce")?.to_string();
        if nonce.len() < MIN_NONCE_LENGTH || !nonce.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(SiweError::InvalidFieldFormat {
                field: "Nonce",
                reason: "expected at least 8 alphanumeric characters".to_string(),
            });
        }

        let issued_at: TimeStamp = tagged(lines.next(), ISSUED_AT_TAG, "Issued At")?.parse()?;

        let mut expiration_time = None;
        let mut not_before = None;
        let mut request_id = None;
        let mut resources = Vec::new();

        let mut next = lines.next();
        if let Some(value) = next.and_then(|l| l.strip_prefix(EXPIRATION_TAG)) {
            expiration_time = Some(value.parse::<TimeStamp>()?);
            next = lines.next();
        }
        if let Some(value) = next.and_then(|l| l.strip_prefix(NOT_BEFORE_TAG)) {
            not_before = Some(value.parse::<TimeStamp>()?);
            next = lines.next();
        }
        if let Some(value) = next.and_then(|l| l.strip_prefix(REQUEST_ID_TAG)) {
            request_id = Some(value.to_string());
            next = lines.next();
        }
        if next == Some(RESOURCES_TAG) {
            for line in lines.by_ref() {
                let resource = line
                    .strip_prefix(RESOURCE_ITEM_PREFIX)
                    .ok_or(SiweError::Malformed("resource entries must begin with '- '"))?;
                resources.push(resource.to_string());
            }
            next = None;
        }
        if next.is_some() {
            return Err(SiweError::Malformed("unexpected content after message fields"));
        }

        if let Some(exp) = &expiration_time {
            if exp.datetime() <= issued_at.datetime() {
                return Err(SiweError::InvalidFieldFormat {
                    field: "Expiration Time",
                    reason: "must be after Issued At".to_string(),
                });
            }
            if let Some(nbf) = &not_before {
                if nbf.datetime() >= exp.datetime() {
                    return Err(SiweError::InvalidFieldFormat {
                        field: "Not Before",
                        reason: "must be before Expiration Time".to_string(),
                    });
                }
            }
        }

        Ok(Self {
            domain: domain.to_string(),
            address,
            statement,
            uri,
            version,
            chain_id,
            nonce,
            issued_at,
            expiration_time,
            not_before,
            request_id,
            resources,
        })
    }
}

impl fmt::Display for SiweMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}{}", self.domain, PREAMBLE)?;
        writeln!(f, "{}", self.address)?;
        writeln!(f)?;
        if let Some(statement) = &self.statement {
            writeln!(f, "{statement}")?;
        }
        writeln!(f)?;
        writeln!(f, "{URI_TAG}{}", self.uri)?;
        writeln!(f, "{VERSION_TAG}{}", self.version)?;
        writeln!(f, "{CHAIN_TAG}{}", self.chain_id)?;
        writeln!(f, "{NONCE_TAG}{}", self.nonce)?;
        write!(f, "{ISSUED_AT_TAG}{}", self.issued_at)?;
        if let Some(exp) = &self.expiration_time {
            write!(f, "\n{EXPIRATION_TAG}{exp}")?;
        }
        if let Some(nbf) = &self.not_before {
            write!(f, "\n{NOT_BEFORE_TAG}{nbf}")?;
        }
        if let Some(request_id) = &self.request_id {
            write!(f, "\n{REQUEST_ID_TAG}{request_id}")?;
        }
        if !self.resources.is_empty() {
            write!(f, "\n{RESOURCES_TAG}")?;
            for resource in &self.resources {
                write!(f, "\n{RESOURCE_ITEM_PREFIX}{resource}")?;
            }
        }
        Ok(())
    }
}
