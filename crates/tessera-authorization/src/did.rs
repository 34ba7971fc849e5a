//! Decentralized identifiers
//!
//! Any `did:<method>:<id>` is accepted as an identifier. Only `did:key` for
//! ed25519 carries a public key, so only those DIDs can verify signatures.

use crate::errors::{AuthorizationError, Result};
use ed25519_dalek::VerifyingKey;
use multibase::Base;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Multicodec prefix of an ed25519 public key (varint of 0xed).
const ED25519_PUB: [u8; 2] = [0xed, 0x01];

const DID_KEY_PREFIX: &str = "did:key:";

/// A syntactically valid DID
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Did(String);

impl Did {
    /// Parse and validate a DID string
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = |reason: &str| AuthorizationError::InvalidDid {
            did: text.to_string(),
            reason: reason.to_string(),
        };

        let rest = text
            .strip_prefix("did:")
            .ok_or_else(|| invalid("missing did: scheme"))?;
        let (method, id) = rest
            .split_once(':')
            .ok_or_else(|| invalid("missing method-specific id"))?;
        if method.is_empty()
            || !method
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        {
            return Err(invalid("method must be lowercase alphanumeric"));
        }
        if id.is_empty() {
            return Err(invalid("empty method-specific id"));
        }
        Ok(Self(text.to_string()))
    }

    /// The `did:key` for an ed25519 public key
    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        let mut bytes = Vec::with_capacity(ED25519_PUB.len() + 32);
        bytes.extend_from_slice(&ED25519_PUB);
        bytes.extend_from_slice(key.as_bytes());
        Self(format!(
            "{DID_KEY_PREFIX}{}",
            multibase::encode(Base::Base58Btc, bytes)
        ))
    }

    /// The method name, e.g. `key` or `web`
    pub fn method(&self) -> &str {
        self.0[4..].split(':').next().unwrap_or_default()
    }

    /// The public key behind a `did:key`
    pub fn verifying_key(&self) -> Result<VerifyingKey> {
        let unsupported = || AuthorizationError::UnsupportedDid { did: self.clone() };

        let encoded = self.0.strip_prefix(DID_KEY_PREFIX).ok_or_else(unsupported)?;
        let (base, bytes) = multibase::decode(encoded).map_err(|_| unsupported())?;
        if base != Base::Base58Btc {
            return Err(unsupported());
        }
        let key = bytes
            .strip_prefix(&ED25519_PUB[..])
            .and_then(|k| <[u8; 32]>::try_from(k).ok())
            .ok_or_else(unsupported)?;
        VerifyingKey::from_bytes(&key).map_err(|_| unsupported())
    }

    /// Borrow as `&str`
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Did {
    type Err = AuthorizationError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Did {
    type Error = AuthorizationError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Did> for String {
    fn from(did: Did) -> Self {
        did.0
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Did({})", self.0)
    }
}
