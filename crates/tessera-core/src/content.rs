//! Content identifiers and blocks
//!
//! A [`Block`] pairs bytes with the CID that addresses them. Blocks are only
//! constructed through paths that either computed the CID from the bytes or
//! verified the bytes against a CID received from elsewhere, so holding a
//! `Block` means the pairing is sound.

use crate::hash::{self, DIGEST_LEN, IDENTITY, SHA2_256};
use crate::serialization::{self, SerializationError};
use cid::multihash::Multihash;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;

pub use cid::Cid;

/// Multicodec for DAG-CBOR blocks.
pub const DAG_CBOR: u64 = 0x71;

/// Multicodec for raw bytes.
pub const RAW: u64 = 0x55;

/// Multicodec for CAR containers.
pub const CAR: u64 = 0x0202;

/// Errors from building or verifying content ids
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContentError {
    /// The bytes do not hash to the digest carried by the CID
    #[error("content of {cid} does not match its digest")]
    DigestMismatch {
        /// CID the bytes were expected to match
        cid: Cid,
    },

    /// The CID uses a hash function this crate cannot verify
    #[error("unsupported multihash 0x{code:x} in {cid}")]
    UnsupportedHash {
        /// Offending CID
        cid: Cid,
        /// Multihash code
        code: u64,
    },

    /// A multihash could not be constructed
    #[error("invalid multihash: {0}")]
    Multihash(String),

    /// CID text or bytes could not be parsed
    #[error("invalid CID: {0}")]
    InvalidCid(String),
}

/// Compute the SHA-256 CIDv1 of `bytes` under `codec`.
pub fn cid_for(codec: u64, bytes: &[u8]) -> Result<Cid, ContentError> {
    let digest = hash::hash(bytes);
    let mh = Multihash::<64>::wrap(SHA2_256, &digest)
        .map_err(|e| ContentError::Multihash(e.to_string()))?;
    Ok(Cid::new_v1(codec, mh))
}

/// Check that `bytes` hash to the digest embedded in `cid`.
///
/// SHA-256 and identity multihashes are supported; anything else is
/// reported as [`ContentError::UnsupportedHash`].
pub fn verify_digest(cid: &Cid, bytes: &[u8]) -> Result<(), ContentError> {
    let mh = cid.hash();
    let matches = match mh.code() {
        SHA2_256 => mh.size() as usize == DIGEST_LEN && mh.digest() == hash::hash(bytes),
        IDENTITY => mh.digest() == bytes,
        code => return Err(ContentError::UnsupportedHash { cid: *cid, code }),
    };
    if matches {
        Ok(())
    } else {
        Err(ContentError::DigestMismatch { cid: *cid })
    }
}

/// Parse a CID from its text form.
pub fn parse_cid(text: &str) -> Result<Cid, ContentError> {
    text.parse::<Cid>()
        .map_err(|e| ContentError::InvalidCid(format!("{text}: {e}")))
}

/// An immutable, content-addressed block of bytes
#[derive(Clone, PartialEq, Eq)]
pub struct Block {
    cid: Cid,
    bytes: Vec<u8>,
}

impl Block {
    /// Encode `value` as DAG-CBOR and address it
    pub fn encode<T: Serialize>(value: &T) -> Result<Self, SerializationError> {
        let bytes = serialization::to_vec(value)?;
        let cid = cid_for(DAG_CBOR, &bytes)
            .map_err(|e| SerializationError::InvalidFormat(e.to_string()))?;
        Ok(Self { cid, bytes })
    }

    /// Address `bytes` with the raw codec
    pub fn raw(bytes: Vec<u8>) -> Result<Self, ContentError> {
        let cid = cid_for(RAW, &bytes)?;
        Ok(Self { cid, bytes })
    }

    /// Pair bytes with a CID obtained elsewhere, verifying the digest
    pub fn verified(cid: Cid, bytes: Vec<u8>) -> Result<Self, ContentError> {
        verify_digest(&cid, &bytes)?;
        Ok(Self { cid, bytes })
    }

    /// The block's CID
    pub fn cid(&self) -> &Cid {
        &self.cid
    }

    /// The block's bytes
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the block, returning its bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Decode the bytes as DAG-CBOR
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, SerializationError> {
        serialization::from_slice(&self.bytes)
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("cid", &self.cid.to_string())
            .field("len", &self.bytes.len())
            .finish()
    }
}
