//! Self-describing text envelope
//!
//! A CAR is wrapped as the bytes of a CIDv1 with codec CAR and the identity
//! multihash, then multibase-encoded (base64, prefix `m`). The resulting
//! string carries the whole container, so parsing it needs no fetch.

use crate::content::CAR;
use crate::hash::IDENTITY;
use crate::varint;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine as _;

const MULTIBASE_BASE64: char = 'm';
const CID_V1: u64 = 1;

/// Errors from parsing an envelope
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvelopeError {
    /// Text does not start with the base64 multibase prefix
    #[error("expected multibase prefix 'm', found {0:?}")]
    Multibase(Option<char>),

    /// Body is not valid base64
    #[error("invalid base64: {0}")]
    Base64(String),

    /// Decoded bytes are not a CIDv1
    #[error("malformed envelope: {0}")]
    Malformed(&'static str),

    /// The CID codec is not CAR
    #[error("unexpected codec 0x{0:x}, expected CAR")]
    UnexpectedCodec(u64),

    /// The CID hash is not the identity multihash
    #[error("unexpected multihash 0x{0:x}, expected identity")]
    UnexpectedHash(u64),
}

/// Wrap CAR bytes into the text envelope.
pub fn format(car: &[u8]) -> String {
    let mut bytes = Vec::with_capacity(car.len() + 8);
    varint::encode(CID_V1, &mut bytes);
    varint::encode(CAR, &mut bytes);
    varint::encode(IDENTITY, &mut bytes);
    varint::encode(car.len() as u64, &mut bytes);
    bytes.extend_from_slice(car);

    let mut text = String::with_capacity(bytes.len() * 4 / 3 + 2);
    text.push(MULTIBASE_BASE64);
    text.push_str(&STANDARD_NO_PAD.encode(&bytes));
    text
}

/// Recover the CAR bytes from an envelope produced by [`format`].
pub fn parse(text: &str) -> Result<Vec<u8>, EnvelopeError> {
    let mut chars = text.chars();
    match chars.next() {
        Some(MULTIBASE_BASE64) => {}
        other => return Err(EnvelopeError::Multibase(other)),
    }
    let bytes = STANDARD_NO_PAD
        .decode(chars.as_str().trim_end_matches('='))
        .map_err(|e| EnvelopeError::Base64(e.to_string()))?;

    let mut rest = bytes.as_slice();
    let mut next = |what: &'static str| -> Result<u64, EnvelopeError> {
        let (value, used) = varint::decode(rest).ok_or(EnvelopeError::Malformed(what))?;
        rest = &rest[used..];
        Ok(value)
    };

    if next("version")? != CID_V1 {
        return Err(EnvelopeError::Malformed("not a CIDv1"));
    }
    let codec = next("codec")?;
    if codec != CAR {
        return Err(EnvelopeError::UnexpectedCodec(codec));
    }
    let hash = next("multihash code")?;
    if hash != IDENTITY {
        return Err(EnvelopeError::UnexpectedHash(hash));
    }
    let len = next("digest length")?;
    if usize::try_from(len).ok() != Some(rest.len()) {
        return Err(EnvelopeError::Malformed("digest length does not match body"));
    }
    Ok(rest.to_vec())
}
