//! Ed25519 signing agents

use crate::did::Did;
use crate::errors::{AuthorizationError, Result};
use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine as _;
use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _};
use std::fmt;
use tessera_core::varint;

/// Multicodec for an ed25519 private key.
const ED25519_PRIV: u64 = 0x1300;

/// An ed25519 key pair addressed by its `did:key`
#[derive(Clone)]
pub struct Signer {
    key: SigningKey,
    did: Did,
}

impl Signer {
    /// Generate a fresh key pair from the OS RNG
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::generate(&mut rand::rngs::OsRng))
    }

    /// Rebuild a signer from a 32-byte secret
    pub fn from_secret(secret: &[u8; 32]) -> Self {
        Self::from_signing_key(SigningKey::from_bytes(secret))
    }

    fn from_signing_key(key: SigningKey) -> Self {
        let did = Did::from_verifying_key(&key.verifying_key());
        Self { key, did }
    }

    /// The signer's DID
    pub fn did(&self) -> &Did {
        &self.did
    }

    /// Sign `message`, returning the 64-byte signature
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.key.sign(message).to_bytes().to_vec()
    }

    /// Encode the secret key as multibase base64 of `0x1300 || secret`
    pub fn format(&self) -> String {
        let mut bytes = Vec::with_capacity(34);
        varint::encode(ED25519_PRIV, &mut bytes);
        bytes.extend_from_slice(self.key.as_bytes());
        format!("m{}", STANDARD_NO_PAD.encode(bytes))
    }

    /// Decode a signer produced by [`Signer::format`]
    pub fn parse(text: &str) -> Result<Self> {
        let body = text
            .strip_prefix('m')
            .ok_or_else(|| AuthorizationError::InvalidSigner("expected base64 multibase".into()))?;
        let bytes = STANDARD_NO_PAD
            .decode(body)
            .map_err(|e| AuthorizationError::InvalidSigner(e.to_string()))?;
        let (code, used) = varint::decode(&bytes)
            .ok_or_else(|| AuthorizationError::InvalidSigner("truncated key tag".into()))?;
        if code != ED25519_PRIV {
            return Err(AuthorizationError::InvalidSigner(format!(
                "unexpected key codec 0x{code:x}"
            )));
        }
        let secret = <[u8; 32]>::try_from(&bytes[used..])
            .map_err(|_| AuthorizationError::InvalidSigner("secret must be 32 bytes".into()))?;
        Ok(Self::from_secret(&secret))
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("did", &self.did)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Verify `signature` over `message` by the key behind `did`.
pub fn verify_signature(did: &Did, message: &[u8], signature: &[u8]) -> Result<bool> {
    let key = did.verifying_key()?;
    let Ok(signature) = Signature::from_slice(signature) else {
        return Ok(false);
    };
    Ok(key.verify(message, &signature).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let signer = Signer::generate();
        let sig = signer.sign(b"payload");

        assert!(verify_signature(signer.did(), b"payload", &sig).unwrap());
        assert!(!verify_signature(signer.did(), b"tampered", &sig).unwrap());
        assert!(!verify_signature(signer.did(), b"payload", &sig[..10]).unwrap());
    }

    #[test]
    fn test_format_parse_preserves_identity() {
        let signer = Signer::generate();
        let text = signer.format();
        assert!(text.starts_with('m'));

        let parsed = Signer::parse(&text).unwrap();
        assert_eq!(parsed.did(), signer.did());
    }

    #[test]
    fn test_parse_rejects_other_key_types() {
        let mut bytes = Vec::new();
        varint::encode(0x1306, &mut bytes);
        bytes.extend_from_slice(&[0u8; 32]);
        let text = format!("m{}", STANDARD_NO_PAD.encode(bytes));
        assert!(matches!(
            Signer::parse(&text),
            Err(AuthorizationError::InvalidSigner(_))
        ));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let signer = Signer::from_secret(&[9u8; 32]);
        let debug = format!("{signer:?}");
        assert!(debug.contains("redacted"));
        assert!(debug.contains(signer.did().as_str()));
    }
}
