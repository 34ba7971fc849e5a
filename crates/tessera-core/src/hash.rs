//! Content hashing
//!
//! Every content id in Tessera is derived from a SHA-256 digest. This module
//! is the single place the algorithm is named; the multihash code it
//! produces is exported next to it so cid construction and integrity checks
//! cannot drift apart.
//!
//! ```ignore
//! use tessera_core::hash::hash;
//!
//! let digest = hash(b"hello world");
//! assert_eq!(digest.len(), 32);
//! ```

use sha2::{Digest, Sha256};

/// Multihash code for SHA2-256.
pub const SHA2_256: u64 = 0x12;

/// Multihash code for the identity "hash" (digest is the input itself).
pub const IDENTITY: u64 = 0x00;

/// Length in bytes of a [`hash`] digest.
pub const DIGEST_LEN: usize = 32;

/// Hash arbitrary bytes to a 32-byte SHA-256 digest.
pub fn hash(data: &[u8]) -> [u8; DIGEST_LEN] {
    Sha256::digest(data).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_determinism() {
        let data = b"hello world";
        assert_eq!(hash(data), hash(data), "hash should be deterministic");
    }

    #[test]
    fn test_sha256_known_vector() {
        // SHA256("") = e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855
        let expected = [
            0xe3, 0xb0, 0xc4, 0x42, 0x98, 0xfc, 0x1c, 0x14, 0x9a, 0xfb, 0xf4, 0xc8, 0x99, 0x6f,
            0xb9, 0x24, 0x27, 0xae, 0x41, 0xe4, 0x64, 0x9b, 0x93, 0x4c, 0xa4, 0x95, 0x99, 0x1b,
            0x78, 0x52, 0xb8, 0x55,
        ];
        assert_eq!(hash(b""), expected, "SHA-256 of empty string mismatch");
    }
}
