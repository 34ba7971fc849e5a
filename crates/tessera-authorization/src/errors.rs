//! Authorization errors

use crate::did::Did;
use tessera_core::{ArchiveError, CarError, Cid, EnvelopeError, SerializationError};

/// Errors raised while creating, decoding or verifying delegations
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthorizationError {
    /// Text is not a syntactically valid DID
    #[error("invalid DID {did:?}: {reason}")]
    InvalidDid {
        /// Offending text
        did: String,
        /// What is wrong with it
        reason: String,
    },

    /// The DID method cannot be used to verify signatures
    #[error("cannot verify signatures for {did}")]
    UnsupportedDid {
        /// DID without a usable public key
        did: Did,
    },

    /// A formatted signer could not be decoded
    #[error("invalid signer: {0}")]
    InvalidSigner(String),

    /// A delegation signature does not verify against its issuer
    #[error("invalid signature on delegation {cid} from {issuer}")]
    InvalidSignature {
        /// Delegation CID
        cid: Cid,
        /// Claimed issuer
        issuer: Did,
    },

    /// No delegation chain grants `ability` on `resource` to `audience`
    #[error("{audience} is not authorized to {ability} on {resource}: {reason}")]
    Unauthorized {
        /// DID that asked
        audience: Did,
        /// Target resource
        resource: Did,
        /// Requested ability
        ability: String,
        /// Why the nearest candidate chain failed
        reason: String,
    },

    /// A delegation archive holds no usable delegation
    #[error("malformed delegation archive: {0}")]
    MalformedArchive(String),

    /// Encoding failure
    #[error(transparent)]
    Serialization(#[from] SerializationError),

    /// Container failure
    #[error(transparent)]
    Car(#[from] CarError),

    /// Archive framing failure
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Text envelope failure
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
}

/// Result alias for authorization operations
pub type Result<T> = std::result::Result<T, AuthorizationError>;
