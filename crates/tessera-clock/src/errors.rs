//! Clock protocol errors

use crate::config::ConfigError;
use crate::remote::RemoteError;
use tessera_authorization::{AuthorizationError, Did};
use tessera_blocks::BlockError;
use tessera_core::{ArchiveError, Cid, EnvelopeError, SerializationError};

/// Errors surfaced by names, revisions and the publish/resolve protocol
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// Nothing has ever been published for the name
    #[error("no value has been published for {did}")]
    NoValue {
        /// Name DID
        did: Did,
    },

    /// The supplied proofs do not delegate any clock ability to the agent
    #[error("no proof delegates a clock capability to {agent}")]
    NoMatchingProof {
        /// Agent that was expected as audience
        agent: Did,
    },

    /// Write access was requested from a name whose proofs are read-only
    #[error("name {name} is not writable by {agent}")]
    NotWritable {
        /// Name DID
        name: Did,
        /// Agent holding the proofs
        agent: Did,
    },

    /// A remote refused the invocation for lack of authority
    #[error("remote {remote} refused {ability} on {name}: {reason}")]
    Unauthorized {
        /// Remote DID
        remote: Did,
        /// Name DID
        name: Did,
        /// Invoked ability
        ability: String,
        /// Remote's explanation
        reason: String,
    },

    /// A remote failed for any other reason
    #[error("remote {remote} failed: {source}")]
    Remote {
        /// Remote DID
        remote: Did,
        /// What the remote reported
        #[source]
        source: RemoteError,
    },

    /// Several remotes failed
    #[error("{} remote operations failed: {}", .0.len(), summarize(.0))]
    Aggregate(Vec<ClockError>),

    /// Remotes answered but none reported a head
    #[error("remotes returned no head for {did}")]
    EmptyHead {
        /// Name DID
        did: Did,
    },

    /// The client has no remotes to talk to
    #[error("no remotes configured")]
    NoRemotes,

    /// An event needed to merge heads could not be found
    #[error("missing event {cid}")]
    MissingEvent {
        /// Event CID
        cid: Cid,
    },

    /// An event block does not decode as an event
    #[error("malformed event {cid}: {reason}")]
    MalformedEvent {
        /// Event CID
        cid: Cid,
        /// Decoder message
        reason: String,
    },

    /// Block layer failure
    #[error(transparent)]
    Block(#[from] BlockError),

    /// Authorization failure
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),

    /// Archive framing failure
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Text envelope failure
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    /// Encoding failure
    #[error(transparent)]
    Serialization(#[from] SerializationError),

    /// Configuration failure
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ClockError {
    /// Whether the error is an authorization failure, local or remote
    pub fn is_unauthorized(&self) -> bool {
        match self {
            ClockError::Unauthorized { .. }
            | ClockError::NotWritable { .. }
            | ClockError::NoMatchingProof { .. } => true,
            ClockError::Aggregate(errors) => errors.iter().all(ClockError::is_unauthorized),
            _ => false,
        }
    }
}

fn summarize(errors: &[ClockError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result alias for clock operations
pub type Result<T> = std::result::Result<T, ClockError>;
