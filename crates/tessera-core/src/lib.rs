//! # Tessera Core - Content Addressing Foundation
//!
//! The foundation layer of Tessera: everything that turns values into
//! addressed, verifiable bytes and back.
//!
//! - [`serialization`]: canonical DAG-CBOR encoding
//! - [`hash`]: the SHA-256 digest behind every CID
//! - [`content`]: CIDs and verified [`Block`]s
//! - [`car`]: CAR v1 containers
//! - [`archive`]: single-root, version-tagged archives
//! - [`envelope`]: identity-CID text form of a CAR
//! - [`reliability`]: retry policy with backoff
//!
//! No crate above this one encodes bytes or computes digests by itself.

#![forbid(unsafe_code)]

pub mod archive;
pub mod car;
pub mod content;
pub mod envelope;
pub mod hash;
pub mod reliability;
pub mod serialization;
pub mod varint;

pub use archive::{ArchiveError, Extracted};
pub use car::{Car, CarError};
pub use content::{cid_for, parse_cid, verify_digest, Block, Cid, ContentError};
pub use envelope::EnvelopeError;
pub use reliability::{BackoffStrategy, RetryPolicy};
pub use serialization::SerializationError;
