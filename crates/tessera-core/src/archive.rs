//! Version-tagged archives
//!
//! An archive is a CAR with exactly one root. The root is a variant block
//! `{ "<tag>": <cid> }` whose single key names the format version of the
//! block it points at. Extraction checks the framing before any caller
//! inspects the payload.

use crate::car::{Car, CarError};
use crate::content::{Block, Cid};
use crate::serialization::SerializationError;
use std::collections::BTreeMap;

/// Errors from building or extracting an archive
#[derive(Debug, Clone, thiserror::Error)]
pub enum ArchiveError {
    /// The container itself is malformed
    #[error(transparent)]
    Car(#[from] CarError),

    /// A block could not be encoded or decoded
    #[error(transparent)]
    Serialization(#[from] SerializationError),

    /// Archives must declare exactly one root
    #[error("expected exactly one root, found {count}")]
    RootCount {
        /// Number of roots in the header
        count: usize,
    },

    /// The root variant does not carry the expected version tag
    #[error("unknown archive version {found:?}, expected {expected}")]
    UnknownVersion {
        /// Tag the caller accepts
        expected: String,
        /// Keys present in the variant
        found: Vec<String>,
    },

    /// A block referenced by the archive is not in it
    #[error("archive is missing block {cid}")]
    MissingBlock {
        /// Absent CID
        cid: Cid,
    },
}

/// A successfully extracted archive
#[derive(Debug, Clone)]
pub struct Extracted {
    /// CID the version tag points at
    pub root: Cid,
    /// All blocks of the archive, variant included
    pub car: Car,
}

impl Extracted {
    /// Fetch a block that must be present
    pub fn require(&self, cid: &Cid) -> Result<&Block, ArchiveError> {
        self.car
            .get(cid)
            .ok_or(ArchiveError::MissingBlock { cid: *cid })
    }

    /// The block the version tag points at
    pub fn root_block(&self) -> Result<&Block, ArchiveError> {
        self.require(&self.root)
    }
}

/// Build the variant block for `tag` pointing at `root`.
pub fn variant(tag: &str, root: Cid) -> Result<Block, SerializationError> {
    let mut map = BTreeMap::new();
    map.insert(tag.to_string(), root);
    Block::encode(&map)
}

/// Write `blocks` into a CAR rooted at a `{ tag: root }` variant.
pub fn archive<I>(tag: &str, root: Cid, blocks: I) -> Result<Vec<u8>, ArchiveError>
where
    I: IntoIterator<Item = Block>,
{
    let variant = variant(tag, root)?;
    let mut car = Car::new(vec![*variant.cid()]);
    car.push(variant);
    for block in blocks {
        car.push(block);
    }
    Ok(car.encode()?)
}

/// Read an archive written by [`archive`], requiring the version `tag`.
pub fn extract(tag: &str, bytes: &[u8]) -> Result<Extracted, ArchiveError> {
    let car = Car::decode(bytes)?;
    extract_car(tag, car)
}

/// Validate an already decoded CAR as a `tag` archive.
pub fn extract_car(tag: &str, car: Car) -> Result<Extracted, ArchiveError> {
    let variant_cid = match car.roots() {
        [cid] => *cid,
        roots => return Err(ArchiveError::RootCount { count: roots.len() }),
    };
    let variant_block = car
        .get(&variant_cid)
        .ok_or(ArchiveError::MissingBlock { cid: variant_cid })?;

    let unknown = |found: Vec<String>| ArchiveError::UnknownVersion {
        expected: tag.to_string(),
        found,
    };
    let map: BTreeMap<String, Cid> = variant_block.decode().map_err(|_| unknown(Vec::new()))?;
    let root = match map.get(tag) {
        Some(root) if map.len() == 1 => *root,
        _ => return Err(unknown(map.into_keys().collect())),
    };

    let extracted = Extracted { root, car };
    extracted.root_block()?;
    Ok(extracted)
}
