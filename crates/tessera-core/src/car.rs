//! CAR v1 containers
//!
//! A CAR is a varint-framed DAG-CBOR header `{ roots, version: 1 }` followed
//! by varint-framed sections of `cid bytes || block bytes`. Every section is
//! verified against its CID on decode.

use crate::content::{Block, Cid, ContentError};
use crate::serialization::{self, SerializationError};
use crate::varint;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Cursor;

const CAR_VERSION: u64 = 1;

/// Errors from encoding or decoding a CAR
#[derive(Debug, Clone, thiserror::Error)]
pub enum CarError {
    /// Header could not be encoded or decoded
    #[error("invalid CAR header: {0}")]
    Header(#[from] SerializationError),

    /// Header declared a version other than 1
    #[error("unsupported CAR version {0}")]
    UnsupportedVersion(u64),

    /// Input ended inside a frame
    #[error("truncated CAR at offset {offset}")]
    Truncated {
        /// Byte offset of the incomplete frame
        offset: usize,
    },

    /// A section's CID could not be parsed
    #[error("invalid CID in CAR section at offset {offset}: {reason}")]
    InvalidCid {
        /// Byte offset of the section
        offset: usize,
        /// Parser message
        reason: String,
    },

    /// A section's bytes do not match its CID
    #[error(transparent)]
    Content(#[from] ContentError),
}

#[derive(Debug, Serialize, Deserialize)]
struct CarHeader {
    roots: Vec<Cid>,
    version: u64,
}

/// An in-memory CAR: roots plus blocks in insertion order
#[derive(Debug, Clone, Default)]
pub struct Car {
    roots: Vec<Cid>,
    blocks: Vec<Block>,
    index: HashMap<Cid, usize>,
}

impl Car {
    /// Create an empty CAR with the given roots
    pub fn new(roots: Vec<Cid>) -> Self {
        Self {
            roots,
            blocks: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Add a block; duplicates by CID are ignored
    pub fn push(&mut self, block: Block) {
        if !self.index.contains_key(block.cid()) {
            self.index.insert(*block.cid(), self.blocks.len());
            self.blocks.push(block);
        }
    }

    /// Builder form of [`Car::push`]
    pub fn with_block(mut self, block: Block) -> Self {
        self.push(block);
        self
    }

    /// Root CIDs declared in the header
    pub fn roots(&self) -> &[Cid] {
        &self.roots
    }

    /// Blocks in the order they were written
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Look up a block by CID
    pub fn get(&self, cid: &Cid) -> Option<&Block> {
        self.index.get(cid).and_then(|i| self.blocks.get(*i))
    }

    /// Serialize to CAR v1 bytes
    pub fn encode(&self) -> Result<Vec<u8>, CarError> {
        let header = serialization::to_vec(&CarHeader {
            roots: self.roots.clone(),
            version: CAR_VERSION,
        })?;

        let mut out = Vec::with_capacity(header.len() + 16);
        varint::encode(header.len() as u64, &mut out);
        out.extend_from_slice(&header);

        for block in &self.blocks {
            let cid_bytes = block.cid().to_bytes();
            varint::encode((cid_bytes.len() + block.bytes().len()) as u64, &mut out);
            out.extend_from_slice(&cid_bytes);
            out.extend_from_slice(block.bytes());
        }
        Ok(out)
    }

    /// Parse CAR v1 bytes, verifying every block
    pub fn decode(bytes: &[u8]) -> Result<Self, CarError> {
        let (header_bytes, mut offset) = read_frame(bytes, 0)?;
        let header: CarHeader = serialization::from_slice(header_bytes)?;
        if header.version != CAR_VERSION {
            return Err(CarError::UnsupportedVersion(header.version));
        }

        let mut car = Car::new(header.roots);
        while offset < bytes.len() {
            let section_offset = offset;
            let (section, next) = read_frame(bytes, offset)?;
            offset = next;

            let mut cursor = Cursor::new(section);
            let cid = Cid::read_bytes(&mut cursor).map_err(|e| CarError::InvalidCid {
                offset: section_offset,
                reason: e.to_string(),
            })?;
            let data = &section[cursor.position() as usize..];
            car.push(Block::verified(cid, data.to_vec())?);
        }
        Ok(car)
    }
}

/// Read one varint-length-prefixed frame starting at `offset`.
fn read_frame(bytes: &[u8], offset: usize) -> Result<(&[u8], usize), CarError> {
    let rest = bytes.get(offset..).ok_or(CarError::Truncated { offset })?;
    let (len, used) = varint::decode(rest).ok_or(CarError::Truncated { offset })?;
    let start = offset + used;
    let end = usize::try_from(len)
        .ok()
        .and_then(|len| start.checked_add(len))
        .filter(|end| *end <= bytes.len())
        .ok_or(CarError::Truncated { offset })?;
    Ok((&bytes[start..end], end))
}
