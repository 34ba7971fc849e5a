//! Revisions: content-addressed clock events
//!
//! An event is the DAG-CBOR block `{ data, parents }`. Parents are stored
//! sorted and de-duplicated, so the same operation over the same head set
//! always addresses the same CID regardless of the order heads were seen.

use crate::errors::{ClockError, Result};
use crate::operation::Operation;
use crate::state::State;
use serde::{Deserialize, Serialize};
use tessera_core::{archive, envelope, Block, Cid};

/// Version tag of the revision archive root variant.
pub const REVISION_VERSION: &str = "tessera/revision@0.1.0";

/// Decoded body of an event block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventData<O> {
    /// The operation
    pub data: O,
    /// Events this one follows
    pub parents: Vec<Cid>,
}

/// An event block together with its decoded value
#[derive(Debug, Clone)]
pub struct EventBlock<O> {
    block: Block,
    value: EventData<O>,
}

impl<O: Operation> EventBlock<O> {
    /// Encode a new event
    pub fn new(data: O, parents: impl IntoIterator<Item = Cid>) -> Result<Self> {
        let mut parents: Vec<Cid> = parents.into_iter().collect();
        parents.sort();
        parents.dedup();
        let value = EventData { data, parents };
        let block = Block::encode(&value)?;
        Ok(Self { block, value })
    }

    /// Decode an event from a verified block
    pub fn decode(block: Block) -> Result<Self> {
        let value = block
            .decode::<EventData<O>>()
            .map_err(|e| ClockError::MalformedEvent {
                cid: *block.cid(),
                reason: e.to_string(),
            })?;
        Ok(Self { block, value })
    }
}

impl<O> EventBlock<O> {
    /// CID of the event
    pub fn cid(&self) -> &Cid {
        self.block.cid()
    }

    /// Encoded bytes
    pub fn bytes(&self) -> &[u8] {
        self.block.bytes()
    }

    /// The underlying block
    pub fn block(&self) -> &Block {
        &self.block
    }

    /// Decoded value
    pub fn value(&self) -> &EventData<O> {
        &self.value
    }
}

/// An immutable step in a name's history
#[derive(Debug, Clone)]
pub struct Revision<O> {
    event: EventBlock<O>,
}

impl<O: Operation> Revision<O> {
    /// A root revision with no parents
    pub fn v0(operation: O) -> Result<Self> {
        Ok(Self::from_event(EventBlock::new(operation, [])?))
    }

    /// A revision following every head of `state`
    ///
    /// When `state` is conflicted this is the merge: the new event names all
    /// current heads as parents.
    pub fn increment(state: &State<O>, operation: O) -> Result<Self> {
        Ok(Self::from_event(EventBlock::new(operation, state.heads())?))
    }

    /// Encode as a CAR rooted at a `tessera/revision@0.1.0` variant
    pub fn archive(&self) -> Result<Vec<u8>> {
        Ok(archive::archive(
            REVISION_VERSION,
            *self.cid(),
            [self.event.block.clone()],
        )?)
    }

    /// Decode an archive produced by [`Revision::archive`]
    pub fn extract(bytes: &[u8]) -> Result<Self> {
        let extracted = archive::extract(REVISION_VERSION, bytes)?;
        let block = extracted.root_block()?.clone();
        Ok(Self::from_event(EventBlock::decode(block)?))
    }

    /// Archive wrapped in the self-describing text envelope
    pub fn format(&self) -> Result<String> {
        Ok(envelope::format(&self.archive()?))
    }

    /// Parse the output of [`Revision::format`]
    pub fn parse(text: &str) -> Result<Self> {
        Self::extract(&envelope::parse(text)?)
    }
}

impl<O> Revision<O> {
    /// Wrap an already decoded event
    pub fn from_event(event: EventBlock<O>) -> Self {
        Self { event }
    }

    /// The event
    pub fn event(&self) -> &EventBlock<O> {
        &self.event
    }

    /// CID of the event
    pub fn cid(&self) -> &Cid {
        self.event.cid()
    }

    /// Parent CIDs
    pub fn parents(&self) -> &[Cid] {
        &self.event.value.parents
    }

    /// The carried operation
    pub fn operation(&self) -> &O {
        &self.event.value.data
    }
}
