//! Block fetcher and store traits

use crate::error::BlockError;
use async_trait::async_trait;
use std::sync::Arc;
use tessera_core::{Block, Cid};

/// Read side of the block layer
#[async_trait]
pub trait BlockFetcher: Send + Sync {
    /// Fetch a block by CID; `Ok(None)` when this source does not have it
    async fn get(&self, cid: &Cid) -> Result<Option<Block>, BlockError>;
}

/// A fetcher that also accepts blocks
#[async_trait]
pub trait BlockStore: BlockFetcher {
    /// Store a block; an existing entry for the same CID is kept
    async fn put(&self, block: Block) -> Result<(), BlockError>;
}

/// Shared, type-erased fetcher
pub type DynFetcher = Arc<dyn BlockFetcher>;

/// Shared, type-erased store
pub type DynStore = Arc<dyn BlockStore>;

#[async_trait]
impl<T: BlockFetcher + ?Sized> BlockFetcher for Arc<T> {
    async fn get(&self, cid: &Cid) -> Result<Option<Block>, BlockError> {
        (**self).get(cid).await
    }
}

#[async_trait]
impl<T: BlockStore + ?Sized> BlockStore for Arc<T> {
    async fn put(&self, block: Block) -> Result<(), BlockError> {
        (**self).put(block).await
    }
}
