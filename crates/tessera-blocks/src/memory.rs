//! Unbounded in-memory block store

use crate::error::BlockError;
use crate::store::{BlockFetcher, BlockStore};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use tessera_core::{Block, Cid};

/// Map of CID string to block
#[derive(Debug, Default)]
pub struct MemoryBlockstore {
    blocks: RwLock<HashMap<String, Block>>,
}

impl MemoryBlockstore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with `blocks`
    pub fn with_blocks(blocks: impl IntoIterator<Item = Block>) -> Self {
        let store = Self::new();
        {
            let mut map = store.blocks.write();
            for block in blocks {
                map.entry(block.cid().to_string()).or_insert(block);
            }
        }
        store
    }

    /// Insert without going through the async trait
    pub fn insert(&self, block: Block) {
        self.blocks
            .write()
            .entry(block.cid().to_string())
            .or_insert(block);
    }

    /// Whether the store holds `cid`
    pub fn contains(&self, cid: &Cid) -> bool {
        self.blocks.read().contains_key(&cid.to_string())
    }

    /// Number of stored blocks
    pub fn len(&self) -> usize {
        self.blocks.read().len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.blocks.read().is_empty()
    }
}

#[async_trait]
impl BlockFetcher for MemoryBlockstore {
    async fn get(&self, cid: &Cid) -> Result<Option<Block>, BlockError> {
        Ok(self.blocks.read().get(&cid.to_string()).cloned())
    }
}

#[async_trait]
impl BlockStore for MemoryBlockstore {
    async fn put(&self, block: Block) -> Result<(), BlockError> {
        self.insert(block);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get() {
        let store = MemoryBlockstore::new();
        let block = Block::raw(b"hello".to_vec()).unwrap();

        assert_eq!(store.get(block.cid()).await.unwrap(), None);
        store.put(block.clone()).await.unwrap();
        assert_eq!(store.get(block.cid()).await.unwrap(), Some(block));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_seeded_store() {
        let a = Block::raw(b"a".to_vec()).unwrap();
        let b = Block::raw(b"b".to_vec()).unwrap();
        let store = MemoryBlockstore::with_blocks([a.clone(), b.clone(), a.clone()]);
        assert_eq!(store.len(), 2);
        assert!(store.contains(a.cid()));
        assert!(store.contains(b.cid()));
    }
}
