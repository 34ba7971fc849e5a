//! Bounded block store with least-recently-used eviction

use crate::error::BlockError;
use crate::store::{BlockFetcher, BlockStore};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::num::NonZeroUsize;
use tessera_core::{Block, Cid};

/// Default number of entries for the process-shared cache.
pub const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<Cid, (Block, u64)>,
    // tick -> cid, oldest first
    order: BTreeMap<u64, Cid>,
    tick: u64,
}

impl Inner {
    fn touch(&mut self, cid: &Cid) -> Option<Block> {
        self.tick += 1;
        let tick = self.tick;
        let (block, last) = self.entries.get_mut(cid)?;
        self.order.remove(&*last);
        *last = tick;
        self.order.insert(tick, *cid);
        Some(block.clone())
    }

    fn evict_oldest(&mut self) -> Option<Cid> {
        let (_, cid) = self.order.pop_first()?;
        self.entries.remove(&cid);
        Some(cid)
    }
}

/// Block store holding at most `capacity` blocks
#[derive(Debug)]
pub struct LruBlockstore {
    inner: Mutex<Inner>,
    capacity: NonZeroUsize,
}

impl LruBlockstore {
    /// Create a store; a capacity of zero is treated as one
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            capacity: NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
        }
    }

    /// Maximum number of entries
    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Current number of entries
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `cid` is resident, without refreshing it
    pub fn contains(&self, cid: &Cid) -> bool {
        self.inner.lock().entries.contains_key(cid)
    }
}

impl Default for LruBlockstore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl BlockFetcher for LruBlockstore {
    async fn get(&self, cid: &Cid) -> Result<Option<Block>, BlockError> {
        Ok(self.inner.lock().touch(cid))
    }
}

#[async_trait]
impl BlockStore for LruBlockstore {
    async fn put(&self, block: Block) -> Result<(), BlockError> {
        let mut inner = self.inner.lock();
        let cid = *block.cid();
        if inner.touch(&cid).is_some() {
            return Ok(());
        }
        while inner.entries.len() >= self.capacity.get() {
            if inner.evict_oldest().is_none() {
                break;
            }
        }
        inner.tick += 1;
        let tick = inner.tick;
        inner.entries.insert(cid, (block, tick));
        inner.order.insert(tick, cid);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(n: u8) -> Block {
        Block::raw(vec![n]).unwrap()
    }

    #[tokio::test]
    async fn test_evicts_least_recently_used() {
        let store = LruBlockstore::new(2);
        let (a, b, c) = (block(1), block(2), block(3));

        store.put(a.clone()).await.unwrap();
        store.put(b.clone()).await.unwrap();
        // Reading `a` makes `b` the oldest.
        assert!(store.get(a.cid()).await.unwrap().is_some());
        store.put(c.clone()).await.unwrap();

        assert!(store.contains(a.cid()));
        assert!(!store.contains(b.cid()));
        assert!(store.contains(c.cid()));
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_reput_does_not_grow() {
        let store = LruBlockstore::new(2);
        let a = block(1);
        store.put(a.clone()).await.unwrap();
        store.put(a.clone()).await.unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_zero_capacity_holds_one() {
        let store = LruBlockstore::new(0);
        store.put(block(1)).await.unwrap();
        store.put(block(2)).await.unwrap();
        assert_eq!(store.capacity(), 1);
        assert_eq!(store.len(), 1);
        assert!(store.contains(block(2).cid()));
    }
}
