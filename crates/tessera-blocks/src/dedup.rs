//! In-flight request de-duplication
//!
//! Concurrent `get`s for one CID await a single shared fetch and all observe
//! its outcome. The entry is dropped once the fetch settles, so a later call
//! starts a new fetch. Unrelated CIDs never wait on each other.

use crate::error::BlockError;
use crate::store::{BlockFetcher, DynFetcher};
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use tessera_core::{Block, Cid};

type Pending = Shared<BoxFuture<'static, Result<Option<Block>, BlockError>>>;

/// Coalesces concurrent fetches of the same CID
pub struct DedupFetcher {
    inner: DynFetcher,
    in_flight: Mutex<InFlight>,
}

#[derive(Default)]
struct InFlight {
    next_id: u64,
    pending: HashMap<Cid, (u64, Pending)>,
}

impl DedupFetcher {
    /// Wrap `inner`
    pub fn new(inner: DynFetcher) -> Self {
        Self {
            inner,
            in_flight: Mutex::new(InFlight::default()),
        }
    }

    /// Number of fetches currently in flight
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().pending.len()
    }

    fn join(&self, cid: &Cid) -> (u64, Pending) {
        let mut in_flight = self.in_flight.lock();
        if let Some((id, pending)) = in_flight.pending.get(cid) {
            return (*id, pending.clone());
        }

        let inner = self.inner.clone();
        let key = *cid;
        let pending = async move { inner.get(&key).await }.boxed().shared();

        in_flight.next_id += 1;
        let id = in_flight.next_id;
        in_flight.pending.insert(*cid, (id, pending.clone()));
        (id, pending)
    }
}

#[async_trait]
impl BlockFetcher for DedupFetcher {
    async fn get(&self, cid: &Cid) -> Result<Option<Block>, BlockError> {
        let (id, pending) = self.join(cid);
        let result = pending.await;

        let mut in_flight = self.in_flight.lock();
        if in_flight.pending.get(cid).is_some_and(|(current, _)| *current == id) {
            in_flight.pending.remove(cid);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct Slow {
        block: Block,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl BlockFetcher for Slow {
        async fn get(&self, cid: &Cid) -> Result<Option<Block>, BlockError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok((cid == self.block.cid()).then(|| self.block.clone()))
        }
    }

    #[tokio::test]
    async fn test_concurrent_gets_share_one_fetch() {
        let block = Block::raw(b"once".to_vec()).unwrap();
        let slow = Arc::new(Slow {
            block: block.clone(),
            calls: AtomicUsize::new(0),
        });
        let dedup = DedupFetcher::new(slow.clone());

        let results =
            futures::future::join_all((0..8).map(|_| dedup.get(block.cid()))).await;

        assert_eq!(slow.calls.load(Ordering::SeqCst), 1);
        for result in results {
            assert_eq!(result.unwrap(), Some(block.clone()));
        }
        assert_eq!(dedup.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_settled_fetch_is_not_reused() {
        let block = Block::raw(b"twice".to_vec()).unwrap();
        let slow = Arc::new(Slow {
            block: block.clone(),
            calls: AtomicUsize::new(0),
        });
        let dedup = DedupFetcher::new(slow.clone());

        dedup.get(block.cid()).await.unwrap();
        dedup.get(block.cid()).await.unwrap();
        assert_eq!(slow.calls.load(Ordering::SeqCst), 2);
    }
}
