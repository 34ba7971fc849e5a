//! Instrumented block fetchers

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use tessera_blocks::{BlockError, BlockFetcher, DynFetcher};
use tessera_core::{Block, Cid};

/// Counts `get` calls that reach the wrapped fetcher
pub struct CountingFetcher {
    inner: DynFetcher,
    calls: AtomicUsize,
}

impl CountingFetcher {
    /// Wrap `inner`
    pub fn new(inner: DynFetcher) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    /// Lookups made so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlockFetcher for CountingFetcher {
    async fn get(&self, cid: &Cid) -> Result<Option<Block>, BlockError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get(cid).await
    }
}

/// Fails every lookup with the same error
#[derive(Debug, Clone)]
pub struct FailingFetcher {
    error: BlockError,
}

impl FailingFetcher {
    /// Always fail with `error`
    pub fn new(error: BlockError) -> Self {
        Self { error }
    }
}

#[async_trait]
impl BlockFetcher for FailingFetcher {
    async fn get(&self, _cid: &Cid) -> Result<Option<Block>, BlockError> {
        Err(self.error.clone())
    }
}
