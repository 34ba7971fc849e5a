//! Read-through cache wrapper
//!
//! The cache is best-effort: a cache that errors is treated as a miss, and a
//! failed population is dropped. Only the wrapped fetcher's result matters.

use crate::error::BlockError;
use crate::store::{BlockFetcher, DynFetcher, DynStore};
use async_trait::async_trait;
use tessera_core::{Block, Cid};

/// Fetcher that consults `cache` before `fetcher`
pub struct CachingFetcher {
    fetcher: DynFetcher,
    cache: DynStore,
}

impl CachingFetcher {
    /// Wrap `fetcher` with `cache`
    pub fn new(fetcher: DynFetcher, cache: DynStore) -> Self {
        Self { fetcher, cache }
    }
}

#[async_trait]
impl BlockFetcher for CachingFetcher {
    async fn get(&self, cid: &Cid) -> Result<Option<Block>, BlockError> {
        match self.cache.get(cid).await {
            Ok(Some(block)) => return Ok(Some(block)),
            Ok(None) => {}
            Err(error) => tracing::debug!(%cid, %error, "cache read failed, treating as miss"),
        }

        let fetched = self.fetcher.get(cid).await?;
        if let Some(block) = &fetched {
            if let Err(error) = self.cache.put(block.clone()).await {
                tracing::debug!(%cid, %error, "cache population failed");
            }
        }
        Ok(fetched)
    }
}
