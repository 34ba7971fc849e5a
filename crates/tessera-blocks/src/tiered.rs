//! Ordered fallback over several fetchers

use crate::error::BlockError;
use crate::store::{BlockFetcher, DynFetcher};
use async_trait::async_trait;
use tessera_core::{Block, Cid};

/// Tries each tier in order and returns the first hit
///
/// A failing tier does not hide a hit further down. When no tier has the
/// block and at least one failed, the last failure is returned.
pub struct TieredFetcher {
    tiers: Vec<DynFetcher>,
}

impl TieredFetcher {
    /// Build from tiers, highest priority first
    pub fn new(tiers: Vec<DynFetcher>) -> Self {
        Self { tiers }
    }
}

#[async_trait]
impl BlockFetcher for TieredFetcher {
    async fn get(&self, cid: &Cid) -> Result<Option<Block>, BlockError> {
        let mut last_error = None;
        for (tier, fetcher) in self.tiers.iter().enumerate() {
            match fetcher.get(cid).await {
                Ok(Some(block)) => return Ok(Some(block)),
                Ok(None) => {}
                Err(error) => {
                    tracing::debug!(%cid, tier, %error, "tier failed, trying next");
                    last_error = Some(error);
                }
            }
        }
        match last_error {
            Some(error) => Err(error),
            None => Ok(None),
        }
    }
}
