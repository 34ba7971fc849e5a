//! The fetcher stack used to resolve clock events

use crate::cache::CachingFetcher;
use crate::dedup::DedupFetcher;
use crate::memory::MemoryBlockstore;
use crate::store::{DynFetcher, DynStore};
use crate::tiered::TieredFetcher;
use std::sync::Arc;

/// Build `dedup → cache → tiered(seed, primary)`.
///
/// `seed` holds blocks produced locally for the current operation so they
/// resolve without touching `primary`.
pub fn fetcher_stack(
    seed: Arc<MemoryBlockstore>,
    primary: DynFetcher,
    cache: DynStore,
) -> DynFetcher {
    let tiered = Arc::new(TieredFetcher::new(vec![seed as DynFetcher, primary]));
    let cached = Arc::new(CachingFetcher::new(tiered, cache));
    Arc::new(DedupFetcher::new(cached))
}
