//! # Tessera Blocks
//!
//! Fetching and caching content-addressed blocks.
//!
//! Every source implements [`BlockFetcher`]; writable ones also implement
//! [`BlockStore`]. Sources compose by wrapping:
//!
//! - [`MemoryBlockstore`] and [`LruBlockstore`]: local stores
//! - [`GatewayFetcher`]: HTTP gateway with timeout, retry and integrity checks
//! - [`CachingFetcher`]: read-through cache
//! - [`TieredFetcher`]: ordered fallback
//! - [`DedupFetcher`]: coalescing of concurrent requests
//!
//! [`fetcher_stack`] assembles the standard composition.

#![forbid(unsafe_code)]

pub mod cache;
pub mod dedup;
pub mod error;
pub mod gateway;
pub mod lru;
pub mod memory;
pub mod stack;
pub mod store;
pub mod tiered;

pub use cache::CachingFetcher;
pub use dedup::DedupFetcher;
pub use error::BlockError;
pub use gateway::GatewayFetcher;
pub use lru::LruBlockstore;
pub use memory::MemoryBlockstore;
pub use stack::fetcher_stack;
pub use store::{BlockFetcher, BlockStore, DynFetcher, DynStore};
pub use tiered::TieredFetcher;
