//! # Tessera Clock
//!
//! Mutable names over a merkle clock of content-addressed revisions.
//!
//! A [`Name`] is a DID plus the delegations that let an agent read
//! (`clock/head`) or write (`clock/advance`) it. Every change is a
//! [`Revision`]: an event naming the heads it follows. [`ClockClient`]
//! publishes revisions to remote clock services and resolves the merged
//! [`State`] back; concurrent writers show up as a state with several heads
//! until someone publishes a merge.
//!
//! [`MemoryClockService`] is an in-process remote used for tests and local
//! deployments.

#![forbid(unsafe_code)]

pub mod clock;
pub mod config;
pub mod errors;
pub mod name;
pub mod operation;
pub mod protocol;
pub mod remote;
pub mod revision;
pub mod service;
pub mod state;

pub use config::{CacheConfig, ClockConfig, ConfigError, GatewayConfig, RemoteConfig, RetryConfig};
pub use errors::{ClockError, Result};
pub use name::{GrantOptions, Name};
pub use operation::{KvOp, Operation};
pub use protocol::{ClockClient, ProtocolPhase, Resolution};
pub use remote::{
    ClockConnection, ConnectionFactory, HeadResponse, Invocation, Remote, RemoteError,
};
pub use revision::{EventBlock, Revision};
pub use service::MemoryClockService;
pub use state::State;
