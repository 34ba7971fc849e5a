//! Tessera testing infrastructure
//!
//! Shared fixtures for integration tests: an in-memory network of clock
//! services, connections that fail on purpose, and instrumented block
//! fetchers.
//!
//! # Usage
//!
//! ```rust,no_run
//! use tessera_testkit::InMemoryNetwork;
//!
//! # async fn demo() {
//! tessera_testkit::init_tracing();
//! let network = InMemoryNetwork::new();
//! network.add_service("did:web:a.test");
//! let client = network.client(&["did:web:a.test"]);
//! # }
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

pub mod connections;
pub mod fetchers;
pub mod network;

pub use connections::{CountingConnection, UnreachableConnection};
pub use fetchers::{CountingFetcher, FailingFetcher};
pub use network::InMemoryNetwork;

use tessera_authorization::{Did, Signer};

/// Install a test subscriber filtered by `RUST_LOG`
///
/// Safe to call from every test; calls after the first are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// An agent with a deterministic key
pub fn agent(seed: u8) -> Signer {
    Signer::from_secret(&[seed; 32])
}

/// Parse a DID literal
pub fn did(text: &str) -> Did {
    Did::parse(text).expect("test DID literal must parse")
}
