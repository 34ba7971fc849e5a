//! An in-memory network of clock services
//!
//! All services share one blockstore, standing in for the content network
//! a gateway would read from. Clients built by the network fetch from that
//! same store.

use crate::connections::UnreachableConnection;
use crate::did;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tessera_blocks::{LruBlockstore, MemoryBlockstore};
use tessera_clock::{
    ClockClient, ClockConfig, ClockConnection, ClockError, ConfigError, ConnectionFactory,
    MemoryClockService, Remote, RemoteConfig,
};

/// Clock services reachable by DID
pub struct InMemoryNetwork {
    blocks: Arc<MemoryBlockstore>,
    connections: Mutex<HashMap<String, Arc<dyn ClockConnection>>>,
}

impl InMemoryNetwork {
    /// Empty network
    pub fn new() -> Self {
        Self {
            blocks: Arc::new(MemoryBlockstore::new()),
            connections: Mutex::new(HashMap::new()),
        }
    }

    /// The shared blockstore
    pub fn blocks(&self) -> &Arc<MemoryBlockstore> {
        &self.blocks
    }

    /// Start a clock service named `did`
    pub fn add_service(&self, did_text: &str) -> Arc<MemoryClockService> {
        let service = Arc::new(MemoryClockService::new(did(did_text), self.blocks.clone()));
        self.add_connection(service.clone());
        service
    }

    /// Register a remote that never answers
    pub fn add_unreachable(&self, did_text: &str) {
        self.add_connection(Arc::new(UnreachableConnection::new(did(did_text))));
    }

    /// Register an arbitrary connection under its own DID
    pub fn add_connection(&self, connection: Arc<dyn ClockConnection>) {
        tracing::debug!(remote = %connection.did(), "joined test network");
        self.connections
            .lock()
            .insert(connection.did().to_string(), connection);
    }

    /// Remote for a registered DID
    pub fn remote(&self, did_text: &str) -> Remote {
        let connection = self
            .connections
            .lock()
            .get(did_text)
            .cloned()
            .unwrap_or_else(|| panic!("{did_text} is not on the test network"));
        Remote::new(connection)
    }

    /// Client configuration listing `dids` as remotes
    pub fn config(&self, dids: &[&str]) -> ClockConfig {
        ClockConfig {
            remotes: dids
                .iter()
                .map(|d| RemoteConfig::new(*d, format!("memory://{d}")))
                .collect(),
            ..ClockConfig::default()
        }
    }

    /// Client talking to `dids`, fetching from the shared blockstore
    pub fn client(&self, dids: &[&str]) -> ClockClient {
        let remotes = dids.iter().map(|d| self.remote(d)).collect();
        ClockClient::new(
            remotes,
            self.blocks.clone(),
            Arc::new(LruBlockstore::new(256)),
        )
    }
}

impl Default for InMemoryNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionFactory for InMemoryNetwork {
    fn connect(&self, remote: &RemoteConfig) -> Result<Remote, ClockError> {
        let connection = self.connections.lock().get(&remote.did).cloned();
        connection.map(Remote::new).ok_or_else(|| {
            ClockError::Config(ConfigError::Invalid(format!(
                "no service {} on the test network",
                remote.did
            )))
        })
    }
}
