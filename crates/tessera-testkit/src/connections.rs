//! Connections with scripted behaviour

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tessera_authorization::Did;
use tessera_clock::{ClockConnection, HeadResponse, Invocation, RemoteError};

/// A remote that can never be reached
#[derive(Debug, Clone)]
pub struct UnreachableConnection {
    did: Did,
}

impl UnreachableConnection {
    /// Unreachable remote named `did`
    pub fn new(did: Did) -> Self {
        Self { did }
    }
}

#[async_trait]
impl ClockConnection for UnreachableConnection {
    fn did(&self) -> &Did {
        &self.did
    }

    async fn invoke(&self, _invocation: Invocation) -> Result<HeadResponse, RemoteError> {
        Err(RemoteError::Connection(format!("{} is unreachable", self.did)))
    }
}

/// Counts invocations passed through to another connection
pub struct CountingConnection {
    inner: Arc<dyn ClockConnection>,
    calls: AtomicUsize,
}

impl CountingConnection {
    /// Wrap `inner`
    pub fn new(inner: Arc<dyn ClockConnection>) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    /// Invocations seen so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClockConnection for CountingConnection {
    fn did(&self) -> &Did {
        self.inner.did()
    }

    async fn invoke(&self, invocation: Invocation) -> Result<HeadResponse, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.invoke(invocation).await
    }
}
