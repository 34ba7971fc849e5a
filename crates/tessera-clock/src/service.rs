//! In-process clock service
//!
//! [`MemoryClockService`] answers invocations the way a remote clock does:
//! it authenticates the invoker, verifies the full delegation chain, keeps
//! the blocks attached to `advance` and folds events into a per-name head.
//! Advances are applied one at a time.

use crate::clock;
use crate::errors::ClockError;
use crate::remote::{ClockConnection, HeadResponse, Invocation, RemoteError};
use async_lock::Mutex;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tessera_authorization::{ability, now_secs, verify_authorization, Did};
use tessera_blocks::MemoryBlockstore;
use tessera_core::{verify_digest, Cid};

/// A clock service living in this process
pub struct MemoryClockService {
    did: Did,
    blocks: Arc<MemoryBlockstore>,
    heads: Mutex<HashMap<Did, Vec<Cid>>>,
}

impl MemoryClockService {
    /// Service identified by `did`, keeping events in `blocks`
    pub fn new(did: Did, blocks: Arc<MemoryBlockstore>) -> Self {
        Self {
            did,
            blocks,
            heads: Mutex::new(HashMap::new()),
        }
    }

    /// Blocks the service has accepted
    pub fn blocks(&self) -> &Arc<MemoryBlockstore> {
        &self.blocks
    }

    /// Current head for `name`
    pub async fn head_of(&self, name: &Did) -> Vec<Cid> {
        self.heads.lock().await.get(name).cloned().unwrap_or_default()
    }

    async fn advance(&self, name: &Did, event: Cid) -> Result<Vec<Cid>, RemoteError> {
        if !self.blocks.contains(&event) {
            return Err(RemoteError::failure(
                "MissingEvent",
                format!("event {event} was neither attached nor known"),
            ));
        }

        let mut heads = self.heads.lock().await;
        let current = heads.get(name).cloned().unwrap_or_default();
        let next = clock::advance(&*self.blocks, &current, event)
            .await
            .map_err(|e| match e {
                ClockError::MissingEvent { .. } => RemoteError::failure("MissingEvent", e),
                other => RemoteError::failure("AdvanceFailed", other),
            })?;
        tracing::debug!(service = %self.did, %name, %event, heads = next.len(), "advanced clock");
        heads.insert(name.clone(), next.clone());
        Ok(next)
    }
}

fn unauthorized(reason: impl ToString) -> RemoteError {
    RemoteError::Unauthorized {
        reason: reason.to_string(),
    }
}

#[async_trait]
impl ClockConnection for MemoryClockService {
    fn did(&self) -> &Did {
        &self.did
    }

    async fn invoke(&self, invocation: Invocation) -> Result<HeadResponse, RemoteError> {
        if invocation.audience() != &self.did {
            return Err(unauthorized(format!(
                "invocation is addressed to {}, not {}",
                invocation.audience(),
                self.did
            )));
        }
        invocation.verify_signature().map_err(unauthorized)?;

        let capability = invocation.capability();
        if capability.can != ability::HEAD && capability.can != ability::ADVANCE {
            return Err(RemoteError::failure(
                "UnknownAbility",
                format!("{} is not a clock ability", capability.can),
            ));
        }
        verify_authorization(
            invocation.proofs(),
            invocation.issuer(),
            &capability.with,
            &capability.can,
            now_secs(),
        )
        .map_err(unauthorized)?;

        if capability.can == ability::HEAD {
            return Ok(HeadResponse {
                head: self.head_of(&capability.with).await,
            });
        }

        let event = capability
            .nb
            .as_ref()
            .map(|nb| nb.event)
            .ok_or_else(|| RemoteError::failure("InvalidArgument", "advance without an event"))?;
        for block in invocation.blocks() {
            verify_digest(block.cid(), block.bytes())
                .map_err(|e| RemoteError::failure("IntegrityError", e))?;
            self.blocks.insert(block.clone());
        }
        let head = self.advance(&capability.with, event).await?;
        Ok(HeadResponse { head })
    }
}

impl std::fmt::Debug for MemoryClockService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryClockService")
            .field("did", &self.did)
            .field("blocks", &self.blocks.len())
            .finish_non_exhaustive()
    }
}
