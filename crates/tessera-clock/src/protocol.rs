//! Publish and resolve
//!
//! Both operations fan out to every remote in parallel, fold the heads they
//! return into one frontier with the merkle clock, and materialize the
//! frontier as a [`State`]. One remote failing does not fail the operation
//! while another remote answers.
//!
//! ```text
//! idle -> fanning-out -> merging -> resolved
//!              \             \
//!               `-> failed    `-> failed
//! ```

use crate::clock;
use crate::config::ClockConfig;
use crate::errors::{ClockError, Result};
use crate::name::Name;
use crate::operation::Operation;
use crate::remote::{ConnectionFactory, Invocation, Remote, RemoteError};
use crate::revision::{EventBlock, Revision};
use crate::state::State;
use futures::future::join_all;
use std::fmt;
use std::sync::Arc;
use tessera_authorization::{ability, Did};
use tessera_blocks::{
    fetcher_stack, BlockFetcher, DynFetcher, DynStore, GatewayFetcher, LruBlockstore,
    MemoryBlockstore,
};
use tessera_core::Cid;

/// Where a publish or resolve currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolPhase {
    /// Not started
    Idle,
    /// Waiting on remotes
    FanningOut,
    /// Folding remote heads into the frontier
    Merging,
    /// Finished with a state
    Resolved,
    /// Finished with an error
    Failed,
}

impl fmt::Display for ProtocolPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProtocolPhase::Idle => "idle",
            ProtocolPhase::FanningOut => "fanning-out",
            ProtocolPhase::Merging => "merging",
            ProtocolPhase::Resolved => "resolved",
            ProtocolPhase::Failed => "failed",
        })
    }
}

/// Outcome of [`ClockClient::resolve`]
#[derive(Debug, Clone)]
pub enum Resolution<O> {
    /// The name's current state
    Value(State<O>),
    /// Remotes answered, but nothing was ever published for the name
    NoValue {
        /// Name DID
        did: Did,
    },
}

impl<O> Resolution<O> {
    /// The state, treating "no value" as [`ClockError::NoValue`]
    pub fn into_state(self) -> Result<State<O>> {
        match self {
            Resolution::Value(state) => Ok(state),
            Resolution::NoValue { did } => Err(ClockError::NoValue { did }),
        }
    }

    /// The state, if there is one
    pub fn state(&self) -> Option<&State<O>> {
        match self {
            Resolution::Value(state) => Some(state),
            Resolution::NoValue { .. } => None,
        }
    }

    /// Whether nothing was published yet
    pub fn is_no_value(&self) -> bool {
        matches!(self, Resolution::NoValue { .. })
    }
}

fn trace_phase(phase: ProtocolPhase, operation: &'static str, name: &Did) {
    tracing::debug!(%phase, operation, %name, "clock protocol phase");
}

/// Client for publishing to and resolving from remote clocks
///
/// Holds the remotes, the primary block fetcher and the block cache shared
/// by every operation made through it.
#[derive(Clone)]
pub struct ClockClient {
    remotes: Vec<Remote>,
    fetcher: DynFetcher,
    cache: DynStore,
}

impl ClockClient {
    /// Client over explicit parts
    pub fn new(remotes: Vec<Remote>, fetcher: DynFetcher, cache: DynStore) -> Self {
        Self {
            remotes,
            fetcher,
            cache,
        }
    }

    /// Client for `config`, with remotes connected through `factory`
    pub fn from_config(config: &ClockConfig, factory: &dyn ConnectionFactory) -> Result<Self> {
        config.validate()?;
        let gateway = GatewayFetcher::new(config.gateway.url.as_str())?
            .with_timeout(config.gateway.timeout())
            .with_retry(config.gateway.retry.policy());
        let cache = LruBlockstore::new(config.cache.capacity);
        let remotes = config
            .remotes
            .iter()
            .map(|remote| factory.connect(remote))
            .collect::<Result<Vec<_>>>()?;

        tracing::info!(
            gateway = %config.gateway.url,
            remotes = remotes.len(),
            cache_capacity = config.cache.capacity,
            "clock client configured"
        );
        Ok(Self::new(remotes, Arc::new(gateway), Arc::new(cache)))
    }

    /// Configured remotes
    pub fn remotes(&self) -> &[Remote] {
        &self.remotes
    }

    /// Publish `revision` and return the merged state
    ///
    /// Fails only if no remote reports a head; the failure is the single
    /// remote error, or an aggregate when there were several.
    pub async fn publish<O: Operation>(
        &self,
        name: &Name,
        revision: &Revision<O>,
    ) -> Result<State<O>> {
        const OP: &str = "publish";
        let did = name.did();
        trace_phase(ProtocolPhase::Idle, OP, did);
        if self.remotes.is_empty() {
            return Err(ClockError::NoRemotes);
        }

        let seed = Arc::new(MemoryBlockstore::with_blocks([revision.event().block().clone()]));
        let blocks = fetcher_stack(seed, self.fetcher.clone(), self.cache.clone());

        trace_phase(ProtocolPhase::FanningOut, OP, did);
        let event = revision.event();
        let calls = self.remotes.iter().map(|remote| {
            let invocation = Invocation::advance(name, remote.did(), event);
            call(remote, did, ability::ADVANCE, invocation)
        });
        let (heads, mut errors) = collect(&self.remotes, join_all(calls).await);

        if heads.iter().all(Vec::is_empty) {
            trace_phase(ProtocolPhase::Failed, OP, did);
            return Err(match errors.len() {
                0 => ClockError::EmptyHead { did: did.clone() },
                1 => errors.remove(0),
                _ => ClockError::Aggregate(errors),
            });
        }

        trace_phase(ProtocolPhase::Merging, OP, did);
        let outcome = async {
            let frontier = merge(blocks.as_ref(), revision.parents().to_vec(), &heads).await?;
            materialize(blocks.as_ref(), name, &frontier).await
        }
        .await;
        self.finish(OP, did, outcome)
    }

    /// Resolve the current state of `name`
    ///
    /// `base` seeds the frontier with a state the caller already holds.
    pub async fn resolve<O: Operation>(
        &self,
        name: &Name,
        base: Option<&State<O>>,
    ) -> Result<Resolution<O>> {
        const OP: &str = "resolve";
        let did = name.did();
        trace_phase(ProtocolPhase::Idle, OP, did);
        if self.remotes.is_empty() {
            return Err(ClockError::NoRemotes);
        }

        let known = base
            .into_iter()
            .flat_map(State::revisions)
            .map(|r| r.event().block().clone());
        let seed = Arc::new(MemoryBlockstore::with_blocks(known));
        let blocks = fetcher_stack(seed, self.fetcher.clone(), self.cache.clone());

        trace_phase(ProtocolPhase::FanningOut, OP, did);
        let calls = self.remotes.iter().map(|remote| {
            let invocation = Invocation::head(name, remote.did());
            call(remote, did, ability::HEAD, invocation)
        });
        let (heads, mut errors) = collect(&self.remotes, join_all(calls).await);

        if heads.iter().all(Vec::is_empty) {
            if errors.len() < self.remotes.len() {
                trace_phase(ProtocolPhase::Resolved, OP, did);
                return Ok(Resolution::NoValue { did: did.clone() });
            }
            trace_phase(ProtocolPhase::Failed, OP, did);
            return Err(if errors.len() == 1 {
                errors.remove(0)
            } else {
                ClockError::Aggregate(errors)
            });
        }

        trace_phase(ProtocolPhase::Merging, OP, did);
        let start = match base {
            Some(state) => state.heads(),
            None => heads.iter().find(|h| !h.is_empty()).cloned().unwrap_or_default(),
        };
        let outcome = async {
            let frontier = merge(blocks.as_ref(), start, &heads).await?;
            materialize(blocks.as_ref(), name, &frontier).await
        }
        .await;
        self.finish(OP, did, outcome).map(Resolution::Value)
    }

    fn finish<O>(
        &self,
        op: &'static str,
        did: &Did,
        outcome: Result<State<O>>,
    ) -> Result<State<O>> {
        match &outcome {
            Ok(state) => {
                trace_phase(ProtocolPhase::Resolved, op, did);
                tracing::debug!(
                    operation = op,
                    name = %did,
                    heads = state.revisions().len(),
                    conflicted = state.is_conflicted(),
                    "clock protocol finished"
                );
            }
            Err(error) => {
                trace_phase(ProtocolPhase::Failed, op, did);
                tracing::debug!(operation = op, name = %did, %error, "clock protocol failed");
            }
        }
        outcome
    }
}

impl fmt::Debug for ClockClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClockClient")
            .field("remotes", &self.remotes)
            .finish_non_exhaustive()
    }
}

async fn call(
    remote: &Remote,
    name: &Did,
    ability: &str,
    invocation: Result<Invocation>,
) -> Result<Vec<Cid>> {
    let response = remote.invoke(invocation?).await.map_err(|source| match source {
        RemoteError::Unauthorized { reason } => ClockError::Unauthorized {
            remote: remote.did().clone(),
            name: name.clone(),
            ability: ability.to_string(),
            reason,
        },
        other => ClockError::Remote {
            remote: remote.did().clone(),
            source: other,
        },
    })?;
    Ok(response.head)
}

fn collect(
    remotes: &[Remote],
    outcomes: Vec<Result<Vec<Cid>>>,
) -> (Vec<Vec<Cid>>, Vec<ClockError>) {
    let mut heads = Vec::with_capacity(outcomes.len());
    let mut errors = Vec::new();
    for (remote, outcome) in remotes.iter().zip(outcomes) {
        match outcome {
            Ok(head) => heads.push(head),
            Err(error) => {
                tracing::warn!(remote = %remote.did(), %error, "remote clock call failed");
                errors.push(error);
                heads.push(Vec::new());
            }
        }
    }
    (heads, errors)
}

async fn merge(blocks: &dyn BlockFetcher, start: Vec<Cid>, heads: &[Vec<Cid>]) -> Result<Vec<Cid>> {
    let mut frontier = start;
    for event in heads.iter().flatten() {
        frontier = clock::advance(blocks, &frontier, *event).await?;
    }
    Ok(frontier)
}

async fn materialize<O: Operation>(
    blocks: &dyn BlockFetcher,
    name: &Name,
    frontier: &[Cid],
) -> Result<State<O>> {
    let mut revisions = Vec::with_capacity(frontier.len());
    for cid in frontier {
        let block = blocks
            .get(cid)
            .await?
            .ok_or(ClockError::MissingEvent { cid: *cid })?;
        revisions.push(Revision::from_event(EventBlock::decode(block)?));
    }
    Ok(State::new(name.clone(), revisions))
}
