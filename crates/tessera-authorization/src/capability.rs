//! Capabilities and the single rule for matching them
//!
//! A capability pairs an ability (`can`) with a resource (`with`). Every
//! question of the form "does this proof let `audience` do `ability` on
//! `resource`" goes through [`CapabilityMatcher`], whether it is the local
//! best-effort check made when importing or granting a name, or the full
//! chain verification a clock service performs.

use crate::did::Did;
use crate::proof::Proof;
use serde::{Deserialize, Serialize};

/// Resource wildcard: the capability applies to every resource the issuer holds
pub const WILDCARD_RESOURCE: &str = "ucan:*";

/// Ability names used by the clock protocol
pub mod ability {
    /// Every ability
    pub const ANY: &str = "*";
    /// Every ability in the clock namespace
    pub const CLOCK_ANY: &str = "clock/*";
    /// Read the current head of a clock
    pub const HEAD: &str = "clock/head";
    /// Advance a clock with a new event
    pub const ADVANCE: &str = "clock/advance";
}

/// A single granted ability on a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Capability {
    /// Ability, e.g. `clock/head`
    pub can: String,
    /// Resource URI, a DID or [`WILDCARD_RESOURCE`]
    pub with: String,
}

impl Capability {
    /// Shorthand constructor
    pub fn new(can: impl Into<String>, with: impl Into<String>) -> Self {
        Self {
            can: can.into(),
            with: with.into(),
        }
    }

    /// Whether this capability grants `ability` on `resource`
    pub fn covers(&self, resource: &Did, ability: &str) -> bool {
        resource_covers(&self.with, resource) && ability_covers(&self.can, ability)
    }
}

/// Whether a granted ability satisfies a requested one.
///
/// `*` grants everything and `ns/*` grants anything under `ns/`. A request
/// of the form `ns/*` asks for *some* ability in `ns`, so it is satisfied
/// by any grant inside that namespace.
pub fn ability_covers(granted: &str, requested: &str) -> bool {
    if granted == ability::ANY || granted == requested {
        return true;
    }
    if let Some(ns) = granted.strip_suffix("/*") {
        if in_namespace(requested, ns) {
            return true;
        }
    }
    if let Some(ns) = requested.strip_suffix("/*") {
        return in_namespace(granted, ns);
    }
    false
}

fn in_namespace(ability: &str, ns: &str) -> bool {
    ability
        .strip_prefix(ns)
        .is_some_and(|rest| rest.starts_with('/'))
}

/// Whether a granted resource (`with`) covers `resource`.
pub fn resource_covers(granted: &str, resource: &Did) -> bool {
    granted == WILDCARD_RESOURCE || granted == resource.as_str()
}

/// Answers whether something grants `ability` on `resource` to `audience`.
pub trait CapabilityMatcher {
    /// Whether `audience` may perform `ability` on `resource`
    fn grants(&self, audience: &Did, resource: &Did, ability: &str) -> bool;
}

/// Outcome of a local, best-effort look at a proof set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofCheck {
    /// A concrete delegation grants the ability
    Authorized,
    /// Every proof is concrete and none grants the ability
    Unauthorized,
    /// Some proof is an opaque link, so the answer is left to the remote
    Inconclusive,
}

impl ProofCheck {
    /// True unless the proofs provably do not grant the ability
    pub fn permits(self) -> bool {
        !matches!(self, ProofCheck::Unauthorized)
    }
}

/// Look for a proof granting `ability` on `resource` to `audience`.
///
/// This inspects only the outermost delegations; signatures and chains are
/// left to [`crate::chain::verify_authorization`].
pub fn check_proofs(proofs: &[Proof], audience: &Did, resource: &Did, ability: &str) -> ProofCheck {
    if proofs.iter().any(|p| p.grants(audience, resource, ability)) {
        ProofCheck::Authorized
    } else if proofs.iter().any(Proof::is_link) {
        ProofCheck::Inconclusive
    } else {
        ProofCheck::Unauthorized
    }
}
