//! Proofs: delegations either held in full or known only by CID

use crate::capability::{ability_covers, CapabilityMatcher};
use crate::delegation::Delegation;
use crate::did::Did;
use tessera_core::Cid;

/// A proof backing an invocation or a further delegation
#[derive(Debug, Clone)]
pub enum Proof {
    /// A decoded delegation whose fields can be inspected locally
    Delegation(Delegation),
    /// A delegation referenced only by CID; its content is unknown here
    Link(Cid),
}

impl Proof {
    /// CID of the delegation this proof refers to
    pub fn cid(&self) -> Cid {
        match self {
            Proof::Delegation(d) => *d.cid(),
            Proof::Link(cid) => *cid,
        }
    }

    /// Whether this proof cannot be inspected
    pub fn is_link(&self) -> bool {
        matches!(self, Proof::Link(_))
    }

    /// The delegation, if held in full
    pub fn as_delegation(&self) -> Option<&Delegation> {
        match self {
            Proof::Delegation(d) => Some(d),
            Proof::Link(_) => None,
        }
    }
}

impl From<Delegation> for Proof {
    fn from(delegation: Delegation) -> Self {
        Proof::Delegation(delegation)
    }
}

impl CapabilityMatcher for Proof {
    fn grants(&self, audience: &Did, resource: &Did, ability: &str) -> bool {
        self.as_delegation()
            .is_some_and(|d| d.grants(audience, resource, ability))
    }
}

/// Find the resource a proof set delegates to `audience` for `ability`.
///
/// Returns the first concrete delegation capability naming a specific DID;
/// wildcard resources do not identify anything.
pub fn find_resource(proofs: &[Proof], audience: &Did, ability: &str) -> Option<Did> {
    proofs
        .iter()
        .filter_map(Proof::as_delegation)
        .filter(|d| d.audience() == audience)
        .flat_map(|d| d.capabilities())
        .filter(|c| ability_covers(&c.can, ability))
        .find_map(|c| Did::parse(&c.with).ok())
}
