//! Delegation chain verification
//!
//! A chain is valid when every link is signed by its issuer, unexpired,
//! addressed to the next party down, and carries a capability covering the
//! request; the topmost link must be issued by the resource DID itself.

use crate::capability::CapabilityMatcher;
use crate::delegation::Delegation;
use crate::did::Did;
use crate::errors::{AuthorizationError, Result};
use crate::proof::Proof;

/// Longest chain followed before giving up.
pub const MAX_CHAIN_DEPTH: usize = 16;

/// Verify that some proof chain lets `audience` perform `ability` on `resource`.
///
/// Opaque link proofs cannot be followed and are skipped. On failure the
/// error carries the reason the last candidate chain was rejected.
pub fn verify_authorization(
    proofs: &[Proof],
    audience: &Did,
    resource: &Did,
    ability: &str,
    now: u64,
) -> Result<()> {
    let mut reason = String::from("no delegation addressed to the invoker");
    for delegation in proofs.iter().filter_map(Proof::as_delegation) {
        match verify_link(delegation, audience, resource, ability, now, 0) {
            Ok(()) => return Ok(()),
            Err(why) => reason = why,
        }
    }

    tracing::debug!(%audience, %resource, ability, reason = %reason, "authorization rejected");
    Err(AuthorizationError::Unauthorized {
        audience: audience.clone(),
        resource: resource.clone(),
        ability: ability.to_string(),
        reason,
    })
}

fn verify_link(
    delegation: &Delegation,
    audience: &Did,
    resource: &Did,
    ability: &str,
    now: u64,
    depth: usize,
) -> std::result::Result<(), String> {
    let cid = delegation.cid();
    if depth >= MAX_CHAIN_DEPTH {
        return Err(format!("chain deeper than {MAX_CHAIN_DEPTH}"));
    }
    if !delegation.grants(audience, resource, ability) {
        return Err(format!("delegation {cid} does not grant {ability} to {audience}"));
    }
    if delegation.is_expired(now) {
        return Err(format!("delegation {cid} expired"));
    }
    delegation.verify_signature().map_err(|e| e.to_string())?;

    let issuer = delegation.issuer();
    if issuer == resource {
        return Ok(());
    }

    let mut reason = format!("delegation {cid} from {issuer} has no proof reaching {resource}");
    for parent in delegation.proofs().iter().filter_map(Proof::as_delegation) {
        match verify_link(parent, issuer, resource, ability, now, depth + 1) {
            Ok(()) => return Ok(()),
            Err(why) => reason = why,
        }
    }
    Err(reason)
}
