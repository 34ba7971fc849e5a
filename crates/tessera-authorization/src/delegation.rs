//! Signed capability delegations
//!
//! A delegation is a DAG-CBOR block `{ p: payload, s: signature }` where the
//! signature is the issuer's ed25519 signature over the DAG-CBOR encoding of
//! the payload. The payload links its own proofs by CID; when those proofs
//! are available they are decoded alongside and travel with the delegation.

use crate::capability::{Capability, CapabilityMatcher};
use crate::did::Did;
use crate::errors::{AuthorizationError, Result};
use crate::proof::Proof;
use crate::signer::{verify_signature, Signer};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};
use tessera_core::{archive, envelope, serialization, Block, Car, Cid};

/// Version tag of the delegation archive root variant.
pub const ARCHIVE_VERSION: &str = "ucan@0.9.1";

/// Signed portion of a delegation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    /// Delegated capabilities
    pub att: Vec<Capability>,
    /// Recipient
    pub aud: Did,
    /// Expiry in unix seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
    /// Issuer
    pub iss: Did,
    /// Links to the delegations this one is derived from
    pub prf: Vec<Cid>,
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    p: Payload,
    #[serde(with = "serde_bytes")]
    s: Vec<u8>,
}

/// A decoded delegation with whatever proofs could be resolved
#[derive(Debug, Clone)]
pub struct Delegation {
    payload: Payload,
    signature: Vec<u8>,
    block: Block,
    proofs: Vec<Proof>,
}

/// Builder for a new delegation
#[derive(Debug, Clone)]
pub struct DelegationBuilder {
    audience: Did,
    capabilities: Vec<Capability>,
    expiration: Option<u64>,
    proofs: Vec<Proof>,
}

impl DelegationBuilder {
    /// Add a capability
    pub fn capability(mut self, capability: Capability) -> Self {
        self.capabilities.push(capability);
        self
    }

    /// Set the expiry in unix seconds (`None` = never)
    pub fn expiration(mut self, expiration: Option<u64>) -> Self {
        self.expiration = expiration;
        self
    }

    /// Attach the proofs this delegation derives from
    pub fn proofs(mut self, proofs: impl IntoIterator<Item = Proof>) -> Self {
        self.proofs.extend(proofs);
        self
    }

    /// Sign the delegation as `issuer`
    pub fn sign(self, issuer: &Signer) -> Result<Delegation> {
        let payload = Payload {
            att: self.capabilities,
            aud: self.audience,
            exp: self.expiration,
            iss: issuer.did().clone(),
            prf: self.proofs.iter().map(Proof::cid).collect(),
        };
        let signature = issuer.sign(&serialization::to_vec(&payload)?);
        let block = Block::encode(&Envelope {
            p: payload.clone(),
            s: signature.clone(),
        })?;
        Ok(Delegation {
            payload,
            signature,
            block,
            proofs: self.proofs,
        })
    }
}

impl Delegation {
    /// Start building a delegation to `audience`
    pub fn builder(audience: Did) -> DelegationBuilder {
        DelegationBuilder {
            audience,
            capabilities: Vec::new(),
            expiration: None,
            proofs: Vec::new(),
        }
    }

    /// Decode a delegation block, resolving linked proofs through `lookup`
    pub fn decode(block: &Block, lookup: &dyn Fn(&Cid) -> Option<Block>) -> Result<Self> {
        let envelope: Envelope = block.decode()?;
        let proofs = envelope
            .p
            .prf
            .iter()
            .map(|cid| match lookup(cid) {
                Some(proof) => Delegation::decode(&proof, lookup).map(Proof::Delegation),
                None => Ok(Proof::Link(*cid)),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            payload: envelope.p,
            signature: envelope.s,
            block: block.clone(),
            proofs,
        })
    }

    /// CID of the delegation block
    pub fn cid(&self) -> &Cid {
        self.block.cid()
    }

    /// The encoded delegation block
    pub fn block(&self) -> &Block {
        &self.block
    }

    /// Issuer DID
    pub fn issuer(&self) -> &Did {
        &self.payload.iss
    }

    /// Audience DID
    pub fn audience(&self) -> &Did {
        &self.payload.aud
    }

    /// Delegated capabilities
    pub fn capabilities(&self) -> &[Capability] {
        &self.payload.att
    }

    /// Expiry in unix seconds
    pub fn expiration(&self) -> Option<u64> {
        self.payload.exp
    }

    /// Proofs, resolved where their blocks were available
    pub fn proofs(&self) -> &[Proof] {
        &self.proofs
    }

    /// The signed payload
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Whether the delegation has expired at `now` (unix seconds)
    pub fn is_expired(&self, now: u64) -> bool {
        self.payload.exp.is_some_and(|exp| exp <= now)
    }

    /// Check the issuer's signature over the payload
    pub fn verify_signature(&self) -> Result<()> {
        let message = serialization::to_vec(&self.payload)?;
        if verify_signature(&self.payload.iss, &message, &self.signature)? {
            Ok(())
        } else {
            Err(AuthorizationError::InvalidSignature {
                cid: *self.cid(),
                issuer: self.payload.iss.clone(),
            })
        }
    }

    /// This delegation's block plus every embedded proof block, proofs first
    pub fn export(&self) -> Vec<Block> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        self.export_into(&mut seen, &mut out);
        out
    }

    fn export_into(&self, seen: &mut HashSet<Cid>, out: &mut Vec<Block>) {
        for proof in self.proofs.iter().filter_map(Proof::as_delegation) {
            proof.export_into(seen, out);
        }
        if seen.insert(*self.cid()) {
            out.push(self.block.clone());
        }
    }

    /// Encode as a CAR rooted at a `ucan@0.9.1` variant
    pub fn archive(&self) -> Result<Vec<u8>> {
        Ok(archive::archive(ARCHIVE_VERSION, *self.cid(), self.export())?)
    }

    /// Decode an archive produced by [`Delegation::archive`]
    ///
    /// Legacy exports carry no version variant: their header names no root,
    /// or names the delegation block itself. Both are read by taking the last
    /// block of the CAR as the delegation.
    pub fn extract(bytes: &[u8]) -> Result<Self> {
        let car = Car::decode(bytes)?;
        if is_legacy(&car) {
            tracing::debug!(
                roots = car.roots().len(),
                "reading unversioned delegation archive"
            );
            let root = car
                .blocks()
                .last()
                .ok_or_else(|| AuthorizationError::MalformedArchive("no blocks".into()))?;
            return Delegation::decode(root, &|cid| car.get(cid).cloned());
        }

        let extracted = archive::extract_car(ARCHIVE_VERSION, car)?;
        let root = extracted.root_block()?;
        Delegation::decode(root, &|cid| extracted.car.get(cid).cloned())
    }

    /// Archive wrapped in the self-describing text envelope
    pub fn format(&self) -> Result<String> {
        Ok(envelope::format(&self.archive()?))
    }

    /// Parse the output of [`Delegation::format`]
    pub fn parse(text: &str) -> Result<Self> {
        Self::extract(&envelope::parse(text)?)
    }
}

/// Whether `car` predates the versioned archive layout
fn is_legacy(car: &Car) -> bool {
    match car.roots() {
        [] => true,
        [root] => car
            .get(root)
            .is_some_and(|block| block.decode::<Envelope>().is_ok()),
        _ => false,
    }
}

impl PartialEq for Delegation {
    fn eq(&self, other: &Self) -> bool {
        self.cid() == other.cid()
    }
}

impl Eq for Delegation {}

impl CapabilityMatcher for Delegation {
    fn grants(&self, audience: &Did, resource: &Did, ability: &str) -> bool {
        self.audience() == audience
            && self
                .capabilities()
                .iter()
                .any(|c| c.covers(resource, ability))
    }
}

/// Current time in unix seconds
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::ability;

    fn root_and_child() -> (Signer, Signer, Delegation, Delegation) {
        let name = Signer::generate();
        let agent = Signer::generate();
        let root = Delegation::builder(agent.did().clone())
            .capability(Capability::new(ability::ANY, name.did().as_str()))
            .sign(&name)
            .unwrap();
        let child = Delegation::builder(Did::parse("did:key:zRecipient").unwrap())
            .capability(Capability::new(ability::HEAD, name.did().as_str()))
            .proofs([Proof::Delegation(root.clone())])
            .sign(&agent)
            .unwrap();
        (name, agent, root, child)
    }

    #[test]
    fn test_signature_verifies_and_detects_wrong_issuer() {
        let (name, _, root, _) = root_and_child();
        assert!(root.verify_signature().is_ok());
        assert_eq!(root.issuer(), name.did());

        // Re-label the payload with another issuer; the old signature no longer matches.
        let mut forged = root.clone();
        forged.payload.iss = Signer::generate().did().clone();
        assert!(matches!(
            forged.verify_signature(),
            Err(AuthorizationError::InvalidSignature { .. })
        ));
    }

    #[test]
    fn test_archive_round_trip_keeps_embedded_proofs() {
        let (_, _, root, child) = root_and_child();
        let decoded = Delegation::extract(&child.archive().unwrap()).unwrap();

        assert_eq!(decoded.cid(), child.cid());
        assert_eq!(decoded.proofs().len(), 1);
        assert_eq!(decoded.proofs()[0].as_delegation(), Some(&root));
        assert!(decoded.verify_signature().is_ok());
    }

    #[test]
    fn test_legacy_archive_takes_last_block() {
        let (_, _, _, child) = root_and_child();
        let mut car = Car::new(Vec::new());
        for block in child.export() {
            car.push(block);
        }
        let decoded = Delegation::extract(&car.encode().unwrap()).unwrap();
        assert_eq!(decoded.cid(), child.cid());
        assert!(!decoded.proofs()[0].is_link());
    }

    #[test]
    fn test_legacy_archive_rooted_at_delegation() {
        let (_, _, root, child) = root_and_child();
        let mut car = Car::new(vec![*child.cid()]);
        for block in child.export() {
            car.push(block);
        }
        let decoded = Delegation::extract(&car.encode().unwrap()).unwrap();
        assert_eq!(decoded.cid(), child.cid());
        assert_eq!(&decoded.proofs()[0].cid(), root.cid());
        assert!(!decoded.proofs()[0].is_link());
    }

    #[test]
    fn test_unknown_variant_is_not_read_as_legacy() {
        let (_, _, _, child) = root_and_child();
        let bytes = archive::archive("ucan@0.10.0", *child.cid(), child.export()).unwrap();
        assert!(matches!(
            Delegation::extract(&bytes),
            Err(AuthorizationError::Archive(_))
        ));
    }

    #[test]
    fn test_missing_proof_block_becomes_link() {
        let (_, _, root, child) = root_and_child();
        let decoded = Delegation::decode(child.block(), &|_| None).unwrap();
        assert!(matches!(decoded.proofs(), [Proof::Link(cid)] if cid == root.cid()));
    }

    #[test]
    fn test_expiry() {
        let agent = Signer::generate();
        let d = Delegation::builder(agent.did().clone())
            .capability(Capability::new(ability::HEAD, "ucan:*"))
            .expiration(Some(100))
            .sign(&agent)
            .unwrap();
        assert!(!d.is_expired(99));
        assert!(d.is_expired(100));
    }

    #[test]
    fn test_text_form_round_trip() {
        let (_, _, _, child) = root_and_child();
        let parsed = Delegation::parse(&child.format().unwrap()).unwrap();
        assert_eq!(parsed, child);
    }
}
