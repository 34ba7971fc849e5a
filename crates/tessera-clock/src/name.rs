//! Names: DID-identified mutable references and their grants
//!
//! A name is its DID, the agent that signs on the holder's behalf, and the
//! delegations proving what that agent may do with the DID. Local checks on
//! those proofs are best-effort: an opaque link cannot be inspected, so its
//! presence defers the answer to the remote clock service.

use crate::errors::{ClockError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tessera_authorization::{
    ability, check_proofs, find_resource, Capability, Delegation, Did, Proof, ProofCheck, Signer,
};
use tessera_core::{archive, envelope, Block, Cid};

/// Version tag of the name archive root variant.
pub const NAME_VERSION: &str = "tessera/name@0.1.0";

#[derive(Debug, Serialize, Deserialize)]
struct NameData {
    id: Did,
    proofs: Vec<Cid>,
}

/// Options for [`Name::grant`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GrantOptions {
    /// Grant only `clock/head`
    pub read_only: bool,
    /// Expiry in unix seconds; `None` never expires
    pub expiration: Option<u64>,
}

impl GrantOptions {
    /// Read-only grant without expiry
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            expiration: None,
        }
    }

    /// Read/write grant without expiry
    pub fn writable() -> Self {
        Self::default()
    }
}

/// A mutable reference and the authority to use it
#[derive(Debug, Clone)]
pub struct Name {
    did: Did,
    agent: Signer,
    proofs: Vec<Proof>,
}

impl Name {
    /// Create a name with a fresh DID, delegating `*` on it to `agent`
    ///
    /// A fresh agent is generated when none is given.
    pub fn create(agent: Option<Signer>) -> Result<Self> {
        let agent = agent.unwrap_or_else(Signer::generate);
        let issuer = Signer::generate();
        let did = issuer.did().clone();
        let root = Delegation::builder(agent.did().clone())
            .capability(Capability::new(ability::ANY, did.as_str()))
            .sign(&issuer)?;

        tracing::debug!(name = %did, agent = %agent.did(), "created name");
        Ok(Self {
            did,
            agent,
            proofs: vec![Proof::Delegation(root)],
        })
    }

    /// Import a name from proofs delegated to `agent`
    ///
    /// Without `id`, the DID is taken from the first proof delegating a clock
    /// ability to the agent.
    pub fn from_proofs(agent: Signer, proofs: Vec<Proof>, id: Option<Did>) -> Result<Self> {
        let missing = || ClockError::NoMatchingProof {
            agent: agent.did().clone(),
        };
        let did = match id {
            Some(did) => did,
            None => find_resource(&proofs, agent.did(), ability::CLOCK_ANY).ok_or_else(missing)?,
        };
        if check_proofs(&proofs, agent.did(), &did, ability::CLOCK_ANY) == ProofCheck::Unauthorized
        {
            return Err(missing());
        }
        Ok(Self { did, agent, proofs })
    }

    /// The name's DID
    pub fn did(&self) -> &Did {
        &self.did
    }

    /// The signing agent
    pub fn agent(&self) -> &Signer {
        &self.agent
    }

    /// Proofs authorizing the agent
    pub fn proofs(&self) -> &[Proof] {
        &self.proofs
    }

    /// A copy of this name carrying additional proofs
    pub fn with_proofs(&self, proofs: impl IntoIterator<Item = Proof>) -> Self {
        let mut seen: HashSet<Cid> = self.proofs.iter().map(Proof::cid).collect();
        let mut next = self.clone();
        for proof in proofs {
            if seen.insert(proof.cid()) {
                next.proofs.push(proof);
            }
        }
        next
    }

    /// Delegate access to this name to `recipient`
    ///
    /// `clock/head` is always granted; `clock/advance` is added unless the
    /// grant is read-only, and only if the name's own proofs may be writable.
    pub fn grant(&self, recipient: &Did, options: GrantOptions) -> Result<Delegation> {
        if !options.read_only
            && !check_proofs(&self.proofs, self.agent.did(), &self.did, ability::ADVANCE).permits()
        {
            return Err(ClockError::NotWritable {
                name: self.did.clone(),
                agent: self.agent.did().clone(),
            });
        }

        let mut builder = Delegation::builder(recipient.clone())
            .capability(Capability::new(ability::HEAD, self.did.as_str()));
        if !options.read_only {
            builder = builder.capability(Capability::new(ability::ADVANCE, self.did.as_str()));
        }
        let delegation = builder
            .expiration(options.expiration)
            .proofs(self.proofs.iter().cloned())
            .sign(&self.agent)?;

        tracing::debug!(
            name = %self.did,
            %recipient,
            read_only = options.read_only,
            delegation = %delegation.cid(),
            "granted name access"
        );
        Ok(delegation)
    }

    /// Encode the agent-independent part of the name as an archive
    ///
    /// Concrete proofs travel as embedded blocks; links stay links.
    pub fn archive(&self) -> Result<Vec<u8>> {
        let data = Block::encode(&NameData {
            id: self.did.clone(),
            proofs: self.proofs.iter().map(Proof::cid).collect(),
        })?;
        let root = *data.cid();

        let mut blocks = vec![data];
        for delegation in self.proofs.iter().filter_map(Proof::as_delegation) {
            blocks.extend(delegation.export());
        }
        Ok(archive::archive(NAME_VERSION, root, blocks)?)
    }

    /// Decode an archive produced by [`Name::archive`], held by `agent`
    pub fn extract(agent: Signer, bytes: &[u8]) -> Result<Self> {
        let extracted = archive::extract(NAME_VERSION, bytes)?;
        let data: NameData = extracted.root_block()?.decode()?;

        let lookup = |cid: &Cid| extracted.car.get(cid).cloned();
        let proofs = data
            .proofs
            .iter()
            .map(|cid| match extracted.car.get(cid) {
                Some(block) => Delegation::decode(block, &lookup).map(Proof::Delegation),
                None => Ok(Proof::Link(*cid)),
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            did: data.id,
            agent,
            proofs,
        })
    }

    /// Archive wrapped in the self-describing text envelope
    pub fn format(&self) -> Result<String> {
        Ok(envelope::format(&self.archive()?))
    }

    /// Parse the output of [`Name::format`], held by `agent`
    pub fn parse(agent: Signer, text: &str) -> Result<Self> {
        Self::extract(agent, &envelope::parse(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::ArchiveError;

    #[test]
    fn test_create_delegates_everything_to_agent() {
        let agent = Signer::generate();
        let name = Name::create(Some(agent.clone())).unwrap();

        let root = name.proofs()[0].as_delegation().unwrap();
        assert_eq!(root.issuer(), name.did());
        assert_eq!(root.audience(), agent.did());
        assert_eq!(root.capabilities(), &[Capability::new("*", name.did().as_str())]);
        assert_eq!(root.expiration(), None);
    }

    #[test]
    fn test_from_proofs_derives_id() {
        let name = Name::create(None).unwrap();
        let recipient = Signer::generate();
        let grant = name.grant(recipient.did(), GrantOptions::read_only()).unwrap();

        let imported = Name::from_proofs(recipient, vec![grant.into()], None).unwrap();
        assert_eq!(imported.did(), name.did());
    }

    #[test]
    fn test_from_proofs_names_missing_agent() {
        let name = Name::create(None).unwrap();
        let stranger = Signer::generate();
        let stranger_did = stranger.did().clone();

        match Name::from_proofs(stranger, name.proofs().to_vec(), Some(name.did().clone())) {
            Err(ClockError::NoMatchingProof { agent }) => assert_eq!(agent, stranger_did),
            other => panic!("expected NoMatchingProof, got {other:?}"),
        }
    }

    #[test]
    fn test_from_links_requires_id() {
        let name = Name::create(None).unwrap();
        let links: Vec<Proof> = name.proofs().iter().map(|p| Proof::Link(p.cid())).collect();
        let agent = name.agent().clone();

        assert!(Name::from_proofs(agent.clone(), links.clone(), None).is_err());
        let imported = Name::from_proofs(agent, links, Some(name.did().clone())).unwrap();
        assert!(imported.proofs()[0].is_link());
    }

    #[test]
    fn test_write_grant_is_superset_of_read_grant() {
        let name = Name::create(None).unwrap();
        let recipient = Signer::generate();
        let read = name.grant(recipient.did(), GrantOptions::read_only()).unwrap();
        let write = name.grant(recipient.did(), GrantOptions::writable()).unwrap();

        for cap in read.capabilities() {
            assert!(write.capabilities().contains(cap));
        }
        assert!(write.capabilities().len() > read.capabilities().len());
    }

    #[test]
    fn test_read_only_name_cannot_grant_write() {
        let name = Name::create(None).unwrap();
        let reader = Signer::generate();
        let grant = name.grant(reader.did(), GrantOptions::read_only()).unwrap();
        let read_only = Name::from_proofs(reader, vec![grant.into()], None).unwrap();

        let err = read_only
            .grant(Signer::generate().did(), GrantOptions::writable())
            .unwrap_err();
        assert!(err.to_string().contains("not writable"), "{err}");
        assert!(read_only
            .grant(Signer::generate().did(), GrantOptions::read_only())
            .is_ok());
    }

    #[test]
    fn test_link_only_name_may_grant_write() {
        let name = Name::create(None).unwrap();
        let links = name.proofs().iter().map(|p| Proof::Link(p.cid())).collect();
        let opaque =
            Name::from_proofs(name.agent().clone(), links, Some(name.did().clone())).unwrap();
        assert!(opaque
            .grant(Signer::generate().did(), GrantOptions::writable())
            .is_ok());
    }

    #[test]
    fn test_archive_round_trip() {
        let name = Name::create(None).unwrap();
        let recipient = Signer::generate();
        let grant = name.grant(recipient.did(), GrantOptions::writable()).unwrap();
        let held = Name::from_proofs(recipient.clone(), vec![grant.into()], None).unwrap();

        let back = Name::parse(recipient, &held.format().unwrap()).unwrap();
        assert_eq!(back.did(), held.did());
        let cids: Vec<Cid> = back.proofs().iter().map(Proof::cid).collect();
        let expected: Vec<Cid> = held.proofs().iter().map(Proof::cid).collect();
        assert_eq!(cids, expected);
        // The chain back to the name survives embedding.
        let proof = back.proofs()[0].as_delegation().unwrap();
        assert!(proof.proofs()[0].as_delegation().is_some());
    }

    #[test]
    fn test_extract_rejects_revision_archive() {
        let block = Block::encode(&"x".to_string()).unwrap();
        let bytes =
            archive::archive(crate::revision::REVISION_VERSION, *block.cid(), [block]).unwrap();
        assert!(matches!(
            Name::extract(Signer::generate(), &bytes),
            Err(ClockError::Archive(ArchiveError::UnknownVersion { .. }))
        ));
    }

    #[test]
    fn test_with_proofs_accretes_without_duplicates() {
        let name = Name::create(None).unwrap();
        let extra = name.grant(Signer::generate().did(), GrantOptions::read_only()).unwrap();
        let grown = name.with_proofs([extra.clone().into(), extra.into()]);

        assert_eq!(name.proofs().len(), 1);
        assert_eq!(grown.proofs().len(), 2);
        let again = grown.with_proofs(name.proofs().to_vec());
        assert_eq!(again.proofs().len(), 2);
    }
}
