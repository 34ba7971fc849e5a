//! The boundary to remote clock services
//!
//! The protocol talks to a remote through [`ClockConnection`]: it hands over
//! a signed [`Invocation`] and gets back the remote's head. How the
//! invocation reaches the remote is the connection's business.

use crate::config::RemoteConfig;
use crate::errors::Result;
use crate::name::Name;
use crate::revision::EventBlock;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tessera_authorization::{ability, verify_signature, AuthorizationError, Did, Proof, Signer};
use tessera_core::{serialization, Block, Cid};

/// Caveats of an `advance` invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caveats {
    /// Event to fold into the remote head
    pub event: Cid,
}

/// The capability being invoked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvokedCapability {
    /// Optional caveats
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nb: Option<Caveats>,
    /// Ability
    pub can: String,
    /// Name DID
    pub with: Did,
}

/// Signed portion of an invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationPayload {
    /// Remote the invocation is addressed to
    pub aud: Did,
    /// Invoked capability
    pub cap: InvokedCapability,
    /// Invoking agent
    pub iss: Did,
    /// Links to the proofs
    pub prf: Vec<Cid>,
}

/// A signed request to a remote clock
#[derive(Debug, Clone)]
pub struct Invocation {
    payload: InvocationPayload,
    signature: Vec<u8>,
    proofs: Vec<Proof>,
    blocks: Vec<Block>,
}

impl Invocation {
    /// `clock/advance` with `event` attached
    pub fn advance<O>(name: &Name, audience: &Did, event: &EventBlock<O>) -> Result<Self> {
        Self::sign(
            name.agent(),
            audience,
            InvokedCapability {
                nb: Some(Caveats { event: *event.cid() }),
                can: ability::ADVANCE.to_string(),
                with: name.did().clone(),
            },
            name.proofs().to_vec(),
            vec![event.block().clone()],
        )
    }

    /// `clock/head`
    pub fn head(name: &Name, audience: &Did) -> Result<Self> {
        Self::sign(
            name.agent(),
            audience,
            InvokedCapability {
                nb: None,
                can: ability::HEAD.to_string(),
                with: name.did().clone(),
            },
            name.proofs().to_vec(),
            Vec::new(),
        )
    }

    fn sign(
        agent: &Signer,
        audience: &Did,
        cap: InvokedCapability,
        proofs: Vec<Proof>,
        blocks: Vec<Block>,
    ) -> Result<Self> {
        let payload = InvocationPayload {
            aud: audience.clone(),
            cap,
            iss: agent.did().clone(),
            prf: proofs.iter().map(Proof::cid).collect(),
        };
        let signature = agent.sign(&serialization::to_vec(&payload)?);
        Ok(Self {
            payload,
            signature,
            proofs,
            blocks,
        })
    }

    /// Signed payload
    pub fn payload(&self) -> &InvocationPayload {
        &self.payload
    }

    /// Invoking agent
    pub fn issuer(&self) -> &Did {
        &self.payload.iss
    }

    /// Addressed remote
    pub fn audience(&self) -> &Did {
        &self.payload.aud
    }

    /// Invoked capability
    pub fn capability(&self) -> &InvokedCapability {
        &self.payload.cap
    }

    /// Proofs supplied with the invocation
    pub fn proofs(&self) -> &[Proof] {
        &self.proofs
    }

    /// Blocks attached to the invocation
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Check the issuer's signature
    pub fn verify_signature(&self) -> std::result::Result<(), AuthorizationError> {
        let message = serialization::to_vec(&self.payload)?;
        if verify_signature(&self.payload.iss, &message, &self.signature)? {
            Ok(())
        } else {
            Err(AuthorizationError::InvalidSigner(format!(
                "invocation signature does not match {}",
                self.payload.iss
            )))
        }
    }
}

/// A remote's head after handling an invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadResponse {
    /// Head event CIDs; empty if nothing was ever published
    pub head: Vec<Cid>,
}

/// Structured failure reported by a remote
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// The proofs do not authorize the invocation
    #[error("unauthorized: {reason}")]
    Unauthorized {
        /// Remote's explanation
        reason: String,
    },

    /// The remote handled the invocation and failed
    #[error("{name}: {message}")]
    Failure {
        /// Error name, e.g. `MissingEvent`
        name: String,
        /// Detail
        message: String,
    },

    /// The invocation never reached the remote
    #[error("connection failed: {0}")]
    Connection(String),
}

impl RemoteError {
    /// Shorthand for [`RemoteError::Failure`]
    pub fn failure(name: impl Into<String>, message: impl fmt::Display) -> Self {
        RemoteError::Failure {
            name: name.into(),
            message: message.to_string(),
        }
    }
}

/// Transport to one remote clock service
#[async_trait]
pub trait ClockConnection: Send + Sync {
    /// DID of the remote service
    fn did(&self) -> &Did;

    /// Deliver `invocation` and wait for the remote's answer
    async fn invoke(
        &self,
        invocation: Invocation,
    ) -> std::result::Result<HeadResponse, RemoteError>;
}

/// A configured remote
#[derive(Clone)]
pub struct Remote {
    connection: Arc<dyn ClockConnection>,
}

impl Remote {
    /// Wrap a connection
    pub fn new(connection: Arc<dyn ClockConnection>) -> Self {
        Self { connection }
    }

    /// DID of the remote service
    pub fn did(&self) -> &Did {
        self.connection.did()
    }

    /// Deliver an invocation
    pub async fn invoke(
        &self,
        invocation: Invocation,
    ) -> std::result::Result<HeadResponse, RemoteError> {
        self.connection.invoke(invocation).await
    }
}

impl fmt::Debug for Remote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Remote").field("did", self.did()).finish()
    }
}

/// Turns configured remotes into connections
pub trait ConnectionFactory: Send + Sync {
    /// Connect to `remote`
    fn connect(&self, remote: &RemoteConfig) -> Result<Remote>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_invocation_is_signed_and_carries_event() {
        let name = Name::create(None).unwrap();
        let remote = Did::parse("did:web:clock.example").unwrap();
        let event = EventBlock::new("v".to_string(), []).unwrap();

        let invocation = Invocation::advance(&name, &remote, &event).unwrap();
        assert!(invocation.verify_signature().is_ok());
        assert_eq!(invocation.audience(), &remote);
        assert_eq!(invocation.issuer(), name.agent().did());
        assert_eq!(invocation.capability().can, ability::ADVANCE);
        assert_eq!(
            invocation.capability().nb,
            Some(Caveats { event: *event.cid() })
        );
        assert_eq!(invocation.blocks(), &[event.block().clone()]);
    }

    #[test]
    fn test_tampered_invocation_fails_verification() {
        let name = Name::create(None).unwrap();
        let remote = Did::parse("did:web:clock.example").unwrap();
        let mut invocation = Invocation::head(&name, &remote).unwrap();
        invocation.payload.cap.can = ability::ADVANCE.to_string();
        assert!(invocation.verify_signature().is_err());
    }
}
