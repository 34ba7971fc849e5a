//! # Tessera Authorization
//!
//! Identity and capability delegation for Tessera names:
//!
//! - [`Did`] identifiers and the ed25519 [`Signer`] behind `did:key`
//! - [`Capability`] and the one matching rule ([`CapabilityMatcher`])
//! - signed [`Delegation`]s, their archives and text form
//! - [`verify_authorization`] for full chain checks

#![forbid(unsafe_code)]

pub mod capability;
pub mod chain;
pub mod delegation;
pub mod did;
pub mod errors;
pub mod proof;
pub mod signer;

pub use capability::{ability, check_proofs, Capability, CapabilityMatcher, ProofCheck};
pub use chain::verify_authorization;
pub use delegation::{now_secs, Delegation, DelegationBuilder};
pub use did::Did;
pub use errors::{AuthorizationError, Result};
pub use proof::{find_resource, Proof};
pub use signer::{verify_signature, Signer};
