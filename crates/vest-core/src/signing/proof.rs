//! Signer proofs: a primary key's EIP-712 authorization of a delegated key.
//!
//! The proof binds the delegated key's address and an expiry:
//!
//! ```text
//! SignerProof(address approvedSigner,uint256 signerExpiry)
//! ```
//!
//! It is signed by the primary key. The delegated key never signs its own
//! proof.

use alloy_primitives::{Address, B256};
use std::time::Duration;
use tracing::{debug, info};

use super::domain::Domain;
use super::keys::KeyPair;
use super::signer::{sign_digest, verify_digest, RecoverableSignature};
use super::typed_data::{hash_typed_data, FieldDef, FieldType, StructValue, TypeSchema};
use crate::{Error, Result};

/// Type name of the proof struct.
pub const SIGNER_PROOF_TYPE: &str = "SignerProof";

/// Validity used when none is configured.
pub const DEFAULT_SIGNER_VALIDITY: Duration = Duration::from_secs(24 * 60 * 60);

/// Authorization of `approved_signer` until `signer_expiry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignerProof {
    pub approved_signer: Address,
    /// Expiry in unix milliseconds.
    pub signer_expiry: u64,
}

impl SignerProof {
    pub fn new(approved_signer: Address, signer_expiry: u64) -> Self {
        Self {
            approved_signer,
            signer_expiry,
        }
    }

    /// Proof expiring `validity` after `now_ms`.
    pub fn expiring_in(approved_signer: Address, now_ms: u64, validity: Duration) -> Self {
        let validity_ms = u64::try_from(validity.as_millis()).unwrap_or(u64::MAX);
        Self::new(approved_signer, now_ms.saturating_add(validity_ms))
    }

    /// Schema holding the `SignerProof` struct.
    pub fn schema() -> TypeSchema {
        TypeSchema::new().define(
            SIGNER_PROOF_TYPE,
            vec![
                FieldDef::new("approvedSigner", FieldType::Address),
                FieldDef::new("signerExpiry", FieldType::Uint256),
            ],
        )
    }

    pub fn struct_value(&self) -> StructValue {
        StructValue::new()
            .with("approvedSigner", self.approved_signer)
            .with("signerExpiry", self.signer_expiry)
    }

    /// EIP-712 digest of this proof under `domain`.
    pub fn digest(&self, domain: &Domain) -> Result<B256> {
        hash_typed_data(domain, &Self::schema(), SIGNER_PROOF_TYPE, &self.struct_value())
    }

    /// Sign the proof with the primary key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] when `primary` is the approved signer
    /// itself.
    pub fn sign(&self, domain: &Domain, primary: &KeyPair) -> Result<SignedProof> {
        if primary.address() == self.approved_signer {
            return Err(Error::invalid_key(
                "a delegated key cannot sign its own signer proof",
            ));
        }

        let digest = self.digest(domain)?;
        let signature = sign_digest(&digest, primary.secret())?;

        info!(
            primary = %primary.address(),
            approved_signer = %self.approved_signer,
            signer_expiry = self.signer_expiry,
            "Signed signer proof"
        );
        debug!(%digest, "Signer proof digest");

        Ok(SignedProof {
            proof: *self,
            primary: primary.address(),
            signature,
        })
    }
}

/// A signer proof with the primary key's signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignedProof {
    pub proof: SignerProof,
    pub primary: Address,
    pub signature: RecoverableSignature,
}

impl SignedProof {
    /// Check that the signature recovers to the primary address under `domain`.
    pub fn verify(&self, domain: &Domain) -> Result<()> {
        verify_digest(&self.proof.digest(domain)?, &self.signature, self.primary)
    }
}
