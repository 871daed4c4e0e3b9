//! Deterministic secp256k1 signing and signer recovery.
//!
//! Signatures use RFC 6979 nonces and are normalized to low-s, so the same
//! digest and key always produce the same 65 bytes. The recovery byte
//! follows the 27/28 convention (`27 + y-parity`).

use alloy_primitives::{Address, Signature, B256, U256};
use alloy_signer::SignerSync;
use std::str::FromStr;
use tracing::debug;

use super::keys::{KeyPair, SecretScalar, SECP256K1_ORDER};
use super::order::{Order, SignedOrder};
use crate::{Error, Result};

/// Offset added to the y-parity bit to form `v`.
pub const RECOVERY_ID_OFFSET: u8 = 27;

/// Length of `r ‖ s ‖ v`.
pub const SIGNATURE_LENGTH: usize = 65;

/// Half the curve order; valid signatures keep `s` at or below it.
const SECP256K1_HALF_ORDER: U256 = U256::from_limbs([
    0xDFE92F46681B20A0,
    0x5D576E7357A4501D,
    0xFFFFFFFFFFFFFFFF,
    0x7FFFFFFFFFFFFFFF,
]);

/// ECDSA signature with its recovery byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoverableSignature {
    pub r: B256,
    pub s: B256,
    /// 27 or 28.
    pub v: u8,
}

impl RecoverableSignature {
    /// Parse the 65-byte `r ‖ s ‖ v` form.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != SIGNATURE_LENGTH {
            return Err(Error::invalid_signature(format!(
                "signature must be {} bytes, got {}",
                SIGNATURE_LENGTH,
                bytes.len()
            )));
        }

        let signature = Self {
            r: B256::from_slice(&bytes[..32]),
            s: B256::from_slice(&bytes[32..64]),
            v: bytes[64],
        };
        signature.y_parity()?;
        Ok(signature)
    }

    /// Serialize as `r ‖ s ‖ v`.
    pub fn to_bytes(&self) -> [u8; SIGNATURE_LENGTH] {
        let mut bytes = [0u8; SIGNATURE_LENGTH];
        bytes[..32].copy_from_slice(self.r.as_slice());
        bytes[32..64].copy_from_slice(self.s.as_slice());
        bytes[64] = self.v;
        bytes
    }

    /// `0x`-prefixed hex of the 65 bytes.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes()))
    }

    fn y_parity(&self) -> Result<bool> {
        match self.v {
            27 => Ok(false),
            28 => Ok(true),
            other => Err(Error::invalid_signature(format!(
                "recovery byte must be 27 or 28, got {}",
                other
            ))),
        }
    }

    fn from_alloy(signature: &Signature) -> Self {
        Self {
            r: B256::from(signature.r().to_be_bytes::<32>()),
            s: B256::from(signature.s().to_be_bytes::<32>()),
            v: RECOVERY_ID_OFFSET + u8::from(signature.v()),
        }
    }
}

impl FromStr for RecoverableSignature {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let bytes = hex::decode(trimmed.strip_prefix("0x").unwrap_or(trimmed))
            .map_err(|e| Error::invalid_signature(format!("signature is not valid hex: {}", e)))?;
        Self::from_slice(&bytes)
    }
}

impl std::fmt::Display for RecoverableSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Sign a 32-byte digest with deterministic ECDSA.
///
/// The digest is signed as-is; callers are responsible for domain
/// separation (typed-data or personal-message wrapping).
pub fn sign_digest(digest: &B256, secret: &SecretScalar) -> Result<RecoverableSignature> {
    let signer = secret.local_signer()?;
    let signature = signer
        .sign_hash_sync(digest)
        .map_err(|e| Error::invalid_key(format!("signing failed: {}", e)))?;

    Ok(RecoverableSignature::from_alloy(&signature))
}

/// Recover the address that produced `signature` over `digest`.
///
/// # Errors
///
/// Returns [`Error::InvalidSignature`] for a recovery byte other than 27/28,
/// `r` or `s` outside `[1, n - 1]`, a high-s (malleable) signature, or a
/// failed point recovery.
pub fn recover_address(digest: &B256, signature: &RecoverableSignature) -> Result<Address> {
    let y_parity = signature.y_parity()?;
    let r = U256::from_be_bytes(signature.r.0);
    let s = U256::from_be_bytes(signature.s.0);

    if r.is_zero() || r >= SECP256K1_ORDER {
        return Err(Error::invalid_signature("r is outside the curve order"));
    }
    if s.is_zero() || s >= SECP256K1_ORDER {
        return Err(Error::invalid_signature("s is outside the curve order"));
    }
    if s > SECP256K1_HALF_ORDER {
        return Err(Error::invalid_signature("high-s signature rejected"));
    }

    Signature::new(r, s, y_parity)
        .recover_address_from_prehash(digest)
        .map_err(|e| Error::invalid_signature(format!("public key recovery failed: {}", e)))
}

/// Check that `signature` over `digest` was produced by `expected`.
pub fn verify_digest(
    digest: &B256,
    signature: &RecoverableSignature,
    expected: Address,
) -> Result<()> {
    let recovered = recover_address(digest, signature)?;
    if recovered != expected {
        return Err(Error::VerificationFailed {
            expected,
            recovered,
        });
    }
    Ok(())
}

/// Order signer holding a delegated signing key.
pub struct OrderSigner {
    key: KeyPair,
}

impl OrderSigner {
    /// Create a new order signer from a delegated key.
    pub fn new(key: KeyPair) -> Self {
        Self { key }
    }

    /// Get the signer's address.
    pub fn address(&self) -> Address {
        self.key.address()
    }

    /// Sign an order: canonical encoding, keccak256, personal-message wrap,
    /// then ECDSA.
    pub fn sign_order(&self, order: &Order) -> Result<SignedOrder> {
        let digest = order.signing_digest();
        let signature = sign_digest(&digest, self.key.secret())?;

        debug!(
            signer = %self.address(),
            symbol = order.symbol(),
            %digest,
            "Signed order"
        );

        Ok(SignedOrder::from_order(order, signature.to_hex(), self.address()))
    }

    /// Check that a signature over `order` came from `expected`.
    pub fn verify_order(
        order: &Order,
        signature: &RecoverableSignature,
        expected: Address,
    ) -> Result<()> {
        verify_digest(&order.signing_digest(), signature, expected)
    }
}

impl std::fmt::Debug for OrderSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderSigner")
            .field("address", &self.address())
            .finish()
    }
}
