//! Signing key generation and secret scalar handling.
//!
//! Secret material lives in [`Zeroizing`] buffers for its whole lifetime so
//! it is wiped on drop, including on early returns and error paths.

use alloy_primitives::{keccak256, Address, U256};
use alloy_signer_local::PrivateKeySigner;
use k256::ecdsa::{SigningKey, VerifyingKey};
use rand::{CryptoRng, RngCore};
use tracing::debug;
use zeroize::Zeroizing;

use crate::{Error, Result};

/// Order `n` of the secp256k1 base point.
pub const SECP256K1_ORDER: U256 = U256::from_limbs([
    0xBFD25E8CD0364141,
    0xBAAEDCE6AF48A03B,
    0xFFFFFFFFFFFFFFFE,
    0xFFFFFFFFFFFFFFFF,
]);

/// Consecutive out-of-range draws tolerated before the random source is
/// treated as broken.
const MAX_KEYGEN_ATTEMPTS: usize = 64;

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// `0x` plus two digits per scalar byte.
const REVEALED_HEX_LEN: usize = 2 + 64;

/// A secp256k1 private scalar in `[1, n - 1]`.
///
/// Never printed by `Debug`; the only way to render it is [`reveal_hex`],
/// which itself returns a zeroizing string.
///
/// [`reveal_hex`]: SecretScalar::reveal_hex
pub struct SecretScalar(Zeroizing<[u8; 32]>);

impl SecretScalar {
    /// Validate and copy a 32-byte big-endian scalar.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self> {
        if bytes.iter().all(|b| *b == 0) {
            return Err(Error::invalid_key("private scalar is zero"));
        }
        // Big-endian byte order makes lexicographic comparison numeric.
        let order: [u8; 32] = SECP256K1_ORDER.to_be_bytes();
        if bytes.as_slice() >= order.as_slice() {
            return Err(Error::invalid_key(
                "private scalar is not below the secp256k1 curve order",
            ));
        }
        Ok(Self(Zeroizing::new(*bytes)))
    }

    /// Parse a 64-character hex scalar, optionally prefixed with "0x".
    ///
    /// The input is never echoed back in error messages.
    pub fn from_hex(key: &str) -> Result<Self> {
        let trimmed = key.trim();
        let key_clean = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        if key_clean.len() != 64 {
            return Err(Error::invalid_key(format!(
                "expected 64 hex characters, got {}",
                key_clean.len()
            )));
        }

        let mut bytes = Zeroizing::new([0u8; 32]);
        hex::decode_to_slice(key_clean, bytes.as_mut_slice())
            .map_err(|_| Error::invalid_key("private key is not valid hex"))?;

        Self::from_bytes(&bytes)
    }

    /// Render the scalar as `0x`-prefixed hex for deliberate output only.
    ///
    /// The string is written into one exactly-sized zeroizing buffer, so no
    /// intermediate or reallocated copy of the key is left behind.
    pub fn reveal_hex(&self) -> Zeroizing<String> {
        let mut out = Zeroizing::new(String::with_capacity(REVEALED_HEX_LEN));
        out.push_str("0x");
        for byte in self.0.iter() {
            out.push(char::from(HEX_DIGITS[usize::from(byte >> 4)]));
            out.push(char::from(HEX_DIGITS[usize::from(byte & 0x0f)]));
        }
        out
    }

    /// The address controlled by this scalar.
    pub fn address(&self) -> Result<Address> {
        Ok(address_from_verifying_key(self.signing_key()?.verifying_key()))
    }

    pub(crate) fn signing_key(&self) -> Result<SigningKey> {
        SigningKey::from_slice(self.0.as_slice())
            .map_err(|_| Error::invalid_key("private scalar rejected by secp256k1"))
    }

    pub(crate) fn local_signer(&self) -> Result<PrivateKeySigner> {
        Ok(PrivateKeySigner::from(self.signing_key()?))
    }
}

impl std::fmt::Debug for SecretScalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretScalar(<redacted>)")
    }
}

/// Derive an Ethereum address: the last 20 bytes of the keccak-256 hash of
/// the uncompressed public point without its `0x04` tag.
pub fn address_from_verifying_key(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    Address::from_slice(&keccak256(&point.as_bytes()[1..])[12..])
}

/// A private scalar together with the address it controls.
pub struct KeyPair {
    secret: SecretScalar,
    address: Address,
}

impl KeyPair {
    /// Build a key pair, deriving the address from the scalar.
    pub fn from_secret(secret: SecretScalar) -> Result<Self> {
        let address = secret.address()?;
        Ok(Self { secret, address })
    }

    /// Load a key pair from a hex-encoded private key.
    pub fn from_hex(key: &str) -> Result<Self> {
        Self::from_secret(SecretScalar::from_hex(key)?)
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn secret(&self) -> &SecretScalar {
        &self.secret
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never expose the private key in debug output
        f.debug_struct("KeyPair")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Generates fresh delegated signing keys.
pub struct KeyGenerator;

impl KeyGenerator {
    /// Generate a key pair from the thread-local CSPRNG.
    pub fn generate() -> Result<KeyPair> {
        Self::generate_with(&mut rand::rng())
    }

    /// Generate a key pair from an explicit cryptographically secure source.
    ///
    /// Draws that are zero or not below the curve order are discarded and
    /// redrawn.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] if the source keeps producing
    /// out-of-range scalars, which only a broken source does.
    pub fn generate_with<R: CryptoRng + ?Sized>(rng: &mut R) -> Result<KeyPair> {
        let mut candidate = Zeroizing::new([0u8; 32]);

        for attempt in 1..=MAX_KEYGEN_ATTEMPTS {
            rng.fill_bytes(candidate.as_mut_slice());

            match SecretScalar::from_bytes(&candidate) {
                Ok(secret) => {
                    let pair = KeyPair::from_secret(secret)?;
                    debug!(address = %pair.address(), attempt, "Generated signing key");
                    return Ok(pair);
                }
                Err(Error::InvalidKey { .. }) => {
                    debug!(attempt, "Random scalar out of range, resampling");
                }
                Err(e) => return Err(e),
            }
        }

        Err(Error::invalid_key(format!(
            "random source produced no valid scalar in {} attempts",
            MAX_KEYGEN_ATTEMPTS
        )))
    }
}
