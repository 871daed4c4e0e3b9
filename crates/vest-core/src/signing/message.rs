//! EIP-191 personal message wrapping for order hashes.
//!
//! Orders are not signed as EIP-712 typed data. Their 32-byte content hash
//! is wrapped as a "personal message" first, which keeps order digests in a
//! different namespace from the `0x19 0x01` typed-data digests used for
//! signer proofs.

use alloy_primitives::{keccak256, B256};

/// Personal message prefix for a 32-byte payload (`0x19` + "Ethereum Signed
/// Message:\n" + decimal payload length).
pub const PERSONAL_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

/// Compute the digest actually signed for a 32-byte hash.
pub fn wrap_hash(hash: B256) -> B256 {
    let mut data = Vec::with_capacity(PERSONAL_MESSAGE_PREFIX.len() + 32);
    data.extend_from_slice(PERSONAL_MESSAGE_PREFIX);
    data.extend_from_slice(hash.as_slice());
    keccak256(&data)
}
