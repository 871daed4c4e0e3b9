//! Vest Core Library
//!
//! Delegated signing key authorization and order signing for the Vest
//! exchange: EIP-712 typed-data hashing for signer proofs, ABI canonical
//! encoding for orders, EIP-191 message wrapping and deterministic
//! secp256k1 signing with address recovery.

pub mod api;
pub mod config;
pub mod error;
pub mod signing;

pub use error::{Error, Result};
