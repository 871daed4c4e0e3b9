//! Signing module for Vest delegated keys and orders.
//!
//! Two independent pipelines share one ECDSA core:
//!
//! ```text
//! KeyGenerator ──► KeyPair (delegated)
//!                        │ address
//!                        ▼
//! SignerProof ── EIP-712 (Domain + TypeSchema) ──► digest ──┐
//!                                                           │
//!                                   primary KeyPair ──► sign_digest ──► SignedProof
//!                                                                            │
//!                                                                            ▼
//!                                                              RegistrationRequest
//!
//! Order ── ABI params ──► keccak ──► EIP-191 wrap ──► digest ──┐
//!                                                              │
//!                                 delegated KeyPair ──► sign_digest ──► SignedOrder
//! ```
//!
//! # Example
//!
//! ```ignore
//! use vest_core::signing::{Domain, KeyGenerator, KeyPair, Network, OrderBuilder, OrderSigner, SignerProof};
//!
//! let primary = KeyPair::from_hex(&primary_key_hex)?;
//! let delegate = KeyGenerator::generate()?;
//!
//! let proof = SignerProof::expiring_in(delegate.address(), now_ms, DEFAULT_SIGNER_VALIDITY);
//! let signed_proof = proof.sign(&Domain::vest(Network::Production), &primary)?;
//!
//! let order = OrderBuilder::new()
//!     .time_now()
//!     .order_type(OrderType::Market)
//!     .symbol("BTC-PERP")
//!     .buy()
//!     .size("1.0000")
//!     .limit_price("50000.00")
//!     .build()?;
//! let signed_order = OrderSigner::new(delegate).sign_order(&order)?;
//! ```

pub mod domain;
pub mod keys;
pub mod message;
pub mod order;
pub mod proof;
pub mod signer;
pub mod typed_data;

pub use domain::{
    Domain, Network, PRODUCTION_ROUTER_ADDRESS, TESTNET_ROUTER_ADDRESS, VEST_DOMAIN_NAME,
    VEST_DOMAIN_VERSION,
};
pub use keys::{KeyGenerator, KeyPair, SecretScalar};
pub use message::wrap_hash;
pub use order::{Order, OrderBuilder, OrderType, SignedOrder};
pub use proof::{SignedProof, SignerProof, DEFAULT_SIGNER_VALIDITY};
pub use signer::{recover_address, sign_digest, verify_digest, OrderSigner, RecoverableSignature};
pub use typed_data::{hash_typed_data, FieldDef, FieldType, StructValue, TypeSchema, TypedValue};
