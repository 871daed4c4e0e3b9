//! Vest Signer: delegated signing key registration and order signing for Vest.
//!
//! This is the root crate that provides benchmark and integration test access
//! to the workspace crates:
//!
//! - `vest-core`: typed-data hashing, order canonicalization, signing, config
//!   and the registration client
//! - `vest-cli`: the `vest-cli` command-line tool

// Re-export for benchmarks
pub use vest_core as core;
