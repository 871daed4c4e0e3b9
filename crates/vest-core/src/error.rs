//! Error types for Vest key registration and order signing.

use alloy_primitives::Address;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid key: {message}")]
    InvalidKey { message: String },

    #[error("Encoding error: {message}")]
    Encoding { message: String },

    #[error("Invalid signature: {message}")]
    InvalidSignature { message: String },

    #[error("Signature verification failed: expected signer {expected}, recovered {recovered}")]
    VerificationFailed { expected: Address, recovered: Address },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Configuration file error: {0}")]
    ConfigFile(#[from] config::ConfigError),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error: {message}")]
    Api { message: String, status: Option<u16> },
}

impl Error {
    pub(crate) fn invalid_key(message: impl Into<String>) -> Self {
        Error::InvalidKey {
            message: message.into(),
        }
    }

    pub(crate) fn encoding(message: impl Into<String>) -> Self {
        Error::Encoding {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_signature(message: impl Into<String>) -> Self {
        Error::InvalidSignature {
            message: message.into(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
