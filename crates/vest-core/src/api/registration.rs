//! Delegated signer registration.
//!
//! A registration is a single `POST <api base>/register` carrying the signed
//! proof. Nothing is retried: a rejected registration needs a fresh proof.

use crate::config::VestConfig;
use crate::signing::domain::Network;
use crate::signing::proof::SignedProof;
use crate::{Error, Result};
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Connect timeout for the registration endpoint.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Request body for `POST /register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    /// Delegated signing address.
    pub signing_addr: String,
    /// Primary account address.
    pub primary_addr: String,
    /// Primary key's signature over the signer proof.
    pub signature: String,
    /// Proof expiry in unix milliseconds.
    pub expiry_time: u64,
    pub network_type: u8,
}

impl RegistrationRequest {
    pub fn new(signed: &SignedProof, network: Network) -> Self {
        Self {
            signing_addr: lower_hex(signed.proof.approved_signer),
            primary_addr: lower_hex(signed.primary),
            signature: signed.signature.to_hex(),
            expiry_time: signed.proof.signer_expiry,
            network_type: network.network_type(),
        }
    }
}

fn lower_hex(address: Address) -> String {
    format!("0x{}", hex::encode(address))
}

/// HTTP client for the registration endpoint.
pub struct RegistrationClient {
    endpoint: Url,
    http_client: reqwest::Client,
}

impl RegistrationClient {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .build()?;

        Ok(Self {
            endpoint,
            http_client,
        })
    }

    /// Client for the endpoint and timeout in `config`.
    pub fn from_config(config: &VestConfig) -> Result<Self> {
        Self::new(config.registration_url()?, config.request_timeout())
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Submit a registration.
    ///
    /// Returns the response body as JSON, or as a JSON string when the
    /// server answers with plain text.
    pub async fn register(&self, request: &RegistrationRequest) -> Result<serde_json::Value> {
        info!(
            endpoint = %self.endpoint,
            signing_addr = %request.signing_addr,
            primary_addr = %request.primary_addr,
            network_type = request.network_type,
            "Submitting signer registration"
        );

        let response = self
            .http_client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            warn!(status = %status, body = %text, "Signer registration rejected");
            return Err(Error::Api {
                message: format!("Failed to register signer: {} - {}", status.as_u16(), text),
                status: Some(status.as_u16()),
            });
        }

        debug!(body = %text, "Registration response body");
        info!(status = %status, "Signer registration accepted");

        Ok(serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text)))
    }
}
