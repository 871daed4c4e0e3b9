//! Configuration management for Vest registration and signing.
//!
//! Values are layered: built-in defaults, then an optional file, then
//! `VEST_`-prefixed environment variables. Key material is never read
//! from configuration.

use crate::signing::domain::{Domain, Network, VEST_DOMAIN_NAME, VEST_DOMAIN_VERSION};
use crate::{Error, Result};
use alloy_primitives::Address;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Production API base URL.
pub const PRODUCTION_API_URL: &str = "https://server-prod.hz.vestmarkets.com/v2";

/// Testnet API base URL.
pub const TESTNET_API_URL: &str = "https://server-dev.hz.vestmarkets.com/v2";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "VEST";

const DEFAULT_SIGNER_VALIDITY_DAYS: u32 = 1;
const MAX_SIGNER_VALIDITY_DAYS: u32 = 365;
const DEFAULT_REQUEST_TIMEOUT_SECS: u32 = 30;

/// Application configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct VestConfig {
    pub network: Network,
    /// Overrides the network's API base URL.
    #[serde(default)]
    pub api_url: Option<String>,
    /// Overrides the network's router contract.
    #[serde(default)]
    pub verifying_contract: Option<String>,
    pub domain_name: String,
    pub domain_version: String,
    pub signer_validity_days: u32,
    pub request_timeout_secs: u64,
}

impl Default for VestConfig {
    fn default() -> Self {
        Self {
            network: Network::Production,
            api_url: None,
            verifying_contract: None,
            domain_name: VEST_DOMAIN_NAME.to_string(),
            domain_version: VEST_DOMAIN_VERSION.to_string(),
            signer_validity_days: DEFAULT_SIGNER_VALIDITY_DAYS,
            request_timeout_secs: u64::from(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl VestConfig {
    /// Load configuration from defaults, an optional file and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, Environment::with_prefix(ENV_PREFIX))
    }

    /// Load with an explicit environment source in place of the process
    /// environment.
    pub fn load_with_env(path: Option<&Path>, env: Environment) -> Result<Self> {
        let defaults = Self::default();

        let mut builder = Config::builder()
            .set_default("network", defaults.network.to_string())?
            .set_default("domain_name", defaults.domain_name)?
            .set_default("domain_version", defaults.domain_version)?
            .set_default("signer_validity_days", i64::from(DEFAULT_SIGNER_VALIDITY_DAYS))?
            .set_default("request_timeout_secs", i64::from(DEFAULT_REQUEST_TIMEOUT_SECS))?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config: Self = builder
            .add_source(env.try_parsing(true))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Check ranges and parse the optional overrides.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_SIGNER_VALIDITY_DAYS).contains(&self.signer_validity_days) {
            return Err(Error::config(format!(
                "signer_validity_days must be between 1 and {}, got {}",
                MAX_SIGNER_VALIDITY_DAYS, self.signer_validity_days
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::config("request_timeout_secs must be positive"));
        }
        if self.domain_name.is_empty() || self.domain_version.is_empty() {
            return Err(Error::config("domain name and version must not be empty"));
        }
        self.verifying_contract()?;
        self.registration_url()?;
        Ok(())
    }

    /// Router contract for the configured network, or the override.
    ///
    /// An override naming the router of a different network is rejected,
    /// since the proof would be signed for one network and registered with
    /// the other's `networkType`.
    pub fn verifying_contract(&self) -> Result<Address> {
        let Some(raw) = &self.verifying_contract else {
            return Ok(self.network.router_address());
        };
        let contract: Address = raw
            .parse()
            .map_err(|_| Error::config(format!("invalid verifying_contract '{}'", raw)))?;

        if let Some(other) = [Network::Production, Network::Testnet]
            .into_iter()
            .find(|other| *other != self.network && other.router_address() == contract)
        {
            return Err(Error::config(format!(
                "verifying_contract {} is the {} router but network is {}",
                contract, other, self.network
            )));
        }
        Ok(contract)
    }

    /// Signing domain for signer proofs.
    pub fn domain(&self) -> Result<Domain> {
        Ok(Domain::custom(
            self.domain_name.as_str(),
            self.domain_version.as_str(),
            self.verifying_contract()?,
        ))
    }

    pub fn api_base_url(&self) -> &str {
        match &self.api_url {
            Some(url) => url,
            None => match self.network {
                Network::Production => PRODUCTION_API_URL,
                Network::Testnet => TESTNET_API_URL,
            },
        }
    }

    /// Endpoint that accepts signer registrations.
    pub fn registration_url(&self) -> Result<Url> {
        let endpoint = format!("{}/register", self.api_base_url().trim_end_matches('/'));
        let url = Url::parse(&endpoint)
            .map_err(|e| Error::config(format!("invalid api_url '{}': {}", endpoint, e)))?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(Error::config(format!("unsupported api_url scheme '{}'", other))),
        }
    }

    pub fn signer_validity(&self) -> Duration {
        Duration::from_secs(u64::from(self.signer_validity_days) * 24 * 60 * 60)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
