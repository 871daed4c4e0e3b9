//! EIP-712 signing domains for the Vest router.
//!
//! Vest binds signer proofs to a domain of `name`, `version` and
//! `verifyingContract` only; there is no `chainId` member, so the domain
//! type is `EIP712Domain(string name,string version,address verifyingContract)`.

use alloy_primitives::{address, Address, B256};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::typed_data::{FieldDef, FieldType, StructValue, TypeSchema};
use crate::{Error, Result};

/// Domain name of the Vest router contract.
pub const VEST_DOMAIN_NAME: &str = "VestRouterV2";

/// Domain version of the Vest router contract.
pub const VEST_DOMAIN_VERSION: &str = "0.0.1";

/// Vest Router V2 on production.
pub const PRODUCTION_ROUTER_ADDRESS: Address =
    address!("0x919386306C47b2Fe1036e3B4F7C40D22D2461a23");

/// Vest Router V2 on testnet.
pub const TESTNET_ROUTER_ADDRESS: Address =
    address!("0x8E4D87AEf4AC4D5415C35A12319013e34223825B");

/// Type name of the domain struct.
pub const EIP712_DOMAIN_TYPE: &str = "EIP712Domain";

/// Vest deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Production,
    Testnet,
}

impl Network {
    /// Router contract that verifies signer proofs on this network.
    pub fn router_address(&self) -> Address {
        match self {
            Network::Production => PRODUCTION_ROUTER_ADDRESS,
            Network::Testnet => TESTNET_ROUTER_ADDRESS,
        }
    }

    /// `networkType` value sent with registration requests.
    pub fn network_type(&self) -> u8 {
        match self {
            Network::Production => 0,
            Network::Testnet => 1,
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Network::Production => write!(f, "production"),
            Network::Testnet => write!(f, "testnet"),
        }
    }
}

impl FromStr for Network {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "production" | "prod" | "mainnet" => Ok(Network::Production),
            "testnet" | "test" | "dev" => Ok(Network::Testnet),
            other => Err(Error::config(format!("unknown network '{}'", other))),
        }
    }
}

/// EIP-712 signing domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Domain {
    /// Domain name.
    pub name: String,
    /// Domain version.
    pub version: String,
    /// Verifying contract address.
    pub verifying_contract: Address,
}

impl Domain {
    /// Create the Vest router domain for a network.
    pub fn vest(network: Network) -> Self {
        Self::custom(
            VEST_DOMAIN_NAME,
            VEST_DOMAIN_VERSION,
            network.router_address(),
        )
    }

    /// Create domain with custom parameters.
    pub fn custom(
        name: impl Into<String>,
        version: impl Into<String>,
        verifying_contract: Address,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            verifying_contract,
        }
    }

    /// Schema holding the `EIP712Domain` struct.
    pub fn schema() -> TypeSchema {
        TypeSchema::new().define(
            EIP712_DOMAIN_TYPE,
            vec![
                FieldDef::new("name", FieldType::String),
                FieldDef::new("version", FieldType::String),
                FieldDef::new("verifyingContract", FieldType::Address),
            ],
        )
    }

    /// Domain members as a struct value.
    pub fn struct_value(&self) -> StructValue {
        StructValue::new()
            .with("name", self.name.as_str())
            .with("version", self.version.as_str())
            .with("verifyingContract", self.verifying_contract)
    }

    /// Compute the EIP-712 domain separator hash.
    pub fn separator(&self) -> Result<B256> {
        Self::schema().struct_hash(EIP712_DOMAIN_TYPE, &self.struct_value())
    }
}
