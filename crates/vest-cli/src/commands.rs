//! Subcommand implementations.
//!
//! Each command returns its JSON output as a zeroizing string, since the
//! keygen and register outputs carry a private key.

use alloy_primitives::{Address, B256};
use anyhow::{anyhow, Context, Result};
use clap::Args;
use config::Environment;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use vest_core::api::{RegistrationClient, RegistrationRequest};
use vest_core::config::{VestConfig, ENV_PREFIX};
use vest_core::signing::{
    recover_address, verify_digest, KeyGenerator, KeyPair, Network, OrderBuilder, OrderSigner,
    OrderType, RecoverableSignature, SignerProof,
};
use zeroize::{Zeroize, Zeroizing};

/// Order fields for `sign-order`.
#[derive(Args, Debug)]
pub struct OrderArgs {
    /// File holding the delegated private key as hex
    #[arg(long)]
    pub key_file: PathBuf,

    /// MARKET, LIMIT, STOP_LOSS or TAKE_PROFIT
    #[arg(long)]
    pub order_type: String,

    /// Market symbol, e.g. BTC-PERP
    #[arg(long)]
    pub symbol: String,

    #[arg(long, conflicts_with = "sell", required_unless_present = "sell")]
    pub buy: bool,

    #[arg(long)]
    pub sell: bool,

    /// Decimal size, hashed exactly as given
    #[arg(long)]
    pub size: String,

    /// Decimal limit price, hashed exactly as given
    #[arg(long)]
    pub limit_price: String,

    #[arg(long)]
    pub reduce_only: bool,

    /// Order time in unix milliseconds; defaults to now
    #[arg(long)]
    pub time: Option<u64>,

    /// Nonce; defaults to the order time
    #[arg(long)]
    pub nonce: Option<u64>,
}

/// Options for `register`.
#[derive(Debug)]
pub struct RegisterArgs {
    pub primary_key_file: PathBuf,
    pub primary_address: Option<String>,
    pub config: Option<PathBuf>,
    pub network: Option<String>,
    pub validity_days: Option<u32>,
    pub dry_run: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct KeyOutput<'a> {
    address: Address,
    private_key: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterOutput<'a> {
    request: &'a RegistrationRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    response: Option<serde_json::Value>,
    delegated_key: KeyOutput<'a>,
}

/// Read a hex private key from a file.
pub fn read_key_file(path: &Path) -> Result<KeyPair> {
    let contents = Zeroizing::new(
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read key file {}", path.display()))?,
    );
    KeyPair::from_hex(contents.trim())
        .with_context(|| format!("invalid private key in {}", path.display()))
}

/// Counts bytes without storing them.
#[derive(Default)]
struct ByteCounter(usize);

impl Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0 += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Pretty JSON rendered into a single exactly-sized zeroizing buffer.
///
/// The output is measured first so the buffer never reallocates and leaves
/// no stale partial copy of a private key on the heap.
fn to_json<T: Serialize>(value: &T) -> Result<Zeroizing<String>> {
    let mut counter = ByteCounter::default();
    serde_json::to_writer_pretty(&mut counter, value)?;

    let mut buf = Zeroizing::new(Vec::with_capacity(counter.0));
    serde_json::to_writer_pretty(&mut *buf, value)?;

    match String::from_utf8(std::mem::take(&mut *buf)) {
        Ok(text) => Ok(Zeroizing::new(text)),
        Err(err) => {
            err.into_bytes().zeroize();
            Err(anyhow!("JSON output is not valid UTF-8"))
        }
    }
}

fn now_millis() -> Result<u64> {
    u64::try_from(chrono::Utc::now().timestamp_millis()).context("system clock is before 1970")
}

pub fn keygen() -> Result<Zeroizing<String>> {
    let key = KeyGenerator::generate()?;
    let secret = key.secret().reveal_hex();

    info!(address = %key.address(), "Generated delegated key");

    to_json(&KeyOutput {
        address: key.address(),
        private_key: secret.as_str(),
    })
}

/// Resolve configuration with command-line overrides applied.
fn resolve_config(args: &RegisterArgs, env: Environment) -> Result<VestConfig> {
    let mut config = VestConfig::load_with_env(args.config.as_deref(), env)?;
    if let Some(network) = &args.network {
        config.network = network.parse::<Network>()?;
    }
    if let Some(days) = args.validity_days {
        config.signer_validity_days = days;
    }
    config.validate()?;
    Ok(config)
}

fn check_primary_address(primary: &KeyPair, expected: Option<&str>) -> Result<()> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let expected: Address = expected
        .parse()
        .map_err(|_| vest_core::Error::Config {
            message: format!("invalid primary address '{}'", expected),
        })?;
    if expected != primary.address() {
        return Err(vest_core::Error::Config {
            message: format!(
                "primary key controls {}, not the supplied primary address {}",
                primary.address(),
                expected
            ),
        }
        .into());
    }
    Ok(())
}

pub async fn register(args: RegisterArgs) -> Result<Zeroizing<String>> {
    register_with_env(args, Environment::with_prefix(ENV_PREFIX)).await
}

async fn register_with_env(args: RegisterArgs, env: Environment) -> Result<Zeroizing<String>> {
    let config = resolve_config(&args, env)?;
    let primary = read_key_file(&args.primary_key_file)?;
    check_primary_address(&primary, args.primary_address.as_deref())?;

    let domain = config.domain()?;
    let delegate = KeyGenerator::generate()?;

    let proof = SignerProof::expiring_in(delegate.address(), now_millis()?, config.signer_validity());
    let signed = proof.sign(&domain, &primary)?;
    signed.verify(&domain).context("signer proof failed self-verification")?;

    let request = RegistrationRequest::new(&signed, config.network);

    let response = if args.dry_run {
        info!(network = %config.network, "Dry run, registration not sent");
        None
    } else {
        let client = RegistrationClient::from_config(&config)?;
        Some(client.register(&request).await?)
    };

    warn!("Output contains the delegated private key; store it securely");

    let secret = delegate.secret().reveal_hex();
    to_json(&RegisterOutput {
        request: &request,
        response,
        delegated_key: KeyOutput {
            address: delegate.address(),
            private_key: secret.as_str(),
        },
    })
}

pub fn sign_order(args: &OrderArgs) -> Result<Zeroizing<String>> {
    let key = read_key_file(&args.key_file)?;
    let order_type: OrderType = args.order_type.parse()?;

    let mut builder = OrderBuilder::new()
        .order_type(order_type)
        .symbol(args.symbol.as_str())
        .is_buy(args.buy)
        .size(args.size.as_str())
        .limit_price(args.limit_price.as_str())
        .reduce_only(args.reduce_only);
    builder = match args.time {
        Some(time) => builder.time(time),
        None => builder.time_now(),
    };
    if let Some(nonce) = args.nonce {
        builder = builder.nonce(nonce);
    }

    let signed = OrderSigner::new(key).sign_order(&builder.build()?)?;
    to_json(&signed)
}

pub fn recover(digest: &str, signature: &str, expected: Option<&str>) -> Result<Zeroizing<String>> {
    let digest: B256 = digest.trim().parse().context("digest must be 32 bytes of hex")?;
    let signature: RecoverableSignature = signature.parse()?;

    let address = match expected {
        Some(expected) => {
            let expected: Address = expected.parse().context("invalid expected address")?;
            verify_digest(&digest, &signature, expected)?;
            expected
        }
        None => recover_address(&digest, &signature)?,
    };

    to_json(&serde_json::json!({ "address": address }))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test private key (DO NOT USE IN PRODUCTION)
    const TEST_PRIVATE_KEY: &str =
        "ac2a66d4181d09f9f278b2c3f59802c7c415de4f819be1c46e121c91f8bba0fb";
    const TEST_ADDRESS: &str = "0x95e3be7d44b11c846552e5ba747e97cf0568a83f";

    fn key_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("vest-cli-{}-{}", std::process::id(), name));
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn env_from(vars: &[(&str, &str)]) -> Environment {
        let source: config::Map<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::with_prefix(ENV_PREFIX).source(Some(source))
    }

    fn register_args(primary_key_file: PathBuf) -> RegisterArgs {
        RegisterArgs {
            primary_key_file,
            primary_address: None,
            config: None,
            network: None,
            validity_days: None,
            dry_run: true,
        }
    }

    fn order_args(key_file: PathBuf) -> OrderArgs {
        OrderArgs {
            key_file,
            order_type: "MARKET".to_string(),
            symbol: "BTC-PERP".to_string(),
            buy: true,
            sell: false,
            size: "1.0000".to_string(),
            limit_price: "50000.00".to_string(),
            reduce_only: false,
            time: Some(1762097336031),
            nonce: None,
        }
    }

    #[test]
    fn test_read_key_file_trims_whitespace() {
        let path = key_file("trim", &format!("0x{}\n", TEST_PRIVATE_KEY));
        let key = read_key_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(key.address(), TEST_ADDRESS.parse::<Address>().unwrap());
    }

    #[test]
    fn test_read_key_file_errors_do_not_echo_key() {
        let path = key_file("bad", "zz11223344556677889900112233445566778899001122334455667788990011");
        let err = read_key_file(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(!format!("{:#}", err).contains("zz1122"));
    }

    #[test]
    fn test_sign_order_golden() {
        let path = key_file("order", TEST_PRIVATE_KEY);
        let output = sign_order(&order_args(path.clone())).unwrap();
        std::fs::remove_file(&path).ok();

        let value: serde_json::Value = serde_json::from_str(output.as_str()).unwrap();
        assert_eq!(
            value["orderHash"],
            "0x91ad7225e0f903d6c480ef856f4bafd4d65bca76bf1acbf1b640d5294dd22191"
        );
        assert_eq!(
            value["signature"],
            "0x481a1dc2da68ad7ced704d610899c72cf9a5480c4446ce65beeec32a61d6bd793b20ef6ea5883b5f88678359e9fdbaf52a78117fe366733197a04b2992b9ee561c"
        );
        assert_eq!(value["signer"], TEST_ADDRESS);
    }

    #[test]
    fn test_recover_with_expected() {
        let digest = "0x2e545ed913418ab2e2afa81890376c88177a41708f7023f092ee64fe31fa25dd";
        let signature = "0x481a1dc2da68ad7ced704d610899c72cf9a5480c4446ce65beeec32a61d6bd793b20ef6ea5883b5f88678359e9fdbaf52a78117fe366733197a04b2992b9ee561c";

        let output = recover(digest, signature, None).unwrap();
        let value: serde_json::Value = serde_json::from_str(output.as_str()).unwrap();
        assert_eq!(
            value["address"].as_str().unwrap().to_lowercase(),
            TEST_ADDRESS
        );

        assert!(recover(digest, signature, Some(TEST_ADDRESS)).is_ok());
        assert!(recover(
            digest,
            signature,
            Some("0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266")
        )
        .is_err());
    }

    #[test]
    fn test_primary_address_mismatch() {
        let primary = KeyPair::from_hex(TEST_PRIVATE_KEY).unwrap();
        assert!(check_primary_address(&primary, None).is_ok());
        assert!(check_primary_address(&primary, Some(TEST_ADDRESS)).is_ok());

        let err = check_primary_address(
            &primary,
            Some("0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"),
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<vest_core::Error>(),
            Some(vest_core::Error::Config { .. })
        ));
    }

    #[test]
    fn test_to_json_fills_exact_buffer() {
        let output = to_json(&serde_json::json!({ "privateKey": "0x".to_string() + &"ab".repeat(32) }))
            .unwrap();

        // A buffer that never grew was never reallocated.
        assert_eq!(output.capacity(), output.len());
        let value: serde_json::Value = serde_json::from_str(output.as_str()).unwrap();
        assert_eq!(value["privateKey"].as_str().unwrap().len(), 66);
    }

    #[test]
    fn test_resolve_config_layers_arguments_over_environment() {
        let args = register_args(PathBuf::from("unused"));
        let config = resolve_config(&args, env_from(&[("VEST_NETWORK", "testnet")])).unwrap();
        assert_eq!(config.network, Network::Testnet);

        let args = RegisterArgs {
            network: Some("production".to_string()),
            validity_days: Some(3),
            ..register_args(PathBuf::from("unused"))
        };
        let config = resolve_config(&args, env_from(&[("VEST_NETWORK", "testnet")])).unwrap();
        assert_eq!(config.network, Network::Production);
        assert_eq!(config.signer_validity_days, 3);

        let args = RegisterArgs {
            validity_days: Some(0),
            ..register_args(PathBuf::from("unused"))
        };
        assert!(resolve_config(&args, env_from(&[])).is_err());
    }

    #[tokio::test]
    async fn test_register_dry_run() {
        let path = key_file("primary", TEST_PRIVATE_KEY);
        let output = register_with_env(
            RegisterArgs {
                primary_address: Some(TEST_ADDRESS.to_string()),
                network: Some("testnet".to_string()),
                validity_days: Some(2),
                ..register_args(path.clone())
            },
            env_from(&[]),
        )
        .await
        .unwrap();
        std::fs::remove_file(&path).ok();

        let value: serde_json::Value = serde_json::from_str(output.as_str()).unwrap();
        assert_eq!(value["request"]["primaryAddr"], TEST_ADDRESS);
        assert_eq!(value["request"]["networkType"], 1);
        assert_eq!(
            value["request"]["signingAddr"],
            value["delegatedKey"]["address"]
                .as_str()
                .unwrap()
                .to_lowercase()
        );
        assert!(value.get("response").is_none());
        assert_eq!(value["delegatedKey"]["privateKey"].as_str().unwrap().len(), 66);
    }
}
